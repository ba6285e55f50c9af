//! Embedded rates used when no live or stored table can serve a request

use crate::core::rate::RateTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

/// Currencies offered for conversion.
pub const SUPPORTED_CURRENCIES: [CurrencyInfo; 6] = [
    CurrencyInfo {
        code: "USD",
        name: "US Dollar",
        symbol: "$",
    },
    CurrencyInfo {
        code: "KRW",
        name: "Korean Won",
        symbol: "₩",
    },
    CurrencyInfo {
        code: "EUR",
        name: "Euro",
        symbol: "€",
    },
    CurrencyInfo {
        code: "JPY",
        name: "Japanese Yen",
        symbol: "¥",
    },
    CurrencyInfo {
        code: "GBP",
        name: "British Pound",
        symbol: "£",
    },
    CurrencyInfo {
        code: "CNY",
        name: "Chinese Yuan",
        symbol: "¥",
    },
];

// Units per 1 USD
const FALLBACK_RATES: [(&str, f64); 5] = [
    ("KRW", 1340.5),
    ("JPY", 149.8),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("CNY", 7.25),
];

/// USD-anchored table covering every supported currency. Since cross rates
/// chain through USD, any pair of supported currencies resolves against it.
pub fn fallback_table() -> RateTable {
    RateTable::usd(FALLBACK_RATES)
}

pub fn currency_info(code: &str) -> Option<&'static CurrencyInfo> {
    SUPPORTED_CURRENCIES.iter().find(|c| c.code == code)
}

/// Fraction digits used when displaying an amount in `code`.
pub fn display_precision(code: &str) -> usize {
    match code {
        "KRW" | "JPY" => 0,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::resolve_rate;

    #[test]
    fn test_fallback_covers_every_supported_pair() {
        let table = fallback_table();
        for from in SUPPORTED_CURRENCIES {
            for to in SUPPORTED_CURRENCIES {
                let rate = resolve_rate(&table, from.code, to.code)
                    .unwrap_or_else(|e| panic!("{}->{} failed: {e}", from.code, to.code));
                assert!(rate > 0.0);
            }
        }
    }

    #[test]
    fn test_currency_info_lookup() {
        assert_eq!(currency_info("KRW").map(|c| c.symbol), Some("₩"));
        assert!(currency_info("ZZZ").is_none());
        assert_eq!(display_precision("JPY"), 0);
        assert_eq!(display_precision("EUR"), 2);
    }
}
