use super::ui;
use crate::core::debounce::Debouncer;
use crate::core::rate::{ConversionRequest, ConversionResult, parse_amount};
use crate::service::ExchangeService;
use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::warn;

fn result_line(result: &ConversionResult) -> String {
    format!(
        "{} = {}  ({})",
        ui::format_money(result.amount, &result.from_currency),
        ui::style_text(
            &ui::format_money(result.converted_amount, &result.to_currency),
            ui::StyleType::TotalValue
        ),
        ui::source_label(result.data_source)
    )
}

/// Converts amounts read line by line from stdin. A conversion only runs once
/// input has been quiet for the configured debounce delay.
pub async fn run(service: Arc<ExchangeService>, from: &str, to: &str, debouncer: Debouncer) -> Result<()> {
    println!(
        "{}",
        ui::style_text(
            &format!("Enter amounts in {from} to convert to {to}. Ctrl+D to finish."),
            ui::StyleType::Subtle
        )
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last: Option<JoinHandle<()>> = None;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let amount = match parse_amount(&line) {
            Ok(amount) => amount,
            Err(e) => {
                debouncer.cancel();
                println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                continue;
            }
        };

        let request = ConversionRequest::new(from, to, amount);
        let service = Arc::clone(&service);
        last = Some(debouncer.schedule(move || async move {
            match service.convert(&request).await {
                Ok(result) => println!("{}", result_line(&result)),
                Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
            }
        }));
    }

    if let Some(handle) = last {
        if let Err(e) = handle.await {
            warn!(error = %e, "Pending conversion did not finish");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::DataSource;
    use chrono::Utc;

    #[test]
    fn test_result_line_shows_both_sides() {
        let result = ConversionResult {
            from_currency: "USD".to_string(),
            to_currency: "KRW".to_string(),
            amount: 100.0,
            rate: 1340.5,
            converted_amount: 134050.0,
            timestamp: Utc::now(),
            data_source: DataSource::Fallback,
        };
        let line = result_line(&result);
        assert!(line.contains("$100.00 USD"));
        assert!(line.contains("134,050 KRW"));
        assert!(line.contains("offline rates"));
    }
}
