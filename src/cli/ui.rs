use crate::core::connectivity::ConnectivityState;
use crate::core::fallback::{currency_info, display_precision};
use crate::core::rate::DataSource;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Warning,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Warning => style(text).yellow(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(change: f64) -> Cell {
    let text = format!("{change:+.2}%");
    let color = if change >= 0.0 {
        Color::Green
    } else {
        Color::Red
    };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

/// Right-aligned numeric cell.
pub fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Formats `value` with thousands separators and the precision used for `code`.
pub fn format_amount(value: f64, code: &str) -> String {
    let formatted = format!("{:.*}", display_precision(code), value);
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Amount with the currency symbol when one is known, e.g. `₩134,050`.
pub fn format_money(value: f64, code: &str) -> String {
    let amount = format_amount(value, code);
    match currency_info(code) {
        Some(info) => format!("{}{} {}", info.symbol, amount, code),
        None => format!("{amount} {code}"),
    }
}

/// Provenance label shown next to converted figures.
pub fn source_label(source: DataSource) -> String {
    match source {
        DataSource::Realtime => style_text("live rates", StyleType::TotalValue),
        DataSource::Stored => style_text("last known rates (backend unreachable)", StyleType::Warning),
        DataSource::Fallback => style_text("offline rates (backend unreachable)", StyleType::Warning),
    }
}

pub fn connectivity_label(state: ConnectivityState) -> String {
    match state {
        ConnectivityState::Online => style_text("online", StyleType::TotalValue),
        ConnectivityState::Offline => style_text("offline mode", StyleType::Warning),
        ConnectivityState::Checking => style_text("checking connection...", StyleType::Subtle),
    }
}

/// Creates a spinner shown while waiting on the backend.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(134050.0, "KRW"), "134,050");
        assert_eq!(format_amount(1234567.891, "USD"), "1,234,567.89");
        assert_eq!(format_amount(999.0, "EUR"), "999.00");
        assert_eq!(format_amount(0.4, "JPY"), "0");
        assert_eq!(format_amount(-1500.5, "USD"), "-1,500.50");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(100.0, "USD"), "$100.00 USD");
        assert_eq!(format_money(1.5, "SGD"), "1.50 SGD");
    }
}
