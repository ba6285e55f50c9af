use super::ui;
use crate::core::fallback::{SUPPORTED_CURRENCIES, currency_info};
use crate::core::rate::{BASE_CURRENCY, DataSource, RateTable, normalize_code, resolve_rate};
use crate::providers::backend::{LatestRates, RateHistory};
use crate::service::ExchangeService;
use anyhow::Result;
use comfy_table::Cell;
use std::collections::HashMap;
use tracing::debug;

fn changes_by_currency(latest: &LatestRates) -> HashMap<String, f64> {
    latest
        .rates
        .iter()
        .filter_map(|change| {
            let (from, to) = change.currency_pair.split_once('/')?;
            (from == BASE_CURRENCY).then(|| (to.to_string(), change.change_percentage))
        })
        .collect()
}

fn rates_table(
    table: &RateTable,
    currencies: &[String],
    changes: &HashMap<String, f64>,
) -> String {
    let mut output_table = ui::new_styled_table();
    output_table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Name"),
        ui::header_cell(&format!("Per 1 {BASE_CURRENCY}")),
        ui::header_cell(&format!("1 unit in {BASE_CURRENCY}")),
        ui::header_cell("Change"),
    ]);

    for code in currencies.iter().map(|code| normalize_code(code)) {
        let code = code.as_str();
        let name = currency_info(code).map_or("", |info| info.name);
        let per_base = resolve_rate(table, BASE_CURRENCY, code).ok();
        let in_base = resolve_rate(table, code, BASE_CURRENCY).ok();
        let change = changes
            .get(code)
            .map_or(ui::format_optional_cell(None::<f64>, |_| String::new()), |c| {
                ui::change_cell(*c)
            });

        output_table.add_row(vec![
            Cell::new(code),
            Cell::new(name),
            ui::format_optional_cell(per_base, |r| format!("{r:.4}")),
            ui::format_optional_cell(in_base, |r| format!("{r:.6}")),
            change,
        ]);
    }
    output_table.to_string()
}

fn backfill_note(source: DataSource, backfilled: &[String]) -> Option<String> {
    if backfilled.is_empty() {
        return None;
    }
    Some(format!(
        "No {source} rate for {}; showing older rates instead",
        backfilled.join(", ")
    ))
}

pub async fn run(service: &ExchangeService, currencies: &[String]) -> Result<()> {
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let (picked, latest) = futures::join!(service.rates(), service.backend().latest_rates());
    spinner.finish_and_clear();

    let changes = match latest {
        Ok(latest) if picked.source == DataSource::Realtime => changes_by_currency(&latest),
        Ok(_) => HashMap::new(),
        Err(e) => {
            debug!(error = %e, "Latest rate changes unavailable");
            HashMap::new()
        }
    };

    println!(
        "Exchange rates ({})\n",
        ui::style_text(BASE_CURRENCY, ui::StyleType::Title)
    );
    println!("{}", rates_table(&picked.table, currencies, &changes));
    println!(
        "{} {}",
        ui::style_text("Source:", ui::StyleType::TotalLabel),
        ui::source_label(picked.source)
    );
    if let Some(note) = backfill_note(picked.source, &picked.backfilled) {
        println!("{}", ui::style_text(&note, ui::StyleType::Warning));
    }
    Ok(())
}

pub async fn latest(service: &ExchangeService) -> Result<()> {
    let spinner = ui::new_spinner("Fetching latest rates...");
    let latest = service.backend().latest_rates().await;
    spinner.finish_and_clear();
    let latest = latest?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Previous"),
        ui::header_cell("Change"),
        ui::header_cell("Change (%)"),
        ui::header_cell("Date"),
    ]);
    for change in &latest.rates {
        table.add_row(vec![
            Cell::new(&change.currency_pair),
            ui::number_cell(format!("{:.4}", change.rate)),
            ui::format_optional_cell(change.previous_rate, |r| format!("{r:.4}")),
            ui::number_cell(format!("{:+.4}", change.change_amount)),
            ui::change_cell(change.change_percentage),
            Cell::new(&change.date),
        ]);
    }

    println!("{table}");
    println!(
        "{} {}",
        ui::style_text("Source:", ui::StyleType::TotalLabel),
        ui::source_label(latest.source())
    );
    Ok(())
}

fn history_table(history: &RateHistory) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Rate")]);
    for point in &history.history {
        table.add_row(vec![
            Cell::new(&point.date),
            ui::number_cell(format!("{:.4}", point.rate)),
        ]);
    }
    table.to_string()
}

pub async fn history(service: &ExchangeService, from: &str, to: &str, days: u32) -> Result<()> {
    let spinner = ui::new_spinner("Fetching rate history...");
    let history = service.backend().rate_history(from, to, days).await;
    spinner.finish_and_clear();
    let history = history?;

    println!(
        "{}/{}: {}\n",
        ui::style_text(&history.from_currency, ui::StyleType::Title),
        ui::style_text(&history.to_currency, ui::StyleType::Title),
        ui::style_text(&format!("{:.4}", history.current_rate), ui::StyleType::TotalValue)
    );
    println!("{}", history_table(&history));
    Ok(())
}

pub async fn currencies(service: &ExchangeService) -> Result<()> {
    let codes = match service.backend().currencies().await {
        Ok(codes) => codes,
        Err(e) => {
            println!(
                "{}",
                ui::style_text(&format!("Backend unavailable ({e}), showing offline set"), ui::StyleType::Warning)
            );
            SUPPORTED_CURRENCIES
                .iter()
                .map(|c| c.code.to_string())
                .collect()
        }
    };
    println!("{} currencies: {}", codes.len(), codes.join(", "));
    Ok(())
}
