use super::ui;
use crate::core::rate::{ConversionRequest, ConversionResult};
use crate::service::ExchangeService;
use anyhow::Result;
use comfy_table::Cell;

impl ConversionResult {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("From"),
            ui::header_cell("To"),
            ui::header_cell("Rate"),
            ui::header_cell("Inverse"),
        ]);
        let inverse = if self.rate > 0.0 { Some(1.0 / self.rate) } else { None };
        table.add_row(vec![
            Cell::new(ui::format_money(self.amount, &self.from_currency)),
            Cell::new(ui::format_money(self.converted_amount, &self.to_currency)),
            ui::number_cell(format!(
                "1 {} = {:.6} {}",
                self.from_currency, self.rate, self.to_currency
            )),
            ui::format_optional_cell(inverse, |r| {
                format!("1 {} = {r:.6} {}", self.to_currency, self.from_currency)
            }),
        ]);

        let mut output = table.to_string();
        output.push_str(&format!(
            "\n{} {}  {}",
            ui::style_text("Source:", ui::StyleType::TotalLabel),
            ui::source_label(self.data_source),
            ui::style_text(&self.timestamp.to_rfc3339(), ui::StyleType::Subtle)
        ));
        output
    }
}

pub async fn run(service: &ExchangeService, request: ConversionRequest, remote: bool) -> Result<()> {
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let outcome = if remote {
        service.convert_remote(&request).await
    } else {
        service.convert(&request).await
    };
    spinner.finish_and_clear();

    let result = outcome?;
    println!("{}", result.display_as_table());
    Ok(())
}
