use super::ui;
use crate::core::connectivity::ConnectivityState;
use crate::core::provider::HealthCheck;
use crate::service::ExchangeService;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

fn status_line(state: ConnectivityState, base_url: &str) -> String {
    format!(
        "{} {}  {}",
        ui::style_text("Backend:", ui::StyleType::TotalLabel),
        ui::connectivity_label(state),
        ui::style_text(base_url, ui::StyleType::Subtle)
    )
}

/// One-shot health check against the configured backend.
pub async fn run(service: &ExchangeService) -> Result<()> {
    let spinner = ui::new_spinner("Checking backend...");
    let outcome = service.backend().health_check().await;
    spinner.finish_and_clear();

    let state = match &outcome {
        Ok(()) => ConnectivityState::Online,
        Err(_) => ConnectivityState::Offline,
    };
    println!("{}", status_line(state, service.backend().base_url()));
    if let Err(e) = outcome {
        println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
        println!(
            "{}",
            ui::style_text("Conversions will use offline rates.", ui::StyleType::Warning)
        );
    }
    Ok(())
}

/// Follows connectivity changes until interrupted. Entering `r` on stdin
/// retries the health check immediately.
pub async fn watch(service: &ExchangeService) -> Result<()> {
    let mut states = service.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let base_url = service.backend().base_url().to_string();

    println!("{}", status_line(*states.borrow_and_update(), &base_url));
    println!(
        "{}",
        ui::style_text("Press r + Enter to retry now, Ctrl+C to quit.", ui::StyleType::Subtle)
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                println!("{}", status_line(state, &base_url));
            }
            line = input.next_line(), if input_open => {
                match line? {
                    Some(line) if line.trim().eq_ignore_ascii_case("r") => {
                        service.retry_connection();
                    }
                    Some(_) => {}
                    None => {
                        debug!("stdin closed, retry input disabled");
                        input_open = false;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_names_backend() {
        let line = status_line(ConnectivityState::Offline, "http://localhost:8000");
        assert!(line.contains("offline mode"));
        assert!(line.contains("http://localhost:8000"));
    }
}
