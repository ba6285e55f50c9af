pub mod cli;
pub mod core;
pub mod providers;
pub mod service;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::debounce::Debouncer;
use crate::core::rate::{ConversionRequest, parse_amount};
use crate::service::ExchangeService;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Convert {
        amount: String,
        from: String,
        to: String,
        remote: bool,
    },
    Rates,
    Latest,
    History {
        from: String,
        to: String,
        days: u32,
    },
    Currencies,
    Status,
    Watch,
    Calc {
        from: String,
        to: String,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xrate starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service = Arc::new(ExchangeService::from_config(&config)?);

    let result = match command {
        AppCommand::Convert {
            amount,
            from,
            to,
            remote,
        } => {
            match parse_amount(&amount) {
                Ok(amount) => {
                    let request = ConversionRequest::new(&from, &to, amount);
                    cli::convert::run(&service, request, remote).await
                }
                Err(e) => Err(e.into()),
            }
        }
        AppCommand::Rates => cli::rates::run(&service, &config.currencies).await,
        AppCommand::Latest => cli::rates::latest(&service).await,
        AppCommand::History { from, to, days } => {
            cli::rates::history(&service, &from, &to, days).await
        }
        AppCommand::Currencies => cli::rates::currencies(&service).await,
        AppCommand::Status => cli::status::run(&service).await,
        AppCommand::Watch => cli::status::watch(&service).await,
        AppCommand::Calc { from, to } => {
            let debouncer = Debouncer::new(config.polling.debounce());
            cli::calc::run(Arc::clone(&service), &from, &to, debouncer).await
        }
    };

    shutdown_shared(service).await;
    result
}

/// Shuts the service down if this is the last handle. Returns whether it did;
/// otherwise the monitor stops when the remaining handles drop.
async fn shutdown_shared(service: Arc<ExchangeService>) -> bool {
    match Arc::try_unwrap(service) {
        Ok(service) => {
            service.shutdown().await;
            true
        }
        Err(service) => {
            debug!(
                handles = Arc::strong_count(&service),
                "Service still shared, monitor stops on drop"
            );
            false
        }
    }
}
