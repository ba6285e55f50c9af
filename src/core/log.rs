use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const APP_TARGET: &str = "xrate";

/// Filter for the crate's own events. `--verbose` turns on debug output for
/// `xrate` only; dependencies stay quiet unless `RUST_LOG` says otherwise.
fn app_filter(verbose: bool) -> Targets {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };
    Targets::new().with_target(APP_TARGET, level)
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "off" })
    })
}

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init_logging(verbose: bool) {
    let layer = fmt::layer()
        .compact()
        .without_time()
        .with_target(verbose)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(layer)
        .with(app_filter(verbose))
        .with(env_filter(verbose))
        .init();
}
