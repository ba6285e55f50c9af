use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use xrate::cli::setup::setup;
use xrate::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount between two currencies
    Convert {
        /// Amount to convert, e.g. 1,250.50
        amount: String,
        /// Source currency code
        from: String,
        /// Target currency code
        to: String,
        /// Let the backend perform the conversion
        #[arg(long)]
        remote: bool,
    },
    /// Show rates for the configured currencies
    Rates,
    /// Show latest rates with their change since the previous day
    Latest,
    /// Show the rate history of a currency pair
    History {
        from: String,
        to: String,
        /// Number of days, between 1 and 30
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
    /// List currencies the backend supports
    Currencies,
    /// Check whether the backend is reachable
    Status,
    /// Follow backend connectivity until interrupted
    Watch,
    /// Convert amounts typed on stdin as you go
    Calc { from: String, to: String },
}

impl From<Commands> for xrate::AppCommand {
    fn from(cmd: Commands) -> xrate::AppCommand {
        match cmd {
            Commands::Convert {
                amount,
                from,
                to,
                remote,
            } => xrate::AppCommand::Convert {
                amount,
                from,
                to,
                remote,
            },
            Commands::Rates => xrate::AppCommand::Rates,
            Commands::Latest => xrate::AppCommand::Latest,
            Commands::History { from, to, days } => xrate::AppCommand::History { from, to, days },
            Commands::Currencies => xrate::AppCommand::Currencies,
            Commands::Status => xrate::AppCommand::Status,
            Commands::Watch => xrate::AppCommand::Watch,
            Commands::Calc { from, to } => xrate::AppCommand::Calc { from, to },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => xrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
