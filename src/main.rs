use clap::{CommandFactory, Parser, Subcommand};
use cryptocast::cli::{setup, ui};
use cryptocast::core::Currency;
use cryptocast::core::log::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;

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
    /// Show the current price of a cryptocurrency
    Price {
        /// Ticker symbol, e.g. BTC
        symbol: String,
        /// Display currency (USD or CNY)
        #[arg(long)]
        currency: Option<Currency>,
    },
    /// Show price history and a linear forecast
    Predict {
        /// Ticker symbol, e.g. BTC
        symbol: String,
        /// Display currency (USD or CNY)
        #[arg(long)]
        currency: Option<Currency>,
        /// Days of history to show and train on (30-365)
        #[arg(short, long)]
        days: Option<u32>,
        /// Days to predict (1-365)
        #[arg(long)]
        horizon: Option<u32>,
        /// Export historical and predicted prices as CSV
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Export historical and predicted prices as PDF
        #[arg(long, value_name = "PATH")]
        pdf: Option<PathBuf>,
    },
    /// Remove cached API responses
    ClearCache,
}

impl From<Commands> for cryptocast::AppCommand {
    fn from(cmd: Commands) -> cryptocast::AppCommand {
        match cmd {
            Commands::Price { symbol, currency } => {
                cryptocast::AppCommand::Price { symbol, currency }
            }
            Commands::Predict {
                symbol,
                currency,
                days,
                horizon,
                csv,
                pdf,
            } => cryptocast::AppCommand::Predict(cryptocast::PredictOptions {
                symbol,
                currency,
                days,
                horizon,
                csv,
                pdf,
            }),
            Commands::ClearCache => cryptocast::AppCommand::ClearCache,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup::setup(),
        Some(cmd) => cryptocast::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => Cli::command().print_help().map_err(Into::into),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            eprintln!(
                "{}",
                ui::style_text(&format!("Error: {e:#}"), ui::StyleType::Error)
            );
            ExitCode::FAILURE
        }
    }
}
