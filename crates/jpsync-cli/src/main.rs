mod jobs;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use jpsync_core::Vendor;
use jpsync_sync::SyncError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jpsync-cli")]
#[command(about = "Mirror Japanese retail catalogs into a Shopify store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, translate, price and upsert one vendor's catalog
    Ingest {
        /// Vendor tag: bape, humanmade, workman, beams, onitsuka or adidas
        #[arg(long)]
        vendor: Vendor,
        /// Category to crawl (repeatable); defaults to the configured list
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Re-check every listed product of a vendor against its source page
    Reconcile {
        /// Vendor tag
        #[arg(long)]
        vendor: Vendor,
    },
    /// Print the store price for a source price in yen
    Price {
        #[arg(long)]
        jpy: i64,
    },
}

const EXIT_CONFIG: u8 = 2;
const EXIT_FATAL: u8 = 3;
const EXIT_CANCELLED: u8 = 4;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match jpsync_core::load_app_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let env_filter = match EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))
    {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("error: invalid log filter: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let result = match cli.command {
        Commands::Price { jpy } => {
            println!("{}", jobs::price_line(&config.price, jpy));
            return ExitCode::SUCCESS;
        }
        Commands::Ingest { vendor, categories } => {
            jobs::run_ingest(config, vendor, categories).await
        }
        Commands::Reconcile { vendor } => jobs::run_reconcile(config, vendor).await,
    };

    match result {
        Ok(report) => {
            jobs::print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// `4` for a cancelled job, `3` for any other failure.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SyncError>() {
        Some(SyncError::Cancelled) => EXIT_CANCELLED,
        _ => EXIT_FATAL,
    }
}
