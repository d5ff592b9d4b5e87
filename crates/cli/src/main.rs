//! Souq CLI - Session migrations and store API checks.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! souq-cli migrate
//!
//! # Check that the store API answers for the configured tenant
//! souq-cli check-api
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the session table
//! - `check-api` - Fetch store settings, categories and countries

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "souq-cli")]
#[command(author, version, about = "Souq storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session table in the storefront database
    Migrate,
    /// Check the store API for the configured tenant
    CheckApi {
        /// Tenant to check instead of `SOUQ_STORE_TENANT`
        #[arg(short, long)]
        tenant: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::CheckApi { tenant } => commands::check_api::run(tenant.as_deref()).await?,
    }
    Ok(())
}
