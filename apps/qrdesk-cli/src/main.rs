//! # QR Desk CLI
//!
//! ```text
//! qrdesk [--as USER_ID] [--config PATH] <command> [options]
//!
//!   dashboard  [--branch ID]    dashboard statistics
//!   scorecard  [--branch ID]    audit scorecard
//!   report     <type>           compliance | security | performance | user_activity
//!   qr-codes   [--status S]     list QR codes
//!   demo                        approve the seeded allocation request
//! ```
//!
//! Results go to stdout as pretty JSON; logs go to stderr.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Parse arguments
//! 3. Load configuration (file, then environment)
//! 4. Build the service over the demo bank
//! 5. Run one command as the acting user

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use qrdesk_service::{QrDeskService, ServiceConfig};
use qrdesk_store::fixtures::ADMIN_ID;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(name = "qrdesk")]
#[command(about = "Bank QR-code program desk")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Acting user id
    #[arg(long = "as", value_name = "USER_ID", global = true, default_value = ADMIN_ID)]
    actor_id: String,

    /// Settings file (default: QRDESK_CONFIG or the platform config dir)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    debug!(?cli, "Arguments parsed");

    let config = match cli.config {
        Some(path) => ServiceConfig::load(Some(path.clone()))
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ServiceConfig::load_or_default(None),
    };

    let service = QrDeskService::new(config)?;
    info!(actor_id = %cli.actor_id, "Running command");

    let output = commands::run(&service, &cli.actor_id, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Initializes the tracing subscriber. Logs go to stderr so stdout stays
/// valid JSON.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=qrdesk_store=trace` - Trace the store only
/// - Default: INFO, DEBUG for the qrdesk crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,qrdesk=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
