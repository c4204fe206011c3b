mod client;
mod config;
mod controls;
mod poller;
mod types;
mod ui;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use client::{AuroraApi, AuroraClient};
use config::DashboardConfig;
use types::Side;

#[derive(Parser)]
#[command(name = "aurora-dash")]
#[command(version = "0.1.0")]
#[command(about = "Terminal dashboard client for the Aurora trading engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "aurora-dash")]
    config: String,

    /// Backend base URL (overrides the config file)
    #[arg(long)]
    api: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard (default)
    Watch,
    /// Print backend health
    Status,
    /// Force one evaluation tick
    Tick,
    /// Read or set the auto-tick loop
    Auto {
        /// true/false; omit to read the current config
        #[arg(long)]
        enabled: Option<bool>,
        /// Loop interval in seconds
        #[arg(long)]
        interval: Option<f64>,
    },
    /// Preview or submit an order
    Order {
        /// buy, sell or exit
        side: String,
        /// Fraction of balance (buy) or position (sell), 0..1
        fraction: f64,
        /// Dry-run against /orders/preview instead of submitting
        #[arg(long)]
        preview: bool,
        /// Plugin name recorded in the trade log
        #[arg(long, default_value = controls::ORDER_PLUGIN)]
        plugin: String,
    },
    /// Read the risk config, or set the stake cap
    Risk {
        #[arg(long)]
        stake_cap_pct: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Watch);

    init_logging(matches!(command, Commands::Watch), cli.verbose)?;

    let mut cfg = DashboardConfig::load(&cli.config)?;
    if let Some(api) = cli.api {
        cfg.api.base_url = api;
    }

    let client = Arc::new(AuroraClient::new(
        &cfg.api.base_url,
        Duration::from_secs(cfg.api.timeout_secs),
        cfg.polling.trades_limit,
    )?);

    match command {
        Commands::Watch => {
            info!("watching {}", cfg.api.base_url);
            ui::run(&cfg, client).await?;
        }
        Commands::Status => {
            let health = client.health().await?;
            print_json(&health)?;
        }
        Commands::Tick => {
            let report = client.tick_once().await?;
            print_json(&report)?;
        }
        Commands::Auto { enabled, interval } => {
            let auto = match enabled {
                Some(enabled) => client.set_auto_tick(enabled, interval).await?,
                None => client.auto_tick().await?,
            };
            print_json(&auto)?;
        }
        Commands::Order {
            side,
            fraction,
            preview,
            plugin,
        } => {
            let side = Side::from_str(&side).map_err(anyhow::Error::msg)?;
            if preview {
                let result = client.preview_order(side, fraction).await?;
                print_json(&result)?;
            } else {
                let receipt = client.submit_order(side, fraction, &plugin).await?;
                print_json(&receipt)?;
            }
        }
        Commands::Risk { stake_cap_pct } => {
            let risk = match stake_cap_pct {
                Some(cap) => client.set_risk(cap).await?,
                None => client.risk().await?,
            };
            print_json(&risk)?;
        }
    }

    Ok(())
}

/// The TUI owns the terminal, so watch mode logs to a file; one-shot
/// commands log to stderr like any CLI.
fn init_logging(watch: bool, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    if watch {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("aurora_dash={}", level.to_string().to_lowercase())));
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/aurora-dash.log")?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(log_file))
            .init();
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
