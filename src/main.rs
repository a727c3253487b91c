//! tickbot: event-driven paper-trading engine.
//!
//! Streams simulated price ticks, evaluates pluggable strategies per
//! instrument, and settles buy/sell signals against an atomic
//! balance-and-position ledger with an append-only trade journal.

mod config;
mod engine;
mod error;
mod feed;
mod journal;
mod ledger;
mod market;
mod models;
mod store;
mod strategy;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::journal::TradeJournal;
use crate::ledger::Ledger;
use crate::store::{MemoryStore, SqliteStore, Store};

/// Event-driven paper-trading engine CLI.
#[derive(Parser)]
#[command(name = "tickbot")]
#[command(about = "Evaluate trading strategies on streamed price ticks", long_about = None)]
struct Cli {
    /// Database URL for the persistent store
    #[arg(
        short,
        long,
        env = "TICKBOT_DATABASE_URL",
        default_value = "sqlite:./tickbot.db?mode=rwc"
    )]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine against the simulated price feed
    Run {
        /// Instruments to monitor (comma separated)
        #[arg(short, long, value_delimiter = ',', default_value = "AAPL,GOOGL")]
        instruments: Vec<String>,

        /// Starting cash balance, seeded only on a fresh store
        #[arg(short, long, default_value = "10000")]
        balance: Decimal,

        /// Price tick interval in milliseconds
        #[arg(short = 't', long, default_value = "5000")]
        interval_ms: u64,

        /// Price-history samples retained per instrument
        #[arg(long, default_value = "5")]
        retention: usize,

        /// Keep all state in memory instead of the database
        #[arg(long)]
        memory: bool,
    },

    /// Print the trade journal (newest first) and total profit/loss
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            instruments,
            balance,
            interval_ms,
            retention,
            memory,
        } => {
            let store: Arc<dyn Store> = if memory {
                Arc::new(MemoryStore::new())
            } else {
                Arc::new(SqliteStore::connect(&cli.database).await?)
            };

            let config = EngineConfig {
                instruments,
                tick_interval_ms: interval_ms,
                history_retention: retention,
                starting_balance: balance,
                ..EngineConfig::default()
            };

            Engine::new(config, store).await?.run().await?;
        }

        Commands::Report => {
            let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&cli.database).await?);
            let journal = TradeJournal::new(store.clone());
            let ledger = Ledger::new(store);

            let trades = journal.all().await?;

            println!(
                "{:<36}  {:<8} {:<5} {:>10} {:>4}  {}",
                "ID", "SYMBOL", "SIDE", "PRICE", "QTY", "TIME"
            );
            println!("{}", "-".repeat(88));
            for trade in &trades {
                println!(
                    "{:<36}  {:<8} {:<5} {:>10.2} {:>4}  {}",
                    trade.id,
                    trade.instrument,
                    trade.action.as_str(),
                    trade.price,
                    trade.quantity,
                    trade.at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            println!();
            println!("Trades:    {}", trades.len());
            println!("Balance:   ${:.2}", ledger.balance().await?);
            println!("Total P&L: ${:.2}", journal.profit_loss().await?);
        }
    }

    Ok(())
}
