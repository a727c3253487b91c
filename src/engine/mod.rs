//! Engine wiring and lifecycle.

mod dispatcher;
mod gate;

pub use dispatcher::Dispatcher;
pub use gate::{ExecutionGate, Settlement, SuppressReason};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::feed::RandomWalkFeed;
use crate::journal::TradeJournal;
use crate::ledger::Ledger;
use crate::market::PriceStore;
use crate::models::PriceSample;
use crate::store::Store;
use crate::strategy;

/// Fully wired trading engine: feed -> price store -> dispatcher ->
/// strategies -> gate -> ledger + journal, all over one store backend.
pub struct Engine {
    config: EngineConfig,
    prices: Arc<PriceStore>,
    ledger: Arc<Ledger>,
    journal: Arc<TradeJournal>,
    dispatcher: Arc<Dispatcher>,
    events: mpsc::UnboundedReceiver<PriceSample>,
}

impl Engine {
    /// Wire the full pipeline over the given store backend.
    pub async fn new(config: EngineConfig, store: Arc<dyn Store>) -> Result<Self> {
        let strategies = strategy::build_strategies(&config.strategy);
        anyhow::ensure!(!strategies.is_empty(), "no strategies enabled");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let prices = Arc::new(
            PriceStore::new(store.clone(), config.effective_retention()).with_notifier(events_tx),
        );

        let ledger = Arc::new(Ledger::new(store.clone()));
        ledger.init(config.starting_balance).await?;

        let journal = Arc::new(TradeJournal::new(store));
        let gate = Arc::new(ExecutionGate::new(ledger.clone(), journal.clone()));
        let dispatcher = Arc::new(Dispatcher::new(prices.clone(), gate, strategies));

        Ok(Self {
            config,
            prices,
            ledger,
            journal,
            dispatcher,
            events: events_rx,
        })
    }

    /// Run until ctrl-c: dispatcher loop, simulated feed, and a periodic P&L
    /// report. Drains in-flight cycles before the final report.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            prices,
            ledger,
            journal,
            dispatcher,
            events,
        } = self;

        info!(
            instruments = ?config.instruments,
            tick_interval_ms = config.tick_interval_ms,
            balance = %ledger.balance().await?,
            "starting engine"
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("shutdown signal received");
                shutdown.store(true, Ordering::SeqCst);
            });
        }

        let dispatch_task = tokio::spawn(dispatcher.clone().run(events));

        // periodic report, the reporting collaborator's live view
        let report_task = {
            let journal = journal.clone();
            let ledger = ledger.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = interval(Duration::from_secs(30));
                ticker.tick().await; // skip the immediate first tick
                while !shutdown.load(Ordering::SeqCst) {
                    ticker.tick().await;
                    match (journal.profit_loss().await, ledger.balance().await) {
                        (Ok(pnl), Ok(balance)) => {
                            info!(pnl = %pnl, balance = %balance, "periodic report");
                        }
                        (Err(e), _) | (_, Err(e)) => {
                            warn!(error = %e, "periodic report failed");
                        }
                    }
                }
            })
        };

        let feed = RandomWalkFeed::new(
            prices.clone(),
            &config.instruments,
            config.feed_start_price,
            Duration::from_millis(config.tick_interval_ms),
        );
        feed.run(shutdown.clone()).await;

        // let in-flight evaluation cycles reach their terminal outcome
        while !dispatcher.is_idle().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        dispatch_task.abort();
        report_task.abort();

        let trades = journal.all().await?;
        info!(
            trades = trades.len(),
            pnl = %journal.profit_loss().await?,
            balance = %ledger.balance().await?,
            "engine stopped"
        );
        Ok(())
    }

    /// Push one external price tick through the pipeline (the upstream feed
    /// interface): write to the price store, which notifies the dispatcher.
    pub async fn on_price_tick(
        &self,
        instrument: &str,
        price: rust_decimal::Decimal,
    ) -> Result<()> {
        self.prices.update(instrument, price).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    // End-to-end: five ascending ticks produce the MA crossover
    // buy, settled at the latest price and journaled.
    #[tokio::test]
    async fn test_pipeline_settles_ma_crossover_buy() {
        let config = EngineConfig {
            starting_balance: dec!(1000),
            ..EngineConfig::default()
        };
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let mut engine = Engine::new(config, store).await.unwrap();

        // history ends newest-first [102, 101, 99, 98, 97]:
        // shortMA ~100.67 > longMA 99.4 -> BUY at 102. Earlier windows are
        // too short for the MA and too flat for momentum, so they hold.
        for price in [dec!(97), dec!(98), dec!(99), dec!(101), dec!(102)] {
            engine.on_price_tick("AAPL", price).await.unwrap();

            // drive the notifier event through the dispatcher by hand
            let event = engine.events.try_recv().unwrap();
            engine.dispatcher.clone().dispatch(event).await;
            while !engine.dispatcher.is_idle().await {
                tokio::task::yield_now().await;
            }
        }

        let ledger = engine.ledger.clone();
        let journal = engine.journal.clone();

        let trades = journal.all().await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].instrument, "AAPL");
        assert_eq!(trades[0].price, dec!(102));
        assert_eq!(ledger.balance().await.unwrap(), dec!(898));
        assert_eq!(ledger.position("AAPL").await.unwrap(), dec!(1));
    }
}
