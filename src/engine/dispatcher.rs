//! Event core: fans price updates out to strategies and serializes
//! evaluation-and-settlement per instrument.
//!
//! Each instrument cycles Idle -> Evaluating -> Settling -> Idle. An event
//! arriving while its instrument is busy lands in that instrument's single
//! pending slot, where a newer event supersedes an older one (coalescing, not
//! a FIFO of every tick). Different instruments run their cycles in parallel;
//! no lock is held across a full cycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::market::PriceStore;
use crate::models::PriceSample;
use crate::strategy::Strategy;

use super::{ExecutionGate, Settlement};

#[derive(Default)]
struct Slot {
    // newest superseding event queued behind the in-flight cycle
    pending: Option<PriceSample>,
}

pub struct Dispatcher {
    prices: Arc<PriceStore>,
    gate: Arc<ExecutionGate>,
    strategies: Vec<Arc<dyn Strategy>>,
    // busy instruments; absence means idle. Never held across an await of a
    // cycle, only for slot bookkeeping.
    slots: Mutex<HashMap<String, Slot>>,
}

impl Dispatcher {
    pub fn new(
        prices: Arc<PriceStore>,
        gate: Arc<ExecutionGate>,
        strategies: Vec<Arc<dyn Strategy>>,
    ) -> Self {
        Self {
            prices,
            gate,
            strategies,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Consume price events until the channel closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<PriceSample>) {
        while let Some(event) = events.recv().await {
            Arc::clone(&self).dispatch(event).await;
        }
        debug!("price event channel closed");
    }

    /// Route one price event. Returns once the event is either claimed by a
    /// new cycle task or coalesced into the pending slot.
    pub async fn dispatch(self: Arc<Self>, event: PriceSample) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(&event.instrument) {
            debug!(instrument = %event.instrument, price = %event.price, "coalescing price event");
            slot.pending = Some(event);
            return;
        }
        slots.insert(event.instrument.clone(), Slot::default());
        drop(slots);

        tokio::spawn(async move { self.run_cycles(event).await });
    }

    /// True when no instrument has a cycle in flight.
    pub async fn is_idle(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    /// Drive cycles for one instrument until its pending slot is empty, then
    /// release the instrument back to idle.
    async fn run_cycles(self: Arc<Self>, first: PriceSample) {
        let instrument = first.instrument.clone();
        let mut event = first;
        loop {
            self.evaluate_and_settle(&event).await;

            let mut slots = self.slots.lock().await;
            match slots.get_mut(&instrument).and_then(|slot| slot.pending.take()) {
                Some(next) => event = next,
                None => {
                    slots.remove(&instrument);
                    break;
                }
            }
        }
    }

    /// One full evaluate-then-settle cycle. Always reaches a terminal
    /// outcome; storage failures are logged and the instrument goes back to
    /// idle so the next tick retries.
    async fn evaluate_and_settle(&self, event: &PriceSample) {
        let window = match self.prices.window(&event.instrument).await {
            Ok(window) => window,
            Err(EngineError::PriceNotFound { .. }) => return,
            Err(e) => {
                error!(instrument = %event.instrument, error = %e, "failed to snapshot prices");
                return;
            }
        };

        // first non-hold signal wins, in registration order
        let decision = self.strategies.iter().find_map(|strategy| {
            let signal = strategy.evaluate(&window);
            debug!(
                instrument = %event.instrument,
                strategy = strategy.name(),
                signal = ?signal,
                "strategy evaluated"
            );
            signal.action().map(|action| (strategy.name(), action))
        });

        let Some((strategy, action)) = decision else {
            return;
        };

        // settle at the price the winning strategy actually saw
        let price = window.latest();
        match self.gate.settle(window.instrument(), action, price).await {
            Ok(Settlement::Executed(trade)) => {
                info!(
                    instrument = %event.instrument,
                    strategy,
                    action = %trade.action,
                    price = %trade.price,
                    "trade settled"
                );
            }
            Ok(Settlement::Suppressed(reason)) => {
                debug!(
                    instrument = %event.instrument,
                    strategy,
                    reason = ?reason,
                    "signal suppressed"
                );
            }
            Err(e) => {
                error!(instrument = %event.instrument, error = %e, "settlement failed");
            }
        }
    }
}
