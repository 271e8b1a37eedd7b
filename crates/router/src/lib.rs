use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use common::{AdviceSink, MarketEvent, Result};
use trigger::{build_trigger, Trigger, TriggerRecord};

/// Holds the live triggers of every open position and routes market
/// events to them.
///
/// The router owns nothing about trigger lifecycle beyond delivery: a
/// trigger closes itself when it fires, and the router stops dispatching
/// to it — lazily through the `is_live` guard during the pass, eagerly by
/// pruning afterwards. Dispatch order within a pass is unspecified;
/// triggers never observe each other.
pub struct TriggerRouter {
    triggers: HashMap<String, Vec<Box<dyn Trigger>>>,
}

impl TriggerRouter {
    pub fn new() -> Self {
        Self {
            triggers: HashMap::new(),
        }
    }

    /// Build and register one trigger per record, failing on the first
    /// malformed one. Used at startup and when restoring after a restart.
    pub fn from_records(records: &[TriggerRecord], sink: Arc<dyn AdviceSink>) -> Result<Self> {
        let mut router = Self::new();
        for record in records {
            let trigger = build_trigger(record, sink.clone())?;
            info!(
                name = %trigger.name(),
                kind = %record.kind,
                position = %trigger.position_id(),
                pair = %trigger.pair(),
                "Registered trigger"
            );
            router.register(trigger);
        }
        Ok(router)
    }

    /// Attach a trigger under its position.
    pub fn register(&mut self, trigger: Box<dyn Trigger>) {
        self.triggers
            .entry(trigger.position_id().to_string())
            .or_default()
            .push(trigger);
    }

    /// Deliver one event to every live trigger whose pair matches, then
    /// prune whatever closed during the pass.
    pub fn dispatch(&mut self, event: &MarketEvent) {
        for triggers in self.triggers.values_mut() {
            for trigger in triggers.iter_mut() {
                if !trigger.is_live() || trigger.pair() != event.pair() {
                    continue;
                }
                match event {
                    MarketEvent::Trade(trade) => trigger.on_trade(trade),
                    MarketEvent::Candle(candle) => trigger.on_candle(candle),
                }
            }
        }
        self.prune();
    }

    /// The guarded position was closed externally: deactivate and drop all
    /// of its triggers.
    pub fn close_position(&mut self, position_id: &str) {
        if let Some(mut triggers) = self.triggers.remove(position_id) {
            for trigger in triggers.iter_mut() {
                trigger.deactivate();
            }
            info!(
                position = position_id,
                dropped = triggers.len(),
                "Position closed — triggers deactivated"
            );
        }
    }

    /// Number of triggers still live.
    pub fn live_count(&self) -> usize {
        self.triggers.values().flatten().filter(|t| t.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    fn prune(&mut self) {
        self.triggers.retain(|position_id, triggers| {
            let before = triggers.len();
            triggers.retain(|t| t.is_live());
            if triggers.len() < before {
                debug!(
                    position = %position_id,
                    removed = before - triggers.len(),
                    "Pruned closed triggers"
                );
            }
            !triggers.is_empty()
        });
    }

    /// Run the dispatch loop over the market broadcast channel. Events are
    /// processed one at a time to completion, which is the serialization
    /// the single-dispatcher model requires.
    pub async fn run(mut self, mut market_rx: broadcast::Receiver<MarketEvent>) {
        info!("TriggerRouter running");
        loop {
            match market_rx.recv().await {
                Ok(event) => self.dispatch(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(dropped = n, "Trigger router lagged — dropped market events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("Market broadcast channel closed — router exiting");
                    return;
                }
            }
        }
    }
}

impl Default for TriggerRouter {
    fn default() -> Self {
        Self::new()
    }
}
