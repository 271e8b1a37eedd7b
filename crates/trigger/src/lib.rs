pub mod config;
pub mod factory;
pub mod variants;

pub use config::{TriggerFileConfig, TriggerRecord};
pub use factory::build_trigger;
pub use variants::{StopLossTrigger, TakeProfitTrigger, TrailingStopTrigger};

use std::sync::Arc;

use tracing::{info, warn};

use common::{Advice, AdviceAction, AdviceSink, Candle, PositionRef, Trade};

/// All condition variants must satisfy this trait.
///
/// A trigger watches market events for one open position and emits at most
/// one advice before going closed. Handlers are fast, synchronous and must
/// return immediately when the trigger is no longer live.
pub trait Trigger: Send + std::fmt::Debug {
    /// Stable identity, preserved across restores.
    fn id(&self) -> &str;

    /// Human-readable label shown in logs, e.g. "Stop Loss".
    fn name(&self) -> &str;

    /// The open position this trigger guards.
    fn position(&self) -> &PositionRef;

    /// True until the trigger has fired or been externally deactivated.
    fn is_live(&self) -> bool;

    /// React to a single trade tick. May be a no-op.
    fn on_trade(&mut self, trade: &Trade);

    /// React to a closed candle. May be a no-op.
    fn on_candle(&mut self, candle: &Candle);

    /// External cancellation: the guarded position was closed elsewhere.
    fn deactivate(&mut self);

    fn pair(&self) -> &str {
        &self.position().pair
    }

    fn position_id(&self) -> &str {
        &self.position().id
    }
}

/// Lifecycle core shared by every variant: identity, liveness and advice
/// emission. Variants embed one and delegate the `Trigger` accessors to it.
pub struct TriggerState {
    id: String,
    name: String,
    position: PositionRef,
    live: bool,
    sink: Arc<dyn AdviceSink>,
}

impl std::fmt::Debug for TriggerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerState")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

impl TriggerState {
    pub fn from_record(record: &TriggerRecord, sink: Arc<dyn AdviceSink>) -> Self {
        Self {
            id: record
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: record.name.clone(),
            position: PositionRef::new(record.position_id.clone(), record.pair.clone()),
            live: true,
            sink,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> &PositionRef {
        &self.position
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Forward an advice to the sink. Does not change liveness: the caller
    /// decides whether to close. A sink failure is reported and dropped —
    /// no retry, no re-arm.
    pub fn advice(&self, action: AdviceAction, amount: f64, price: Option<f64>) {
        let advice = match Advice::new(&self.position, action, amount, price) {
            Ok(a) => a,
            Err(e) => {
                warn!(trigger = %self.name, error = %e, "Dropping malformed advice");
                return;
            }
        };

        info!(
            trigger = %self.name,
            pair = %self.position.pair,
            action = %action,
            amount = amount,
            price = ?price,
            "Trigger fired — emitting advice"
        );

        if let Err(e) = self.sink.submit(advice) {
            warn!(trigger = %self.name, error = %e, "Advice sink rejected advice");
        }
    }

    /// One-way transition to closed. Idempotent: a second call is a no-op.
    pub fn close(&mut self) {
        if self.live {
            self.live = false;
            info!(trigger = %self.name, pair = %self.position.pair, "Trigger closed");
        }
    }
}
