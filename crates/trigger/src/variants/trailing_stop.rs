use std::sync::Arc;

use serde::Deserialize;

use common::{AdviceAction, AdviceSink, Candle, Error, PositionRef, Result, Trade};

use crate::config::TriggerRecord;
use crate::{Trigger, TriggerState};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParams {
    action: Option<AdviceAction>,
    amount: Option<f64>,
    trail_pct: Option<f64>,
}

/// Validated trailing-stop parameters.
#[derive(Debug, Clone)]
pub struct TrailingStopConfig {
    pub action: AdviceAction,
    pub amount: f64,
    /// Fraction of the watermark the price may retreat before firing,
    /// strictly between 0 and 1 (e.g. 0.05 = 5%).
    pub trail_pct: f64,
}

impl TrailingStopConfig {
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        let raw: RawParams = serde_json::from_value(params.clone())
            .map_err(|e| Error::Config(format!("trailing-stop params: {e}")))?;

        let action = raw
            .action
            .ok_or_else(|| Error::Config("trailing-stop params: missing action".into()))?;
        let amount = raw
            .amount
            .ok_or_else(|| Error::Config("trailing-stop params: missing amount".into()))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::Config(format!(
                "trailing-stop params: amount must be positive, got {amount}"
            )));
        }
        let trail_pct = raw
            .trail_pct
            .ok_or_else(|| Error::Config("trailing-stop params: missing trail_pct".into()))?;
        if !trail_pct.is_finite() || trail_pct <= 0.0 || trail_pct >= 1.0 {
            return Err(Error::Config(format!(
                "trailing-stop params: trail_pct must be between 0 and 1, got {trail_pct}"
            )));
        }

        Ok(Self {
            action,
            amount,
            trail_pct,
        })
    }
}

/// Trails the best price seen since activation and fires when the market
/// retreats `trail_pct` from it. Sell-side trails a high-water mark
/// (protects a long), buy-side trails a low-water mark (protects a short).
///
/// Candle closes ratchet the watermark via bar extremes, but only trade
/// ticks can fire — the stop level always resolves against a real tick.
#[derive(Debug)]
pub struct TrailingStopTrigger {
    state: TriggerState,
    config: TrailingStopConfig,
    /// Best price seen so far; seeded by the first event.
    watermark: Option<f64>,
}

impl TrailingStopTrigger {
    pub const KIND: &'static str = "trailing-stop";

    pub fn new(record: &TriggerRecord, sink: Arc<dyn AdviceSink>) -> Result<Self> {
        let config = TrailingStopConfig::from_params(&record.params)?;
        Ok(Self {
            state: TriggerState::from_record(record, sink),
            config,
            watermark: None,
        })
    }

    /// Monotone update: sell-side only moves up, buy-side only moves down.
    fn ratchet(&mut self, price: f64) {
        let mark = match self.watermark {
            None => price,
            Some(mark) if self.config.action.is_sell() => mark.max(price),
            Some(mark) => mark.min(price),
        };
        self.watermark = Some(mark);
    }

    fn stop_level(&self) -> Option<f64> {
        self.watermark.map(|mark| {
            if self.config.action.is_sell() {
                mark * (1.0 - self.config.trail_pct)
            } else {
                mark * (1.0 + self.config.trail_pct)
            }
        })
    }
}

impl Trigger for TrailingStopTrigger {
    fn id(&self) -> &str {
        self.state.id()
    }

    fn name(&self) -> &str {
        self.state.name()
    }

    fn position(&self) -> &PositionRef {
        self.state.position()
    }

    fn is_live(&self) -> bool {
        self.state.is_live()
    }

    fn on_trade(&mut self, trade: &Trade) {
        if !self.state.is_live() {
            return;
        }
        self.ratchet(trade.price);
        let Some(stop) = self.stop_level() else {
            return;
        };

        let retreated = if self.config.action.is_sell() {
            trade.price <= stop
        } else {
            trade.price >= stop
        };
        if retreated {
            self.state
                .advice(self.config.action, self.config.amount, Some(trade.price));
            self.state.close();
        }
    }

    fn on_candle(&mut self, candle: &Candle) {
        if !self.state.is_live() {
            return;
        }
        // bar extremes count towards the watermark, but never fire
        if self.config.action.is_sell() {
            self.ratchet(candle.high);
        } else {
            self.ratchet(candle.low);
        }
    }

    fn deactivate(&mut self) {
        self.state.close();
    }
}
