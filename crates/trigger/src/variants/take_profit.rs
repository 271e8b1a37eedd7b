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
    price: Option<f64>,
}

/// Validated take-profit parameters. Same shape as stop-loss; the
/// comparisons are mirrored.
#[derive(Debug, Clone)]
pub struct TakeProfitConfig {
    pub action: AdviceAction,
    pub amount: f64,
    pub price: Option<f64>,
}

impl TakeProfitConfig {
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        let raw: RawParams = serde_json::from_value(params.clone())
            .map_err(|e| Error::Config(format!("take-profit params: {e}")))?;

        let action = raw
            .action
            .ok_or_else(|| Error::Config("take-profit params: missing action".into()))?;
        let amount = raw
            .amount
            .ok_or_else(|| Error::Config("take-profit params: missing amount".into()))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::Config(format!(
                "take-profit params: amount must be positive, got {amount}"
            )));
        }
        if let Some(p) = raw.price {
            if !p.is_finite() || p <= 0.0 {
                return Err(Error::Config(format!(
                    "take-profit params: price must be positive, got {p}"
                )));
            }
        } else if action.is_limit() {
            return Err(Error::Config(format!(
                "take-profit params: {action} requires a price"
            )));
        }

        Ok(Self {
            action,
            amount,
            price: raw.price,
        })
    }
}

/// Mirror image of the stop-loss: sell-side exits a long when price rises
/// to or above the target, buy-side covers a short when price falls to or
/// below it.
#[derive(Debug)]
pub struct TakeProfitTrigger {
    state: TriggerState,
    config: TakeProfitConfig,
}

impl TakeProfitTrigger {
    pub const KIND: &'static str = "take-profit";

    pub fn new(record: &TriggerRecord, sink: Arc<dyn AdviceSink>) -> Result<Self> {
        let config = TakeProfitConfig::from_params(&record.params)?;
        Ok(Self {
            state: TriggerState::from_record(record, sink),
            config,
        })
    }
}

impl Trigger for TakeProfitTrigger {
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
        let Some(target) = self.config.price else {
            return;
        };

        // long exits into strength
        if self.config.action.is_sell() && trade.price >= target {
            self.state
                .advice(self.config.action, self.config.amount, Some(trade.price));
            self.state.close();
        }

        // short covers into weakness
        if self.config.action.is_buy() && trade.price <= target {
            self.state
                .advice(self.config.action, self.config.amount, Some(trade.price));
            self.state.close();
        }
    }

    fn on_candle(&mut self, _candle: &Candle) {
        // tick-driven, like stop-loss
    }

    fn deactivate(&mut self) {
        self.state.close();
    }
}
