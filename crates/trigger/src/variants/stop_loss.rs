use std::sync::Arc;

use serde::Deserialize;

use common::{AdviceAction, AdviceSink, Candle, Error, PositionRef, Result, Trade};

use crate::config::TriggerRecord;
use crate::{Trigger, TriggerState};

/// Shape of the persisted params payload before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParams {
    action: Option<AdviceAction>,
    amount: Option<f64>,
    price: Option<f64>,
}

/// Validated stop-loss parameters.
#[derive(Debug, Clone)]
pub struct StopLossConfig {
    pub action: AdviceAction,
    pub amount: f64,
    /// The stop level. Only required for limit actions; a market-action
    /// record without one validates but can never fire.
    pub price: Option<f64>,
}

impl StopLossConfig {
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        let raw: RawParams = serde_json::from_value(params.clone())
            .map_err(|e| Error::Config(format!("stop-loss params: {e}")))?;

        let action = raw
            .action
            .ok_or_else(|| Error::Config("stop-loss params: missing action".into()))?;
        let amount = raw
            .amount
            .ok_or_else(|| Error::Config("stop-loss params: missing amount".into()))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::Config(format!(
                "stop-loss params: amount must be positive, got {amount}"
            )));
        }
        if let Some(p) = raw.price {
            if !p.is_finite() || p <= 0.0 {
                return Err(Error::Config(format!(
                    "stop-loss params: price must be positive, got {p}"
                )));
            }
        } else if action.is_limit() {
            return Err(Error::Config(format!(
                "stop-loss params: {action} requires a price"
            )));
        }

        Ok(Self {
            action,
            amount,
            price: raw.price,
        })
    }
}

/// Fires a buy/sell order when the tick price crosses the configured stop
/// level: buy-side when price rises to or above it (closing a short),
/// sell-side when price falls to or below it (closing a long).
#[derive(Debug)]
pub struct StopLossTrigger {
    state: TriggerState,
    config: StopLossConfig,
}

impl StopLossTrigger {
    pub const KIND: &'static str = "stop-loss";

    pub fn new(record: &TriggerRecord, sink: Arc<dyn AdviceSink>) -> Result<Self> {
        let config = StopLossConfig::from_params(&record.params)?;
        Ok(Self {
            state: TriggerState::from_record(record, sink),
            config,
        })
    }
}

impl Trigger for StopLossTrigger {
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
        let Some(stop) = self.config.price else {
            return;
        };

        // price at or above the stop closes a short with a buy
        if self.config.action.is_buy() && trade.price >= stop {
            self.state
                .advice(self.config.action, self.config.amount, Some(trade.price));
            self.state.close();
        }

        // price at or below the stop closes a long with a sell
        if self.config.action.is_sell() && trade.price <= stop {
            self.state
                .advice(self.config.action, self.config.amount, Some(trade.price));
            self.state.close();
        }
    }

    fn on_candle(&mut self, _candle: &Candle) {
        // stop-loss reacts to tick prices only, not bar aggregates
    }

    fn deactivate(&mut self) {
        self.state.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper::PaperSink;
    use serde_json::json;

    fn record(params: serde_json::Value) -> TriggerRecord {
        TriggerRecord {
            id: None,
            kind: StopLossTrigger::KIND.to_string(),
            name: "Stop Loss".to_string(),
            position_id: "pos-1".to_string(),
            pair: "BTCUSDT".to_string(),
            params,
        }
    }

    fn trade(price: f64) -> Trade {
        Trade {
            pair: "BTCUSDT".to_string(),
            price,
            volume: None,
            timestamp: chrono::Utc::now(),
        }
    }

    fn candle(low: f64, high: f64) -> Candle {
        Candle {
            pair: "BTCUSDT".to_string(),
            open: low,
            high,
            low,
            close: high,
            volume: 10.0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn sell_side_fires_at_or_below_stop_then_stays_closed() {
        let sink = Arc::new(PaperSink::new());
        let rec = record(json!({ "action": "market-sell", "amount": 1.0, "price": 100.0 }));
        let mut trigger = StopLossTrigger::new(&rec, sink.clone()).unwrap();

        trigger.on_trade(&trade(101.0));
        assert!(trigger.is_live());
        assert!(sink.advices().is_empty());

        trigger.on_trade(&trade(99.0));
        assert!(!trigger.is_live());
        let advices = sink.advices();
        assert_eq!(advices.len(), 1);
        assert_eq!(advices[0].action, AdviceAction::MarketSell);
        assert_eq!(advices[0].amount, 1.0);
        assert_eq!(advices[0].price, Some(99.0));

        // a later favorable price must not re-fire
        trigger.on_trade(&trade(105.0));
        assert_eq!(sink.advices().len(), 1);
    }

    #[test]
    fn buy_side_fires_at_boundary_inclusive() {
        let sink = Arc::new(PaperSink::new());
        let rec = record(json!({ "action": "limit-buy", "amount": 2.0, "price": 50.0 }));
        let mut trigger = StopLossTrigger::new(&rec, sink.clone()).unwrap();

        trigger.on_trade(&trade(50.0));
        assert!(!trigger.is_live());
        let advices = sink.advices();
        assert_eq!(advices.len(), 1);
        assert_eq!(advices[0].action, AdviceAction::LimitBuy);
        assert_eq!(advices[0].amount, 2.0);
        assert_eq!(advices[0].price, Some(50.0));
    }

    #[test]
    fn buy_side_ignores_prices_below_stop() {
        let sink = Arc::new(PaperSink::new());
        let rec = record(json!({ "action": "market-buy", "amount": 1.0, "price": 200.0 }));
        let mut trigger = StopLossTrigger::new(&rec, sink.clone()).unwrap();

        trigger.on_trade(&trade(199.9));
        assert!(trigger.is_live());
        assert!(sink.advices().is_empty());
    }

    #[test]
    fn candles_never_fire_a_stop_loss() {
        let sink = Arc::new(PaperSink::new());
        let rec = record(json!({ "action": "market-sell", "amount": 1.0, "price": 100.0 }));
        let mut trigger = StopLossTrigger::new(&rec, sink.clone()).unwrap();

        // bar trades straight through the stop level
        trigger.on_candle(&candle(50.0, 150.0));
        assert!(trigger.is_live());
        assert!(sink.advices().is_empty());
    }

    #[test]
    fn deactivated_trigger_ignores_everything() {
        let sink = Arc::new(PaperSink::new());
        let rec = record(json!({ "action": "market-sell", "amount": 1.0, "price": 100.0 }));
        let mut trigger = StopLossTrigger::new(&rec, sink.clone()).unwrap();

        trigger.deactivate();
        trigger.deactivate(); // idempotent
        assert!(!trigger.is_live());

        trigger.on_trade(&trade(1.0));
        trigger.on_candle(&candle(1.0, 1.0));
        assert!(sink.advices().is_empty());
    }

    #[test]
    fn market_action_without_price_validates_but_never_fires() {
        let sink = Arc::new(PaperSink::new());
        let rec = record(json!({ "action": "market-sell", "amount": 1.0 }));
        let mut trigger = StopLossTrigger::new(&rec, sink.clone()).unwrap();

        trigger.on_trade(&trade(0.0001));
        assert!(trigger.is_live());
        assert!(sink.advices().is_empty());
    }

    #[test]
    fn trigger_closes_even_when_sink_rejects() {
        let sink = Arc::new(PaperSink::rejecting());
        let rec = record(json!({ "action": "market-sell", "amount": 1.0, "price": 100.0 }));
        let mut trigger = StopLossTrigger::new(&rec, sink.clone()).unwrap();

        trigger.on_trade(&trade(90.0));
        assert!(!trigger.is_live(), "close() must run regardless of sink outcome");
        assert!(sink.advices().is_empty());
    }

    #[test]
    fn construction_rejects_bad_params() {
        let sink: Arc<dyn AdviceSink> = Arc::new(PaperSink::new());
        let bad = [
            json!({ "amount": 1.0, "price": 100.0 }),                       // missing action
            json!({ "action": "hold", "amount": 1.0, "price": 100.0 }),     // unknown action
            json!({ "action": "market-buy", "price": 100.0 }),              // missing amount
            json!({ "action": "market-buy", "amount": 0.0, "price": 1.0 }), // zero amount
            json!({ "action": "market-buy", "amount": -2.0, "price": 1.0 }),
            json!({ "action": "market-buy", "amount": "a lot", "price": 1.0 }),
            json!({ "action": "limit-buy", "amount": 1.0 }),                // limit without price
            json!({ "action": "limit-sell", "amount": 1.0, "price": "low" }),
            json!({ "action": "market-buy", "amount": 1.0, "level": 5.0 }), // unknown field
            serde_json::Value::Null,                                        // no params at all
        ];

        for params in bad {
            let err = StopLossTrigger::new(&record(params.clone()), sink.clone()).unwrap_err();
            assert!(
                matches!(err, Error::Config(_)),
                "expected Config error for {params}, got {err:?}"
            );
        }
    }
}
