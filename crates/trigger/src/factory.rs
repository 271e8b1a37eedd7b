use std::sync::Arc;

use common::{AdviceSink, Error, Result};

use crate::config::TriggerRecord;
use crate::variants::{StopLossTrigger, TakeProfitTrigger, TrailingStopTrigger};
use crate::Trigger;

/// Build one trigger from its persisted record. Parameter validation
/// happens here, eagerly: a malformed record never produces a live
/// trigger.
pub fn build_trigger(
    record: &TriggerRecord,
    sink: Arc<dyn AdviceSink>,
) -> Result<Box<dyn Trigger>> {
    match record.kind.as_str() {
        StopLossTrigger::KIND => Ok(Box::new(StopLossTrigger::new(record, sink)?)),
        TakeProfitTrigger::KIND => Ok(Box::new(TakeProfitTrigger::new(record, sink)?)),
        TrailingStopTrigger::KIND => Ok(Box::new(TrailingStopTrigger::new(record, sink)?)),
        other => Err(Error::Config(format!("unknown trigger kind '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper::PaperSink;
    use serde_json::json;

    fn record(kind: &str, params: serde_json::Value) -> TriggerRecord {
        TriggerRecord {
            id: Some("trg-7".to_string()),
            kind: kind.to_string(),
            name: "Test".to_string(),
            position_id: "pos-1".to_string(),
            pair: "BTCUSDT".to_string(),
            params,
        }
    }

    #[test]
    fn builds_every_known_kind() {
        let sink: Arc<dyn AdviceSink> = Arc::new(PaperSink::new());
        let order_params = json!({ "action": "market-sell", "amount": 1.0, "price": 100.0 });
        let trail_params = json!({ "action": "market-sell", "amount": 1.0, "trail_pct": 0.05 });

        for (kind, params) in [
            ("stop-loss", &order_params),
            ("take-profit", &order_params),
            ("trailing-stop", &trail_params),
        ] {
            let trigger = build_trigger(&record(kind, params.clone()), sink.clone()).unwrap();
            assert!(trigger.is_live());
            assert_eq!(trigger.id(), "trg-7");
            assert_eq!(trigger.pair(), "BTCUSDT");
            assert_eq!(trigger.position_id(), "pos-1");
        }
    }

    #[test]
    fn unknown_kind_is_config_error() {
        let sink: Arc<dyn AdviceSink> = Arc::new(PaperSink::new());
        let err = build_trigger(&record("time-stop", json!({})), sink).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn generated_id_when_record_has_none() {
        let sink: Arc<dyn AdviceSink> = Arc::new(PaperSink::new());
        let mut rec = record(
            "stop-loss",
            json!({ "action": "market-sell", "amount": 1.0, "price": 100.0 }),
        );
        rec.id = None;
        let trigger = build_trigger(&rec, sink).unwrap();
        assert!(!trigger.id().is_empty());
    }
}
