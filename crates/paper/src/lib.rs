use std::sync::Mutex;

use tracing::info;

use common::{Advice, AdviceSink, Error, Result};

/// Recording advice sink for replay runs and tests.
///
/// Every submitted advice is logged and appended to an inspectable ledger.
/// No real orders are ever sent anywhere. The rejecting mode simulates an
/// execution layer that refuses advices, for exercising the
/// close-regardless-of-sink-outcome policy.
pub struct PaperSink {
    advices: Mutex<Vec<Advice>>,
    reject: bool,
}

impl PaperSink {
    pub fn new() -> Self {
        Self {
            advices: Mutex::new(Vec::new()),
            reject: false,
        }
    }

    /// A sink that fails every submission with a sink error.
    pub fn rejecting() -> Self {
        Self {
            advices: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    /// Snapshot of everything submitted so far, in submission order.
    pub fn advices(&self) -> Vec<Advice> {
        self.advices.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.advices.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Default for PaperSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AdviceSink for PaperSink {
    fn submit(&self, advice: Advice) -> Result<()> {
        if self.reject {
            return Err(Error::Sink("paper sink is rejecting advices".into()));
        }

        info!(
            pair = %advice.pair,
            position = %advice.position_id,
            action = %advice.action,
            amount = advice.amount,
            price = ?advice.price,
            "Paper advice recorded"
        );

        self.advices
            .lock()
            .map_err(|_| Error::Sink("paper ledger poisoned".into()))?
            .push(advice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AdviceAction, PositionRef};

    fn advice(action: AdviceAction) -> Advice {
        let pos = PositionRef::new("p1", "BTCUSDT");
        Advice::new(&pos, action, 1.0, Some(100.0)).unwrap()
    }

    #[test]
    fn records_advices_in_submission_order() {
        let sink = PaperSink::new();
        sink.submit(advice(AdviceAction::MarketSell)).unwrap();
        sink.submit(advice(AdviceAction::LimitBuy)).unwrap();

        let recorded = sink.advices();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].action, AdviceAction::MarketSell);
        assert_eq!(recorded[1].action, AdviceAction::LimitBuy);
        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn rejecting_sink_fails_and_records_nothing() {
        let sink = PaperSink::rejecting();
        let err = sink.submit(advice(AdviceAction::MarketSell)).unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
        assert_eq!(sink.count(), 0);
    }
}
