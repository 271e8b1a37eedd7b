use tokio::sync::mpsc;

use crate::{Advice, Error, Result};

/// Abstraction over whatever turns advices into real orders.
///
/// `ChannelSink` bridges into the async host; `PaperSink` in
/// `crates/paper` records advices for replay runs and tests.
///
/// `submit` must be fast and synchronous: it is called from inside trigger
/// evaluation, which is not allowed to block or suspend. A failed submit
/// does not re-arm the trigger — the trigger closes regardless.
pub trait AdviceSink: Send + Sync {
    /// Hand one advice to the execution layer.
    fn submit(&self, advice: Advice) -> Result<()>;
}

/// Sink backed by an unbounded channel. The unbounded sender makes
/// `submit` a plain synchronous call; the receiving side lives in the
/// async host and drains at its own pace.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Advice>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Advice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AdviceSink for ChannelSink {
    fn submit(&self, advice: Advice) -> Result<()> {
        self.tx
            .send(advice)
            .map_err(|e| Error::Sink(format!("advice channel closed: {e}")))
    }
}
