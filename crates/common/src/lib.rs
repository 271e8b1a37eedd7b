pub mod error;
pub mod sink;
pub mod types;

pub use error::{Error, Result};
pub use sink::{AdviceSink, ChannelSink};
pub use types::*;
