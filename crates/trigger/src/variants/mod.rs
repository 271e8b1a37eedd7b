pub mod stop_loss;
pub mod take_profit;
pub mod trailing_stop;

pub use stop_loss::StopLossTrigger;
pub use take_profit::TakeProfitTrigger;
pub use trailing_stop::TrailingStopTrigger;
