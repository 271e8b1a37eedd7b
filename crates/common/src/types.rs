use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single tick from the exchange stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub pair: String,
    pub price: f64,
    /// Traded quantity, when the feed supplies it.
    #[serde(default)]
    pub volume: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// An OHLCV bar over one feed interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub pair: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// Market data event delivered to triggers. Read-only input: triggers
/// never mutate events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MarketEvent {
    Trade(Trade),
    Candle(Candle),
}

impl MarketEvent {
    pub fn pair(&self) -> &str {
        match self {
            MarketEvent::Trade(t) => &t.pair,
            MarketEvent::Candle(c) => &c.pair,
        }
    }
}

/// The order action a trigger asks for when its condition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdviceAction {
    MarketBuy,
    MarketSell,
    LimitBuy,
    LimitSell,
}

impl AdviceAction {
    pub fn is_buy(&self) -> bool {
        matches!(self, AdviceAction::MarketBuy | AdviceAction::LimitBuy)
    }

    pub fn is_sell(&self) -> bool {
        !self.is_buy()
    }

    /// True for actions that need an absolute price level on the advice.
    pub fn is_limit(&self) -> bool {
        matches!(self, AdviceAction::LimitBuy | AdviceAction::LimitSell)
    }
}

impl std::fmt::Display for AdviceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceAction::MarketBuy => write!(f, "market-buy"),
            AdviceAction::MarketSell => write!(f, "market-sell"),
            AdviceAction::LimitBuy => write!(f, "limit-buy"),
            AdviceAction::LimitSell => write!(f, "limit-sell"),
        }
    }
}

/// Non-owning reference to the open position a trigger guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRef {
    pub id: String,
    pub pair: String,
}

impl PositionRef {
    pub fn new(id: impl Into<String>, pair: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pair: pair.into(),
        }
    }
}

/// A directive handed to the advice sink when a trigger fires.
///
/// Invariants enforced at construction: `amount > 0` and finite; `price`,
/// when present, finite and positive; limit actions always carry a price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub id: String,
    pub position_id: String,
    pub pair: String,
    pub action: AdviceAction,
    pub amount: f64,
    /// Absolute price level. Required for limit actions; for market
    /// actions it records the event price the trigger fired at.
    pub price: Option<f64>,
    pub issued_at: DateTime<Utc>,
}

impl Advice {
    pub fn new(
        position: &PositionRef,
        action: AdviceAction,
        amount: f64,
        price: Option<f64>,
    ) -> Result<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidAdvice(format!(
                "amount must be a positive number, got {amount}"
            )));
        }
        if let Some(p) = price {
            if !p.is_finite() || p <= 0.0 {
                return Err(Error::InvalidAdvice(format!(
                    "price must be a positive number, got {p}"
                )));
            }
        } else if action.is_limit() {
            return Err(Error::InvalidAdvice(format!(
                "{action} advice requires a price"
            )));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            position_id: position.id.clone(),
            pair: position.pair.clone(),
            action,
            amount,
            price,
            issued_at: Utc::now(),
        })
    }
}
