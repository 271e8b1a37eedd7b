use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Persisted form of one trigger, as stored by the persistence layer or
/// written in the trigger file (TOML).
///
/// Example `config/triggers.toml`:
/// ```toml
/// [[trigger]]
/// kind = "stop-loss"
/// name = "BTC Stop Loss"
/// position_id = "pos-1"
/// pair = "BTCUSDT"
///
/// [trigger.params]
/// action = "market-sell"
/// amount = 0.5
/// price = 58000.0
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerRecord {
    /// Stable id across restores. Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Variant tag: "stop-loss", "take-profit" or "trailing-stop".
    pub kind: String,
    /// Human-readable label shown in logs.
    pub name: String,
    /// Id of the open position this trigger guards.
    pub position_id: String,
    /// Trading pair of that position, e.g. "BTCUSDT".
    pub pair: String,
    /// Variant-specific parameters, validated at construction.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Top-level trigger config file (TOML).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerFileConfig {
    #[serde(rename = "trigger")]
    pub triggers: Vec<TriggerRecord>,
}

impl TriggerFileConfig {
    /// Load from a TOML file. Malformed records surface here, before any
    /// trigger is ever treated as live.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read trigger file '{path}': {e}")))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse trigger file '{path}': {e}")))
    }
}
