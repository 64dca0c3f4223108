use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::money::Currency;
use crate::session::{SessionMode, StopConditions};

/// A named, persisted run configuration. Parameter bindings stay in the
/// CLI's `key=value` wire form and are schema-checked at strategy init,
/// exactly like `-P` flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub strategy: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
    pub mode: SessionMode,
    pub currency: Currency,
    #[serde(default)]
    pub stop: StopConditions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_bet: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}
