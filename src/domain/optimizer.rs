// ============================================================
// Layer 3 — Optimiser Choice
// ============================================================
// The optimiser family and the settings stored next to the
// weights. Each family has its own default learning rate:
//
//   sgd     → 0.01
//   adam    → 0.001
//   rmsprop → 0.001
//
// Every family clips gradients element-wise to [-clip, clip].
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown optimiser '{0}' (expected 'sgd', 'adam' or 'rmsprop')")]
pub struct ParseOptimizerError(String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adam,
    RmsProp,
}

impl OptimizerKind {
    pub fn default_learning_rate(self) -> f64 {
        match self {
            Self::Sgd     => 0.01,
            Self::Adam    => 0.001,
            Self::RmsProp => 0.001,
        }
    }
}

impl FromStr for OptimizerKind {
    type Err = ParseOptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgd"     => Ok(Self::Sgd),
            "adam"    => Ok(Self::Adam),
            "rmsprop" => Ok(Self::RmsProp),
            other     => Err(ParseOptimizerError(other.to_string())),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sgd     => f.write_str("sgd"),
            Self::Adam    => f.write_str("adam"),
            Self::RmsProp => f.write_str("rmsprop"),
        }
    }
}

/// Optimiser configuration persisted next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub kind: OptimizerKind,
    pub learning_rate: f64,
    /// Element-wise gradient clipping bound
    pub clip_value: Option<f64>,
}

impl OptimizerSettings {
    /// `kind` at its default learning rate.
    pub fn with_defaults(kind: OptimizerKind, clip_value: Option<f64>) -> Self {
        Self { kind, learning_rate: kind.default_learning_rate(), clip_value }
    }
}
