// ============================================================
// Layer 3 — Monitored Metric Direction
// ============================================================
// Which way a monitored metric should move. Shared by the
// learning-rate scheduler and the checkpoint writer so both
// agree on what "better" means.
//
//   Auto  → Maximize if the metric name contains "acc",
//           Minimize otherwise (loss-style metrics)
//   Min   → Minimize
//   Max   → Maximize
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid mode '{0}' (expected 'auto', 'min' or 'max')")]
pub struct ParseModeError(String);

/// Configured comparison mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Auto,
    Min,
    Max,
}

impl Mode {
    /// `Auto` maximises any metric whose name contains "acc",
    /// and minimises everything else.
    pub fn resolve(self, monitor: &str) -> Direction {
        match self {
            Self::Min => Direction::Minimize,
            Self::Max => Direction::Maximize,
            Self::Auto if monitor.contains("acc") => Direction::Maximize,
            Self::Auto => Direction::Minimize,
        }
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "min"  => Ok(Self::Min),
            "max"  => Ok(Self::Max),
            other  => Err(ParseModeError(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Min  => f.write_str("min"),
            Self::Max  => f.write_str("max"),
        }
    }
}

/// Resolved comparison direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    pub fn initial_best(self) -> f64 {
        match self {
            Self::Minimize => f64::INFINITY,
            Self::Maximize => f64::NEG_INFINITY,
        }
    }

    /// Is `new` better than `best` by more than `epsilon`?
    pub fn improved(self, new: f64, best: f64, epsilon: f64) -> bool {
        match self {
            Self::Minimize => new < best - epsilon,
            Self::Maximize => new > best + epsilon,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_mode_resolution() {
        assert_eq!(Mode::Auto.resolve("val_acc"), Direction::Maximize);
        assert_eq!(Mode::Auto.resolve("acc"), Direction::Maximize);
        assert_eq!(Mode::Auto.resolve("val_loss"), Direction::Minimize);
        assert_eq!(Mode::Min.resolve("val_acc"), Direction::Minimize);
        assert_eq!(Mode::Max.resolve("loss"), Direction::Maximize);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("AUTO".parse::<Mode>().unwrap(), Mode::Auto);
        assert_eq!("max".parse::<Mode>().unwrap(), Mode::Max);
        assert!("maximum".parse::<Mode>().is_err());
        assert_eq!(Mode::Min.to_string(), "min");
    }

    #[test]
    fn test_improvement_is_strict_beyond_epsilon() {
        assert!(Direction::Minimize.improved(0.5, 1.0, 0.0));
        assert!(!Direction::Minimize.improved(1.0, 1.0, 0.0));
        assert!(!Direction::Minimize.improved(0.99995, 1.0, 1e-4));
        assert!(Direction::Maximize.improved(0.8, 0.7, 1e-4));
        assert!(Direction::Maximize.improved(0.1, Direction::Maximize.initial_best(), 0.0));
    }
}
