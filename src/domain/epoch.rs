// ============================================================
// Layer 3 — Epoch Logs
// ============================================================
// The mapping<string, float> handed to every end-of-epoch
// callback, plus the running totals used to build it.
//
// Metric names:
//   loss, acc          — training set
//   val_loss, val_acc  — validation set
//   lr                 — learning rate used during the epoch
//
// Reference: Rust Book §8 (Collections)

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

pub const LOSS:     &str = "loss";
pub const ACC:      &str = "acc";
pub const VAL_LOSS: &str = "val_loss";
pub const VAL_ACC:  &str = "val_acc";
pub const LR:       &str = "lr";

/// Names a scheduler or checkpoint may monitor.
pub const MONITORABLE: [&str; 4] = [LOSS, ACC, VAL_LOSS, VAL_ACC];

/// Metric values observed during one epoch, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochLogs {
    values: BTreeMap<String, f64>,
}

impl EpochLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Loss and accuracy of a single optimisation or evaluation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepStats {
    /// Mean cross-entropy over the batch
    pub loss:    f64,
    /// Rows whose arg-max prediction equals the target
    pub correct: usize,
    /// Rows in the batch
    pub samples: usize,
}

impl StepStats {
    pub fn new(loss: f64, correct: usize, samples: usize) -> Self {
        Self { loss, correct, samples }
    }
}

/// Accumulates `StepStats` across an epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    loss_sum: f64,
    steps:    usize,
    correct:  usize,
    samples:  usize,
}

impl RunningStats {
    pub fn push(&mut self, step: StepStats) {
        self.loss_sum += step.loss;
        self.steps    += 1;
        self.correct  += step.correct;
        self.samples  += step.samples;
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Mean step loss, NaN when no step ran
    pub fn mean_loss(&self) -> f64 {
        if self.steps > 0 { self.loss_sum / self.steps as f64 } else { f64::NAN }
    }

    /// Fraction of correct rows, 0 when no row was seen
    pub fn accuracy(&self) -> f64 {
        if self.samples > 0 { self.correct as f64 / self.samples as f64 } else { 0.0 }
    }
}
