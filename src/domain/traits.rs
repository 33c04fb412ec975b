// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers:
//   - DocumentSource → where raw text comes from
//   - LearningRate   → the one mutable optimiser knob
//   - CharModel      → the trainable network, opaque to the
//                      data pipeline and the training loop
//   - EpochCallback  → passive end-of-epoch observers
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::batch::OneHotBatch;
use crate::domain::document::Document;
use crate::domain::epoch::{EpochLogs, StepStats};
use crate::domain::optimizer::OptimizerSettings;

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load text documents.
///
/// Implementations:
///   - TextLoader → plain .txt files and directories
pub trait DocumentSource {
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── LearningRate ─────────────────────────────────────────────────────────────
/// Read/write access to the optimiser's learning rate.
///
/// During training the learning-rate scheduler is the only caller
/// of `set_learning_rate`; every other component receives the model
/// by shared reference.
pub trait LearningRate {
    fn learning_rate(&self) -> f64;
    fn set_learning_rate(&mut self, lr: f64);
}

// ─── CharModel ────────────────────────────────────────────────────────────────
/// A trainable next-character model.
///
/// Implementations:
///   - LstmLearner → stacked LSTM built with Burn
pub trait CharModel: LearningRate {
    /// Topology needed to rebuild an untrained instance before
    /// importing weights.
    type Config: Clone + std::fmt::Debug + Serialize + DeserializeOwned;

    fn config(&self) -> Self::Config;

    fn optimizer_settings(&self) -> OptimizerSettings;

    /// One forward + backward + optimiser update.
    fn train_step(&mut self, batch: &OneHotBatch) -> Result<StepStats>;

    /// Forward pass only, no parameter update.
    fn eval_step(&self, batch: &OneHotBatch) -> Result<StepStats>;

    /// Next-character probabilities — shape: [batch_size, vocab_size]
    fn predict(&self, batch: &OneHotBatch) -> Result<Vec<f32>>;

    /// Serialise all parameters.
    fn export_weights(&self) -> Result<Vec<u8>>;

    /// Replace all parameters with previously exported ones.
    fn import_weights(&mut self, weights: Vec<u8>) -> Result<()>;
}

// ─── EpochCallback ────────────────────────────────────────────────────────────
/// A passive sink notified once per finished epoch.
///
/// Implementations:
///   - MetricsLogger → appends a CSV row
pub trait EpochCallback {
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) -> Result<()>;
}
