// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only this one.
//
// What's in this layer:
//
//   model.rs     — The character-level network
//                  • `layers` stacked LSTMs over one-hot input
//                  • Dropout after every LSTM layer
//                  • Last time step → Linear → vocab logits
//
//   learner.rs   — CharRnn + SGD/Adam/RMSProp + learning rate behind the
//                  CharModel trait (train / eval / predict /
//                  weight export and import)
//
//   scheduler.rs — Plateau + periodic learning-rate decay
//                  (plain Rust, drives the LearningRate trait)
//
//   trainer.rs   — The epoch loop and the resume path
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hochreiter & Schmidhuber (1997) Long Short-Term Memory

/// Stacked LSTM next-character model
pub mod model;

/// CharModel implementation over Burn's SGD, Adam and RMSProp optimisers
pub mod learner;

/// Adaptive learning-rate scheduler
pub mod scheduler;

/// Epoch loop with scheduler, checkpoint and metrics callbacks
pub mod trainer;
