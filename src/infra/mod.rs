// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles the file formats that outlive a training run:
//
//   checkpoint.rs — The checkpoint artifact
//                   Magic bytes + postcard header (window,
//                   vocabulary, epoch, best value, optimiser
//                   settings) + model config + weights in one
//                   atomically replaced file. Also the best-only
//                   CheckpointWriter callback.
//
//   metrics.rs    — Training metrics logging
//                   Writes the epoch logs to a CSV file next
//                   to the checkpoint for later plotting.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Checkpoint artifact and best-only writer
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
