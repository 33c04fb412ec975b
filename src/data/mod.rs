// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw text files to one-hot batches.
//
// The pipeline flows in this order:
//
//   .txt files
//       │
//       ▼
//   TextLoader        → reads files into Documents
//       │
//       ▼
//   Preprocessor      → normalises line endings and punctuation
//       │
//       ▼
//   CorpusEncoder     → characters → vocabulary indices
//       │
//       ▼
//   split_train_val   → training prefix / validation suffix
//       │
//       ▼
//   BatchGenerator    → infinite sliding-window one-hot batches
//       │
//       ▼
//   Prefetcher        → background thread + bounded channel
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Rust Book §16 (Message Passing)

/// Loads .txt files from files or directories
pub mod loader;

/// Normalises raw text before encoding
pub mod preprocessor;

/// Maps text to vocabulary indices
pub mod encoder;

/// Sliding-window one-hot batch generator
pub mod batcher;

/// Background batch production over a bounded channel
pub mod prefetch;

/// Batch-aligned train/validation split
pub mod splitter;
