// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that name the core concepts
// of character-level training.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A loaded text document
pub mod document;

// Character ↔ index bijection used for one-hot encoding
pub mod vocabulary;

// Dense one-hot batches handed to the model
pub mod batch;

// Per-epoch metric mapping and running step statistics
pub mod epoch;

// Metric direction (minimise / maximise) and its auto rule
pub mod monitor;

// Optimiser family and persisted optimiser settings
pub mod optimizer;

// Core abstractions (traits) that other layers implement
pub mod traits;
