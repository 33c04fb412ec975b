// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A single text source loaded from disk: where it came from
// and its raw contents, before normalisation and encoding.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// A raw text document loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The file path — kept for traceability in log output
    pub source: String,

    /// The full text content before any cleaning
    pub text: String,
}

impl Document {
    /// Create a new Document with a source path and text content.
    ///
    /// Example:
    ///   let doc = Document::new("corpus/shakespeare.txt", "To be, or not to be");
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }

    /// Number of characters (not bytes) in the document
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
