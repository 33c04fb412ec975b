// ============================================================
// Layer 4 — Sliding-Window Batch Generator
// ============================================================
// An infinite producer of one-hot (input, target) batches.
//
// With cursor `ind`, batch size B and window W, one batch is:
//
//   target[i]    = corpus[ind + i + W]        for i in 0..B
//   input[i, j]  = corpus[ind + i + j]        for j in 0..W
//
// The B windows overlap: row i+1 starts one character after
// row i. After each batch the cursor advances by B.
//
// End of corpus:
//   A batch needs corpus[ind + B + W - 1], so when
//   ind + B + W > len the cursor resets to 0 and the batch is
//   produced from the start instead. The final partial stretch
//   of the corpus is skipped, and the generator never ends.
//
// Only that bounds condition wraps. An index outside the
// vocabulary is a DataFault and is returned to the caller.
//
// A generator owns its cursor; give every consumer its own
// instance (see prefetch.rs) instead of sharing one.
//
// Reference: Rust Book §13 (Iterators)

use crate::data::encoder::EncodedCorpus;
use crate::domain::batch::OneHotBatch;

// ─── Errors ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("batch size and window must be positive (batch={batch_size}, window={window})")]
    InvalidShape { batch_size: usize, window: usize },

    #[error("corpus of {len} characters is shorter than one batch \
             (batch {batch_size} + window {window} = {required})")]
    TooShort { len: usize, batch_size: usize, window: usize, required: usize },

    #[error("corpus index {id} at offset {offset} is outside the vocabulary of size {vocab_size}")]
    DataFault { offset: usize, id: usize, vocab_size: usize },
}

/// Outcome of trying to build the batch at one cursor position.
enum Production {
    Batch(OneHotBatch),
    EndOfCorpus,
}

// ─── BatchGenerator ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct BatchGenerator {
    corpus:      EncodedCorpus,
    batch_size:  usize,
    window:      usize,
    cursor:      usize,
    wraparounds: usize,
}

impl BatchGenerator {
    pub fn new(corpus: EncodedCorpus, batch_size: usize, window: usize) -> Result<Self, BatchError> {
        if batch_size == 0 || window == 0 {
            return Err(BatchError::InvalidShape { batch_size, window });
        }

        let required = batch_size + window;
        if corpus.len() < required {
            return Err(BatchError::TooShort {
                len: corpus.len(),
                batch_size,
                window,
                required,
            });
        }

        Ok(Self { corpus, batch_size, window, cursor: 0, wraparounds: 0 })
    }

    /// Produce the next batch, wrapping to the start of the corpus
    /// when the current cursor cannot fill a whole batch.
    pub fn next_batch(&mut self) -> Result<OneHotBatch, BatchError> {
        let batch = match self.produce(self.cursor)? {
            Production::Batch(batch) => batch,
            Production::EndOfCorpus => {
                tracing::trace!(
                    "Cursor {} + {} + {} passes corpus end {}, wrapping to 0",
                    self.cursor, self.batch_size, self.window, self.corpus.len()
                );
                self.cursor = 0;
                self.wraparounds += 1;

                match self.produce(0)? {
                    Production::Batch(batch) => batch,
                    // Unreachable after the length check in `new`
                    Production::EndOfCorpus => {
                        return Err(BatchError::TooShort {
                            len:        self.corpus.len(),
                            batch_size: self.batch_size,
                            window:     self.window,
                            required:   self.batch_size + self.window,
                        });
                    }
                }
            }
        };

        self.cursor += self.batch_size;
        Ok(batch)
    }

    fn produce(&self, ind: usize) -> Result<Production, BatchError> {
        if ind + self.batch_size + self.window > self.corpus.len() {
            return Ok(Production::EndOfCorpus);
        }

        let ids        = self.corpus.ids();
        let vocab_size = self.corpus.vocab_size();
        let checked = |offset: usize| -> Result<usize, BatchError> {
            let id = ids[offset];
            if id < vocab_size {
                Ok(id)
            } else {
                Err(BatchError::DataFault { offset, id, vocab_size })
            }
        };

        let mut batch = OneHotBatch::zeros(self.batch_size, self.window, vocab_size, ind);
        for i in 0..self.batch_size {
            batch.set_target(i, checked(i + self.window + ind)?);
            for j in 0..self.window {
                batch.set_input(i, j, checked(j + i + ind)?);
            }
        }

        Ok(Production::Batch(batch))
    }

    /// Offset the next batch will be read from (before any wraparound).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// How many times the cursor has wrapped back to 0.
    pub fn wraparounds(&self) -> usize {
        self.wraparounds
    }

    /// `len / B`, the fixed step count paired with this generator.
    pub fn steps_per_epoch(&self) -> usize {
        self.corpus.len() / self.batch_size
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

/// Never yields `None`.
impl Iterator for BatchGenerator {
    type Item = Result<OneHotBatch, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}
