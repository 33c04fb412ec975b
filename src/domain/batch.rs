// ============================================================
// Layer 3 — One-Hot Batch
// ============================================================
// B overlapping windows of W characters plus the character
// that follows each window, stored as dense one-hot buffers.
//
// Memory layout (row-major, matches a [B, W, V] tensor):
//   inputs [i * W * V + j * V + k] == 1.0  ⇔  window i, step j is char k
//   targets[i * V + k]             == 1.0  ⇔  window i is followed by char k
//
// Reference: Rust Book §8 (Vectors)

/// A dense one-hot batch ready to be turned into framework tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotBatch {
    pub batch_size: usize,
    pub window:     usize,
    pub vocab_size: usize,

    /// Shape: [batch_size, window, vocab_size]
    pub inputs: Vec<f32>,

    /// Shape: [batch_size, vocab_size]
    pub targets: Vec<f32>,

    /// Index of the hot target per row — shape: [batch_size]
    pub target_ids: Vec<usize>,

    /// Corpus offset of the first window in this batch
    pub offset: usize,
}

impl OneHotBatch {
    /// An all-zero batch of the given shape.
    pub fn zeros(batch_size: usize, window: usize, vocab_size: usize, offset: usize) -> Self {
        Self {
            batch_size,
            window,
            vocab_size,
            inputs:     vec![0.0; batch_size * window * vocab_size],
            targets:    vec![0.0; batch_size * vocab_size],
            target_ids: vec![0; batch_size],
            offset,
        }
    }

    /// Mark `[row, step]` as character `id`.
    pub fn set_input(&mut self, row: usize, step: usize, id: usize) {
        let base = (row * self.window + step) * self.vocab_size;
        self.inputs[base + id] = 1.0;
    }

    /// Mark the target of `row` as character `id`.
    pub fn set_target(&mut self, row: usize, id: usize) {
        self.targets[row * self.vocab_size + id] = 1.0;
        self.target_ids[row] = id;
    }

    /// The hot index at `[row, step]`, if any.
    pub fn input_id(&self, row: usize, step: usize) -> Option<usize> {
        let base = (row * self.window + step) * self.vocab_size;
        self.inputs[base..base + self.vocab_size]
            .iter()
            .position(|&v| v == 1.0)
    }

    pub fn target_id(&self, row: usize) -> usize {
        self.target_ids[row]
    }

    pub fn input_shape(&self) -> [usize; 3] {
        [self.batch_size, self.window, self.vocab_size]
    }
}
