// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Splits the encoded corpus into a training prefix and a
// validation suffix. Text order matters for a sequence model,
// so nothing is shuffled.
//
// The split point is the training share of the corpus rounded
// down to a multiple of the batch size:
//
//   split_at = floor(floor(len * (1 - val_fraction)) / batch) * batch
//
// e.g. len = 10_000, batch = 32, val_fraction = 0.2
//   10_000 * 0.8 = 8_000 → 8_000 / 32 = 250 batches
//   split_at = 250 * 32 = 8_000 → train 8_000, validation 2_000

use crate::data::encoder::EncodedCorpus;

/// Index where the validation suffix starts.
pub fn split_point(len: usize, batch_size: usize, val_fraction: f64) -> usize {
    if batch_size == 0 {
        return len;
    }
    let train_len = ((len as f64) * (1.0 - val_fraction)).floor() as usize;
    (train_len.min(len) / batch_size) * batch_size
}

/// Split `corpus` into (train, validation).
pub fn split_train_val(
    corpus:       &EncodedCorpus,
    batch_size:   usize,
    val_fraction: f64,
) -> (EncodedCorpus, EncodedCorpus) {
    let at = split_point(corpus.len(), batch_size, val_fraction);
    let (train, val) = corpus.split_at(at);

    tracing::debug!(
        "Corpus split at {}: {} training, {} validation characters",
        at,
        train.len(),
        val.len(),
    );

    (train, val)
}
