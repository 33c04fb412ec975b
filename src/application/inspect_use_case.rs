// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Reads a checkpoint's header without building the model, the
// way an external inference tool would recover the window size
// and vocabulary before loading any weights.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::{CheckpointHeader, CheckpointStore};

/// What `inspect` reports about one checkpoint file.
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointSummary {
    pub path:         String,
    pub file_bytes:   u64,
    pub vocab_size:   usize,
    /// Whether out-of-vocabulary characters map to a reserved slot
    pub unknown_slot: bool,
    #[serde(flatten)]
    pub header:       CheckpointHeader,
}

impl CheckpointSummary {
    /// Human-readable multi-line report.
    pub fn render(&self) -> String {
        let h = &self.header;
        let clip = h
            .optimizer
            .clip_value
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());

        format!(
            "Checkpoint : {}\n\
             Format     : v{} ({} bytes)\n\
             Window     : {}\n\
             Vocabulary : {} characters{}\n\
             Epoch      : {}\n\
             Best       : {} = {:.5}\n\
             Optimiser  : {} (lr={:.3e}, clip={})",
            self.path,
            h.format_version, self.file_bytes,
            h.window,
            self.vocab_size,
            if self.unknown_slot { " (with unknown slot)" } else { "" },
            h.epoch + 1,
            h.monitor, h.best,
            h.optimizer.kind, h.optimizer.learning_rate, clip,
        )
    }
}

pub struct InspectUseCase {
    store: CheckpointStore,
}

impl InspectUseCase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { store: CheckpointStore::new(path) }
    }

    pub fn summary(&self) -> Result<CheckpointSummary> {
        let header = self.store.read_header()?;
        let file_bytes = std::fs::metadata(self.store.path())
            .with_context(|| format!("Cannot stat '{}'", self.store.path().display()))?
            .len();

        let vocab = Vocabulary::from_alphabet(&header.alphabet);

        Ok(CheckpointSummary {
            path: self.store.path().display().to_string(),
            file_bytes,
            vocab_size:   vocab.len(),
            unknown_slot: vocab.unknown_index().is_some(),
            header,
        })
    }

    /// Summary as text, or as pretty JSON when `json` is set.
    pub fn report(&self, json: bool) -> Result<String> {
        let summary = self.summary()?;
        if json {
            Ok(serde_json::to_string_pretty(&summary)?)
        } else {
            Ok(summary.render())
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimizer::{OptimizerKind, OptimizerSettings};
    use crate::infra::checkpoint::FORMAT_VERSION;

    fn saved(name: &str) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("char_rnn_inspect_{}_{}", name, std::process::id()))
            .join("m.ckpt");
        let header = CheckpointHeader {
            format_version: FORMAT_VERSION,
            window:    40,
            alphabet:  "\nabc".to_string(),
            epoch:     2,
            monitor:   "val_loss".to_string(),
            best:      1.2345,
            optimizer: OptimizerSettings {
                kind:          OptimizerKind::Adam,
                learning_rate: 0.001,
                clip_value:    Some(4.0),
            },
        };
        CheckpointStore::new(&path).save(header, &"cfg", vec![0u8; 64]).unwrap();
        path
    }

    #[test]
    fn test_text_report() {
        let report = InspectUseCase::new(saved("text")).report(false).unwrap();
        assert!(report.contains("Window     : 40"));
        assert!(report.contains("Vocabulary : 4 characters"));
        assert!(report.contains("Epoch      : 3"));
        assert!(report.contains("val_loss = 1.23450"));
    }

    #[test]
    fn test_json_report() {
        let report = InspectUseCase::new(saved("json")).report(true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["window"], 40);
        assert_eq!(value["vocab_size"], 4);
        assert_eq!(value["optimizer"]["kind"], "adam");
        assert_eq!(value["unknown_slot"], false);
    }

    #[test]
    fn test_reports_unknown_slot() {
        let path = saved("unknown");
        let store = CheckpointStore::new(&path);
        let mut header = store.read_header().unwrap();
        header.alphabet = Vocabulary::ascii().with_unknown().alphabet();
        store.save(header, &"cfg", Vec::new()).unwrap();

        let summary = InspectUseCase::new(&path).summary().unwrap();
        assert!(summary.unknown_slot);
        assert_eq!(summary.vocab_size, 101);
        assert!(summary.render().contains("101 characters (with unknown slot)"));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("char_rnn_inspect_does_not_exist.ckpt");
        assert!(InspectUseCase::new(path).summary().is_err());
    }
}
