// ============================================================
// Layer 6 — Checkpoint Artifact
// ============================================================
// One file holds everything needed to resume training or to
// run the model elsewhere.
//
// Layout:
//   [0..8]  magic   b"CHRNN001"
//   [8..]   postcard payload:
//             CheckpointHeader
//               format_version, window, alphabet, epoch,
//               monitor, best, optimizer settings
//             model_config   (JSON text)
//             weights        (Burn record bytes)
//
// The header comes first, so `read_header` can decode it without
// knowing the model type and without touching the weights.
//
// Writes go to `<path>.tmp` and are then renamed over `<path>`.
// The window and the weights are part of the same write, so a
// reader never pairs weights with a window from another save.
//
// Best-only policy (CheckpointWriter):
//   save iff the monitored value is strictly better than every
//   value seen so far (no epsilon).
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::epoch::EpochLogs;
use crate::domain::monitor::Direction;
use crate::domain::optimizer::OptimizerSettings;
use crate::domain::traits::CharModel;

pub const MAGIC:          &[u8; 8] = b"CHRNN001";
pub const FORMAT_VERSION: u32      = 1;

// ─── Errors ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckpointError {
    #[error("'{}' is not a char-rnn checkpoint (bad magic bytes)", path.display())]
    BadMagic { path: PathBuf },

    #[error("checkpoint format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("checkpoint was trained on a {stored}-character vocabulary, \
             the current run uses a different {current}-character one")]
    VocabularyMismatch { stored: usize, current: usize },
}

// ─── Artifact ─────────────────────────────────────────────────────────────────
/// Metadata stored in front of the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointHeader {
    pub format_version: u32,
    /// Window size the weights were trained with
    pub window:         usize,
    /// Ordered vocabulary, one char per index
    pub alphabet:       String,
    /// Epoch (0-based) that produced the weights
    pub epoch:          usize,
    pub monitor:        String,
    /// Monitored value at `epoch`
    pub best:           f64,
    pub optimizer:      OptimizerSettings,
}

impl CheckpointHeader {
    pub fn vocab_size(&self) -> usize {
        self.alphabet.chars().count()
    }

    /// Fail unless `alphabet` is the one these weights were trained on.
    pub fn check_alphabet(&self, alphabet: &str) -> Result<(), CheckpointError> {
        if self.alphabet == alphabet {
            Ok(())
        } else {
            Err(CheckpointError::VocabularyMismatch {
                stored:  self.vocab_size(),
                current: alphabet.chars().count(),
            })
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Artifact {
    header:       CheckpointHeader,
    model_config: String,
    weights:      Vec<u8>,
}

/// A fully decoded checkpoint.
#[derive(Debug, Clone)]
pub struct LoadedCheckpoint<C> {
    pub header:       CheckpointHeader,
    pub model_config: C,
    pub weights:      Vec<u8>,
}

// ─── CheckpointStore ──────────────────────────────────────────────────────────
/// Reads and writes the checkpoint file at one path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write header, config and weights in a single atomic replace.
    pub fn save<C: Serialize>(
        &self,
        header:       CheckpointHeader,
        model_config: &C,
        weights:      Vec<u8>,
    ) -> Result<()> {
        let artifact = Artifact {
            header,
            model_config: serde_json::to_string(model_config)
                .context("Failed to serialise model config")?,
            weights,
        };

        let mut buf = MAGIC.to_vec();
        buf.extend(postcard::to_stdvec(&artifact).context("Failed to encode checkpoint")?);

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create directory '{}'", dir.display()))?;
        }

        let tmp = self.tmp_path();
        let written = write_synced(&tmp, &buf)
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(Into::into));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.context(format!(
                "Cannot write checkpoint '{}'", self.path.display()
            )));
        }

        tracing::debug!("Wrote {} bytes to '{}'", buf.len(), self.path.display());
        Ok(())
    }

    /// Decode only the header.
    pub fn read_header(&self) -> Result<CheckpointHeader> {
        let bytes   = self.read_bytes()?;
        let payload = strip_magic(&bytes, &self.path)?;
        check_version(payload)?;

        let (header, _weights) = postcard::take_from_bytes::<CheckpointHeader>(payload)
            .with_context(|| format!("Checkpoint header in '{}' is corrupt", self.path.display()))?;
        Ok(header)
    }

    /// Decode header, model config and weights.
    pub fn load<C: DeserializeOwned>(&self) -> Result<LoadedCheckpoint<C>> {
        let bytes   = self.read_bytes()?;
        let payload = strip_magic(&bytes, &self.path)?;
        check_version(payload)?;

        let artifact: Artifact = postcard::from_bytes(payload)
            .with_context(|| format!("Checkpoint '{}' is corrupt", self.path.display()))?;
        let model_config = serde_json::from_str(&artifact.model_config)
            .with_context(|| format!("Cannot read model config in '{}'", self.path.display()))?;

        Ok(LoadedCheckpoint {
            header: artifact.header,
            model_config,
            weights: artifact.weights,
        })
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        fs::read(&self.path)
            .with_context(|| format!("Cannot read checkpoint '{}'", self.path.display()))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    f.write_all(bytes)?;
    f.sync_all()?;
    Ok(())
}

/// Window size stored in the checkpoint at `path`.
pub fn read_window_size(path: impl AsRef<Path>) -> Result<usize> {
    Ok(CheckpointStore::new(path.as_ref()).read_header()?.window)
}

fn strip_magic<'a>(bytes: &'a [u8], path: &Path) -> Result<&'a [u8], CheckpointError> {
    match bytes.strip_prefix(&MAGIC[..]) {
        Some(payload) => Ok(payload),
        None => Err(CheckpointError::BadMagic { path: path.to_path_buf() }),
    }
}

/// The version is the header's first field.
fn check_version(payload: &[u8]) -> Result<()> {
    let (found, _) = postcard::take_from_bytes::<u32>(payload)
        .context("Checkpoint header is truncated")?;
    if found != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found, expected: FORMAT_VERSION }.into());
    }
    Ok(())
}

// ─── CheckpointWriter ─────────────────────────────────────────────────────────
/// Best-only end-of-epoch saver.
pub struct CheckpointWriter {
    store:     CheckpointStore,
    window:    usize,
    alphabet:  String,
    monitor:   String,
    direction: Direction,
    best:      f64,
}

impl CheckpointWriter {
    pub fn new(
        store:     CheckpointStore,
        window:    usize,
        alphabet:  String,
        monitor:   impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            store,
            window,
            alphabet,
            monitor: monitor.into(),
            best: direction.initial_best(),
            direction,
        }
    }

    /// Start from a previously saved best instead of ±∞.
    pub fn with_best(mut self, best: f64) -> Self {
        self.best = best;
        self
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Save `model` if the monitored metric beat every earlier epoch.
    /// Returns whether a checkpoint was written.
    pub fn on_epoch_end<M: CharModel>(
        &mut self,
        epoch: usize,
        logs:  &EpochLogs,
        model: &M,
    ) -> Result<bool> {
        let current = logs.get(&self.monitor).with_context(|| {
            format!("Checkpoint monitors '{}' but epoch {} did not log it", self.monitor, epoch)
        })?;

        if !self.direction.improved(current, self.best, 0.0) {
            tracing::debug!(
                "Epoch {}: {} did not improve from {:.5}",
                epoch + 1, self.monitor, self.best
            );
            return Ok(false);
        }

        let header = CheckpointHeader {
            format_version: FORMAT_VERSION,
            window:         self.window,
            alphabet:       self.alphabet.clone(),
            epoch,
            monitor:        self.monitor.clone(),
            best:           current,
            optimizer:      model.optimizer_settings(),
        };
        self.store.save(header, &model.config(), model.export_weights()?)?;

        tracing::info!(
            "Epoch {}: {} improved from {:.5} to {:.5}, saved '{}'",
            epoch + 1, self.monitor, self.best, current, self.store.path().display()
        );
        self.best = current;
        Ok(true)
    }
}
