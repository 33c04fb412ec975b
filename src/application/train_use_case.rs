// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration          (fail fast)
//   Step 2: Load and clean .txt files            (Layer 4 - data)
//   Step 3: Recover window / vocabulary on resume (Layer 6 - infra)
//   Step 4: Encode the corpus                    (Layer 4 - data)
//   Step 5: Split train/validation               (Layer 4 - data)
//   Step 6: Build one generator per split        (Layer 4 - data)
//   Step 7: Scheduler, checkpoint, CSV callbacks (Layer 5/6)
//   Step 8: Run training loop                    (Layer 5 - ml)
//
// Steps 1–7 live in `prepare` so they can be tested without a GPU.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::BatchGenerator,
    encoder::{CorpusEncoder, OovPolicy},
    loader::TextLoader,
    prefetch::BatchSource,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::epoch::MONITORABLE;
use crate::domain::monitor::Mode;
use crate::domain::optimizer::{OptimizerKind, OptimizerSettings};
use crate::domain::traits::{DocumentSource, EpochCallback};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::{CheckpointStore, CheckpointWriter},
    metrics::{csv_path_for, MetricsLogger},
};
use crate::ml::model::CharRnnConfig;
use crate::ml::scheduler::{LrScheduler, SchedulerConfig};
use crate::ml::trainer::{run_training, EpochHooks, EpochPlan, FitSummary, ModelSetup};

pub const DEFAULT_WINDOW: usize = 40;

// ─── Errors ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one dataset path is required")]
    NoDatasets,

    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },

    #[error("{name} must be in {range} (got {value})")]
    OutOfRange { name: &'static str, range: &'static str, value: f64 },

    #[error("unknown monitor '{0}' (expected one of loss, acc, val_loss, val_acc)")]
    UnknownMonitor(String),

    #[error("monitor '{0}' needs a validation split (--split > 0)")]
    MonitorNeedsValidation(String),
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All options for a training run.
// Serialisable so a run's settings can be dumped alongside its logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub datasets:   Vec<String>,
    pub model:      String,
    pub resume:     bool,
    pub batch_size: usize,
    /// None → checkpoint's window on resume, DEFAULT_WINDOW otherwise
    pub window:     Option<usize>,
    pub epochs:     usize,
    pub layers:     usize,
    pub hidden:     usize,
    pub dropout:    f64,
    /// None → adam, or the checkpoint's optimiser on resume
    pub optimizer:  Option<OptimizerKind>,
    /// None → the optimiser's default rate, or the checkpoint's on resume
    pub lr:         Option<f64>,
    pub clip:       Option<f64>,
    pub monitor:    String,
    pub mode:       Mode,
    pub decay:      f64,
    pub min_lr:     f64,
    pub decay_freq: Option<usize>,
    pub epsilon:    f64,
    pub cooldown:   usize,
    pub val_split:  f64,
    /// Batches buffered per split; 0 produces on the training thread
    pub prefetch:   usize,
    pub oov:        OovPolicy,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            datasets:   Vec::new(),
            model:      "model.ckpt".to_string(),
            resume:     false,
            batch_size: 32,
            window:     None,
            epochs:     50,
            layers:     3,
            hidden:     128,
            dropout:    0.2,
            optimizer:  None,
            lr:         None,
            clip:       Some(4.0),
            monitor:    "val_loss".to_string(),
            mode:       Mode::Auto,
            decay:      0.5,
            min_lr:     0.0,
            decay_freq: None,
            epsilon:    1e-4,
            cooldown:   0,
            val_split:  0.2,
            prefetch:   4,
            oov:        OovPolicy::Reject,
        }
    }
}

impl TrainConfig {
    /// Reject invalid options before any file is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &'static str, value: usize) -> Result<(), ConfigError> {
            if value == 0 { Err(ConfigError::NotPositive { name }) } else { Ok(()) }
        }
        fn within(name: &'static str, range: &'static str, value: f64, ok: bool) -> Result<(), ConfigError> {
            if ok { Ok(()) } else { Err(ConfigError::OutOfRange { name, range, value }) }
        }

        if self.datasets.is_empty() {
            return Err(ConfigError::NoDatasets);
        }
        positive("batch", self.batch_size)?;
        positive("window", self.window.unwrap_or(DEFAULT_WINDOW))?;
        positive("epochs", self.epochs)?;
        positive("layers", self.layers)?;
        positive("hidden", self.hidden)?;

        within("dropout", "[0, 1)", self.dropout, (0.0..1.0).contains(&self.dropout))?;
        within("split", "[0, 1)", self.val_split, (0.0..1.0).contains(&self.val_split))?;
        within("decay", "(0, 1)", self.decay, self.decay > 0.0 && self.decay < 1.0)?;
        within("min_lr", "[0, ∞)", self.min_lr, self.min_lr >= 0.0)?;
        within("epsilon", "[0, ∞)", self.epsilon, self.epsilon >= 0.0)?;
        if let Some(lr) = self.lr {
            within("lr", "(0, ∞)", lr, lr > 0.0)?;
        }
        if let Some(clip) = self.clip {
            within("clip", "(0, ∞)", clip, clip > 0.0)?;
        }

        if !MONITORABLE.contains(&self.monitor.as_str()) {
            return Err(ConfigError::UnknownMonitor(self.monitor.clone()));
        }
        if self.monitor.starts_with("val_") && self.val_split == 0.0 {
            return Err(ConfigError::MonitorNeedsValidation(self.monitor.clone()));
        }
        Ok(())
    }
}

// ─── Prepared Run ─────────────────────────────────────────────────────────────
/// Everything the training loop needs, built but not yet started.
pub struct PreparedRun {
    pub setup:  ModelSetup,
    pub plan:   EpochPlan,
    pub train:  BatchSource,
    pub val:    Option<BatchSource>,
    pub hooks:  EpochHooks,
    pub window: usize,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<FitSummary> {
        let PreparedRun { setup, plan, mut train, mut val, mut hooks, .. } = self.prepare()?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        let summary = run_training(setup, plan, &mut train, val.as_mut(), &mut hooks)?;
        tracing::info!(
            "{} epochs, {} checkpoints, best {} = {:.5}",
            summary.epochs_run, summary.checkpoints, self.config.monitor, summary.best
        );
        Ok(summary)
    }

    /// Steps 1–7: validate, load, encode, split and wire the callbacks.
    pub fn prepare(&self) -> Result<PreparedRun> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load + clean ──────────────────────────────────────────────
        tracing::info!("Loading text from {:?}", cfg.datasets);
        let docs = TextLoader::new(&cfg.datasets).load_all()?;
        let preprocessor = Preprocessor::new();
        let text = docs
            .iter()
            .map(|d| preprocessor.clean(&d.text))
            .collect::<Vec<_>>()
            .join("\n");
        tracing::info!("Loaded {} documents, {} characters", docs.len(), text.chars().count());

        let vocab = match cfg.oov {
            OovPolicy::Reject  => Vocabulary::ascii(),
            OovPolicy::Unknown => Vocabulary::ascii().with_unknown(),
        };

        // ── Step 3: Resume metadata ───────────────────────────────────────────
        let store  = CheckpointStore::new(&cfg.model);
        if cfg.resume && !store.exists() {
            tracing::warn!("No checkpoint at '{}'; starting a fresh run", cfg.model);
        }
        let header = if cfg.resume && store.exists() {
            let header = store
                .read_header()
                .with_context(|| format!("Cannot resume from '{}'", cfg.model))?;
            header.check_alphabet(&vocab.alphabet())?;
            Some(header)
        } else {
            None
        };

        let window = match (&header, cfg.window) {
            (Some(h), Some(requested)) if requested != h.window => {
                tracing::warn!(
                    "Requested window {} conflicts with checkpoint window {}; using {}",
                    requested, h.window, h.window
                );
                h.window
            }
            (Some(h), _) => {
                tracing::info!("Window size {} recovered from '{}'", h.window, cfg.model);
                h.window
            }
            (None, requested) => requested.unwrap_or(DEFAULT_WINDOW),
        };

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let corpus = CorpusEncoder::new(&vocab, cfg.oov)?
            .encode(&text)
            .context("Corpus contains characters outside the vocabulary (see --oov)")?;

        // ── Step 5: Split ─────────────────────────────────────────────────────
        let (train_ids, val_ids) = split_train_val(&corpus, cfg.batch_size, cfg.val_split);
        tracing::info!(
            "Split: {} train, {} validation characters (vocabulary {})",
            train_ids.len(), val_ids.len(), vocab.len()
        );

        // ── Step 6: Generators ────────────────────────────────────────────────
        let train_gen = BatchGenerator::new(train_ids, cfg.batch_size, window)
            .context("Training split is too short for one batch")?;
        let train_steps = train_gen.steps_per_epoch();
        let train = BatchSource::new("train", train_gen, cfg.prefetch)?;

        let (val, val_steps) = if cfg.val_split > 0.0 {
            let val_gen = BatchGenerator::new(val_ids, cfg.batch_size, window)
                .context("Validation split is too short for one batch; raise --split or lower --batch/--window")?;
            let steps = val_gen.steps_per_epoch();
            (Some(BatchSource::new("val", val_gen, cfg.prefetch)?), steps)
        } else {
            (None, 0)
        };
        tracing::info!("{} training / {} validation steps per epoch", train_steps, val_steps);

        // ── Step 7: Callbacks ─────────────────────────────────────────────────
        let scheduler = LrScheduler::new(SchedulerConfig {
            monitor:   cfg.monitor.clone(),
            mode:      cfg.mode,
            factor:    cfg.decay,
            min_lr:    cfg.min_lr,
            frequency: cfg.decay_freq,
            epsilon:   cfg.epsilon,
            cooldown:  cfg.cooldown,
        });

        let mut checkpoint = CheckpointWriter::new(
            store.clone(),
            window,
            vocab.alphabet(),
            cfg.monitor.clone(),
            scheduler.direction(),
        );
        if let Some(h) = header.as_ref().filter(|h| h.monitor == cfg.monitor) {
            tracing::info!("Checkpoint best {} = {:.5} carried over", h.monitor, h.best);
            checkpoint = checkpoint.with_best(h.best);
        }

        let metrics = MetricsLogger::new(csv_path_for(store.path()), header.is_some())?;
        tracing::info!("Epoch metrics → '{}'", metrics.csv_path().display());
        let metrics: Box<dyn EpochCallback> = Box::new(metrics);

        let hooks = EpochHooks { scheduler, checkpoint, sinks: vec![metrics] };

        let kind = match (&header, cfg.optimizer) {
            (Some(h), Some(requested)) if requested != h.optimizer.kind => {
                tracing::warn!(
                    "Requested optimiser '{}' conflicts with checkpoint optimiser '{}'; using '{}'",
                    requested, h.optimizer.kind, h.optimizer.kind
                );
                h.optimizer.kind
            }
            (Some(h), _) => h.optimizer.kind,
            (None, requested) => requested.unwrap_or_default(),
        };
        let mut optimizer = OptimizerSettings::with_defaults(kind, cfg.clip);
        if let Some(lr) = cfg.lr {
            optimizer.learning_rate = lr;
        }

        let setup = ModelSetup {
            model_config: CharRnnConfig::new(vocab.len(), cfg.hidden, cfg.layers)
                .with_dropout(cfg.dropout),
            optimizer,
            resume_from: header.is_some().then(|| store.clone()),
            lr_override: cfg.lr,
        };

        let plan = EpochPlan {
            start_epoch: header.as_ref().map_or(0, |h| h.epoch + 1),
            epochs:      cfg.epochs,
            train_steps,
            val_steps,
        };

        Ok(PreparedRun { setup, plan, train, val, hooks, window })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::checkpoint::{CheckpointError, CheckpointHeader, FORMAT_VERSION};
    use std::{fs, path::{Path, PathBuf}};

    fn workspace(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("char_rnn_train_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        // 2_000 characters of plain ASCII
        let line = "The quick brown fox jumps over the lazy dog. 0123456789\n";
        fs::write(dir.join("corpus.txt"), line.repeat(2_000 / line.len() + 1)).unwrap();
        dir
    }

    fn config(dir: &Path) -> TrainConfig {
        TrainConfig {
            datasets:   vec![dir.join("corpus.txt").display().to_string()],
            model:      dir.join("model.ckpt").display().to_string(),
            batch_size: 16,
            window:     Some(10),
            prefetch:   0,
            ..TrainConfig::default()
        }
    }

    fn saved_header(window: usize, monitor: &str) -> CheckpointHeader {
        CheckpointHeader {
            format_version: FORMAT_VERSION,
            window,
            alphabet:  Vocabulary::ascii().alphabet(),
            epoch:     6,
            monitor:   monitor.to_string(),
            best:      1.75,
            optimizer: OptimizerSettings {
                kind:          OptimizerKind::Adam,
                learning_rate: 2.5e-4,
                clip_value:    Some(4.0),
            },
        }
    }

    #[test]
    fn test_default_config_is_valid_once_datasets_given() {
        let cfg = TrainConfig { datasets: vec!["x.txt".to_string()], ..TrainConfig::default() };
        assert!(cfg.validate().is_ok());
        assert_eq!(TrainConfig::default().validate(), Err(ConfigError::NoDatasets));
    }

    #[test]
    fn test_invalid_counts_rejected() {
        let base = TrainConfig { datasets: vec!["x.txt".to_string()], ..TrainConfig::default() };

        let cfg = TrainConfig { batch_size: 0, ..base.clone() };
        assert_eq!(cfg.validate(), Err(ConfigError::NotPositive { name: "batch" }));

        let cfg = TrainConfig { window: Some(0), ..base.clone() };
        assert_eq!(cfg.validate(), Err(ConfigError::NotPositive { name: "window" }));

        let cfg = TrainConfig { layers: 0, ..base.clone() };
        assert_eq!(cfg.validate(), Err(ConfigError::NotPositive { name: "layers" }));

        let cfg = TrainConfig { decay: 1.0, ..base };
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { name: "decay", .. })));
    }

    #[test]
    fn test_monitor_rules() {
        let base = TrainConfig { datasets: vec!["x.txt".to_string()], ..TrainConfig::default() };

        let cfg = TrainConfig { monitor: "perplexity".to_string(), ..base.clone() };
        assert_eq!(cfg.validate(), Err(ConfigError::UnknownMonitor("perplexity".to_string())));

        let cfg = TrainConfig { val_split: 0.0, ..base.clone() };
        assert_eq!(cfg.validate(), Err(ConfigError::MonitorNeedsValidation("val_loss".to_string())));

        let cfg = TrainConfig { val_split: 0.0, monitor: "loss".to_string(), ..base };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_prepare_fresh_run() {
        let dir  = workspace("fresh");
        let run  = TrainUseCase::new(config(&dir)).prepare().unwrap();

        assert_eq!(run.window, 10);
        assert_eq!(run.plan.start_epoch, 0);
        assert!(run.setup.resume_from.is_none());
        assert_eq!(run.setup.optimizer, OptimizerSettings::with_defaults(OptimizerKind::Adam, Some(4.0)));
        assert_eq!(run.setup.model_config.vocab_size, 100);
        assert!(run.val.is_some());
        // Train split is a whole number of batches
        assert!(run.plan.train_steps > 0 && run.plan.val_steps > 0);
        assert!(run.hooks.checkpoint.best().is_infinite());
    }

    #[test]
    fn test_prepare_resume_recovers_window_and_best() {
        let dir = workspace("resume");
        let cfg = TrainConfig { resume: true, window: None, ..config(&dir) };
        CheckpointStore::new(&cfg.model)
            .save(saved_header(24, "val_loss"), &CharRnnConfig::new(100, 8, 1), Vec::new())
            .unwrap();

        let run = TrainUseCase::new(cfg).prepare().unwrap();

        assert_eq!(run.window, 24);
        assert_eq!(run.plan.start_epoch, 7);
        assert!(run.setup.resume_from.is_some());
        assert_eq!(run.setup.lr_override, None);
        assert_eq!(run.hooks.checkpoint.best(), 1.75);
    }

    #[test]
    fn test_checkpoint_window_wins_over_request() {
        let dir = workspace("conflict");
        let cfg = TrainConfig { resume: true, window: Some(12), ..config(&dir) };
        CheckpointStore::new(&cfg.model)
            .save(saved_header(24, "loss"), &CharRnnConfig::new(100, 8, 1), Vec::new())
            .unwrap();

        let run = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(run.window, 24);
        // Different monitor: best is not carried over
        assert!(run.hooks.checkpoint.best().is_infinite());
    }

    #[test]
    fn test_resume_with_other_vocabulary_fails() {
        let dir = workspace("vocab");
        let cfg = TrainConfig { resume: true, oov: OovPolicy::Unknown, ..config(&dir) };
        CheckpointStore::new(&cfg.model)
            .save(saved_header(24, "val_loss"), &CharRnnConfig::new(100, 8, 1), Vec::new())
            .unwrap();

        let err = TrainUseCase::new(cfg).prepare().err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CheckpointError>(),
            Some(CheckpointError::VocabularyMismatch { stored: 100, current: 101 })
        ));
    }

    #[test]
    fn test_resume_without_checkpoint_starts_fresh() {
        let dir = workspace("missing");
        let cfg = TrainConfig { resume: true, ..config(&dir) };
        let run = TrainUseCase::new(cfg).prepare().unwrap();

        assert!(run.setup.resume_from.is_none());
        assert_eq!(run.plan.start_epoch, 0);
        assert_eq!(run.window, 10);
        assert!(run.hooks.checkpoint.best().is_infinite());
    }

    #[test]
    fn test_optimiser_default_learning_rate() {
        let dir = workspace("sgd");
        let cfg = TrainConfig { optimizer: Some(OptimizerKind::Sgd), ..config(&dir) };
        let run = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(run.setup.optimizer.kind, OptimizerKind::Sgd);
        assert_eq!(run.setup.optimizer.learning_rate, 0.01);

        let cfg = TrainConfig { optimizer: Some(OptimizerKind::RmsProp), lr: Some(0.02), ..config(&dir) };
        let run = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(run.setup.optimizer.learning_rate, 0.02);
    }

    #[test]
    fn test_resume_keeps_checkpoint_optimiser() {
        let dir = workspace("resume_sgd");
        let cfg = TrainConfig { resume: true, optimizer: Some(OptimizerKind::Adam), ..config(&dir) };
        let mut header = saved_header(10, "val_loss");
        header.optimizer = OptimizerSettings::with_defaults(OptimizerKind::Sgd, Some(4.0));
        CheckpointStore::new(&cfg.model)
            .save(header, &CharRnnConfig::new(100, 8, 1), Vec::new())
            .unwrap();

        let run = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(run.setup.optimizer.kind, OptimizerKind::Sgd);
    }

    #[test]
    fn test_out_of_vocabulary_corpus_rejected() {
        let dir = workspace("oov");
        fs::write(dir.join("corpus.txt"), "naïve ".repeat(400)).unwrap();
        assert!(TrainUseCase::new(config(&dir)).prepare().is_err());
    }
}
