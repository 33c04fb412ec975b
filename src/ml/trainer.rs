// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives a CharModel through fixed-length epochs over infinite
// batch sources.
//
// Per epoch:
//   1. `train_steps` optimisation steps on the training source
//   2. `val_steps` evaluation steps on the validation source
//   3. logs = { loss, acc, val_loss, val_acc, lr }
//   4. callbacks, always in this order:
//        LrScheduler      (the only writer of the learning rate)
//        CheckpointWriter (sees the already-updated learning rate)
//        passive sinks    (CSV metrics, ...)
//
// The sources never run dry (see batcher.rs), so the step counts
// alone decide where an epoch ends.
//
// Key Burn insight:
//   - Training uses Autodiff<Wgpu> for gradients
//   - Evaluation uses model.valid() (no autodiff, no dropout)
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{Context, Result};
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    tensor::backend::AutodiffBackend,
};

use crate::data::prefetch::BatchSource;
use crate::domain::epoch::{EpochLogs, RunningStats, ACC, LOSS, LR, VAL_ACC, VAL_LOSS};
use crate::domain::optimizer::OptimizerSettings;
use crate::domain::traits::{CharModel, EpochCallback};
use crate::infra::checkpoint::{CheckpointStore, CheckpointWriter, LoadedCheckpoint};
use crate::ml::learner::LstmLearner;
use crate::ml::model::CharRnnConfig;
use crate::ml::scheduler::{LrDecision, LrScheduler};

type MyBackend = Autodiff<Wgpu>;

/// Which epochs to run and how long each one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochPlan {
    /// Index of the first epoch (non-zero when resuming)
    pub start_epoch: usize,
    /// Number of epochs to run
    pub epochs:      usize,
    pub train_steps: usize,
    /// 0 skips validation
    pub val_steps:   usize,
}

/// End-of-epoch observers, invoked in field order.
pub struct EpochHooks {
    pub scheduler:  LrScheduler,
    pub checkpoint: CheckpointWriter,
    pub sinks:      Vec<Box<dyn EpochCallback>>,
}

/// Outcome of a finished `fit`.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub epochs_run:  usize,
    pub checkpoints: usize,
    /// Best monitored value seen by the checkpoint writer
    pub best:        f64,
    pub final_lr:    f64,
}

/// The model side of a run: what to build, or what to resume.
pub struct ModelSetup {
    pub model_config: CharRnnConfig,
    pub optimizer:    OptimizerSettings,
    /// Checkpoint to continue from instead of random initialisation.
    /// Its optimiser family and clip value replace `optimizer`'s.
    pub resume_from:  Option<CheckpointStore>,
    /// Replaces the checkpoint's learning rate when resuming
    pub lr_override:  Option<f64>,
}

/// Train on the default WGPU device.
pub fn run_training(
    setup: ModelSetup,
    plan:  EpochPlan,
    train: &mut BatchSource,
    val:   Option<&mut BatchSource>,
    hooks: &mut EpochHooks,
) -> Result<FitSummary> {
    let device = WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_on::<MyBackend>(setup, plan, train, val, hooks, &device)
}

/// Build (or restore) the LSTM learner on backend `B` and fit it.
pub fn train_on<B: AutodiffBackend>(
    setup:  ModelSetup,
    plan:   EpochPlan,
    train:  &mut BatchSource,
    val:    Option<&mut BatchSource>,
    hooks:  &mut EpochHooks,
    device: &B::Device,
) -> Result<FitSummary> {
    match setup.resume_from {
        None => {
            let mut learner = LstmLearner::<B>::new(setup.model_config, &setup.optimizer, device);
            fit(&mut learner, plan, train, val, hooks)
        }
        Some(store) => {
            let ckpt: LoadedCheckpoint<CharRnnConfig> = store.load()?;

            if ckpt.model_config.vocab_size != setup.model_config.vocab_size {
                anyhow::bail!(
                    "checkpoint '{}' expects {} characters, corpus vocabulary has {}",
                    store.path().display(),
                    ckpt.model_config.vocab_size,
                    setup.model_config.vocab_size
                );
            }
            if ckpt.model_config.num_layers != setup.model_config.num_layers
                || ckpt.model_config.hidden_size != setup.model_config.hidden_size
            {
                tracing::warn!(
                    "Resuming with the checkpoint's architecture ({} layers, hidden={}) \
                     instead of the requested one ({} layers, hidden={})",
                    ckpt.model_config.num_layers, ckpt.model_config.hidden_size,
                    setup.model_config.num_layers, setup.model_config.hidden_size,
                );
            }

            let mut optimizer = ckpt.header.optimizer.clone();
            match setup.lr_override {
                Some(lr) => {
                    tracing::info!(
                        "Learning rate overridden: {:.3e} (checkpoint had {:.3e})",
                        lr, optimizer.learning_rate
                    );
                    optimizer.learning_rate = lr;
                }
                None => tracing::info!(
                    "Learning rate restored from checkpoint: {:.3e}",
                    optimizer.learning_rate
                ),
            }

            if optimizer.kind != setup.optimizer.kind {
                tracing::warn!(
                    "Resuming with the checkpoint's optimiser '{}' instead of '{}'",
                    optimizer.kind, setup.optimizer.kind
                );
            }

            let mut learner = LstmLearner::<B>::new(ckpt.model_config, &optimizer, device);
            learner
                .import_weights(ckpt.weights)
                .with_context(|| format!("Cannot restore weights from '{}'", store.path().display()))?;
            tracing::info!("Resumed from epoch {} of '{}'", ckpt.header.epoch + 1, store.path().display());

            fit(&mut learner, plan, train, val, hooks)
        }
    }
}

/// The epoch loop, independent of the model implementation.
pub fn fit<M: CharModel>(
    model:   &mut M,
    plan:    EpochPlan,
    train:   &mut BatchSource,
    mut val: Option<&mut BatchSource>,
    hooks:   &mut EpochHooks,
) -> Result<FitSummary> {
    let last_epoch  = plan.start_epoch + plan.epochs;
    let mut summary = FitSummary {
        epochs_run:  0,
        checkpoints: 0,
        best:        hooks.checkpoint.best(),
        final_lr:    model.learning_rate(),
    };

    for epoch in plan.start_epoch..last_epoch {
        let lr = model.learning_rate();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_stats = RunningStats::default();
        for _ in 0..plan.train_steps {
            let batch = train.next_batch().context("Training batch failed")?;
            train_stats.push(model.train_step(&batch)?);
        }

        let mut logs = EpochLogs::new()
            .with(LOSS, train_stats.mean_loss())
            .with(ACC, train_stats.accuracy())
            .with(LR, lr);

        // ── Validation phase ──────────────────────────────────────────────────
        if let Some(val) = val.as_deref_mut().filter(|_| plan.val_steps > 0) {
            let mut val_stats = RunningStats::default();
            for _ in 0..plan.val_steps {
                let batch = val.next_batch().context("Validation batch failed")?;
                val_stats.push(model.eval_step(&batch)?);
            }
            logs.insert(VAL_LOSS, val_stats.mean_loss());
            logs.insert(VAL_ACC, val_stats.accuracy());
        }

        // ── Callbacks ─────────────────────────────────────────────────────────
        let decision = hooks.scheduler.on_epoch_end(epoch, &logs, model)?;
        if hooks.checkpoint.on_epoch_end(epoch, &logs, model)? {
            summary.checkpoints += 1;
        }
        for sink in hooks.sinks.iter_mut() {
            sink.on_epoch_end(epoch, &logs)?;
        }

        println!("{}", epoch_line(epoch, last_epoch, &logs, decision));

        summary.epochs_run += 1;
    }

    summary.best     = hooks.checkpoint.best();
    summary.final_lr = model.learning_rate();
    tracing::info!("Training complete!");
    Ok(summary)
}

fn epoch_line(epoch: usize, last_epoch: usize, logs: &EpochLogs, decision: LrDecision) -> String {
    let mut line = format!("Epoch {:>3}/{}", epoch + 1, last_epoch);
    for (name, value) in logs.iter() {
        line.push_str(&format!(" | {name}={value:.4}"));
    }
    if let LrDecision::Reduced { to, .. } = decision {
        line.push_str(&format!(" | lr → {to:.3e}"));
    }
    line
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    use crate::data::batcher::BatchGenerator;
    use crate::data::encoder::EncodedCorpus;
    use crate::domain::batch::OneHotBatch;
    use crate::domain::epoch::StepStats;
    use crate::domain::monitor::{Direction, Mode};
    use crate::domain::optimizer::OptimizerKind;
    use crate::domain::traits::LearningRate;
    use crate::ml::scheduler::SchedulerConfig;

    /// Validation loss drops by `delta` after every training step.
    struct FakeModel {
        lr:    f64,
        level: f64,
        delta: f64,
        seen:  Vec<usize>,
    }

    impl FakeModel {
        fn new(delta: f64) -> Self {
            Self { lr: 0.1, level: 10.0, delta, seen: Vec::new() }
        }
    }

    impl LearningRate for FakeModel {
        fn learning_rate(&self) -> f64 { self.lr }
        fn set_learning_rate(&mut self, lr: f64) { self.lr = lr; }
    }

    impl CharModel for FakeModel {
        type Config = u32;

        fn config(&self) -> u32 { 1 }
        fn optimizer_settings(&self) -> OptimizerSettings {
            OptimizerSettings { kind: OptimizerKind::Adam, learning_rate: self.lr, clip_value: None }
        }
        fn train_step(&mut self, batch: &OneHotBatch) -> Result<StepStats> {
            self.seen.push(batch.offset);
            self.level -= self.delta;
            Ok(StepStats::new(self.level, 1, batch.batch_size))
        }
        fn eval_step(&self, batch: &OneHotBatch) -> Result<StepStats> {
            Ok(StepStats::new(self.level, 0, batch.batch_size))
        }
        fn predict(&self, _: &OneHotBatch) -> Result<Vec<f32>> { Ok(Vec::new()) }
        fn export_weights(&self) -> Result<Vec<u8>> { Ok(self.level.to_le_bytes().to_vec()) }
        fn import_weights(&mut self, _: Vec<u8>) -> Result<()> { Ok(()) }
    }

    /// Collects every row it is handed.
    struct Recorder(Rc<RefCell<Vec<(usize, EpochLogs)>>>);

    impl EpochCallback for Recorder {
        fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) -> Result<()> {
            self.0.borrow_mut().push((epoch, logs.clone()));
            Ok(())
        }
    }

    fn source(len: usize) -> BatchSource {
        let corpus = EncodedCorpus::new((0..len).map(|i| i % 5).collect(), 5);
        BatchSource::new("test", BatchGenerator::new(corpus, 4, 3).unwrap(), 0).unwrap()
    }

    fn hooks(name: &str, scheduler: SchedulerConfig) -> (EpochHooks, CheckpointStore) {
        let dir = std::env::temp_dir().join(format!("char_rnn_fit_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store  = CheckpointStore::new(dir.join("m.ckpt"));
        let writer = CheckpointWriter::new(
            store.clone(), 3, "abcde".to_string(), scheduler.monitor.clone(), Direction::Minimize,
        );
        let hooks = EpochHooks {
            scheduler:  LrScheduler::new(scheduler),
            checkpoint: writer,
            sinks:      Vec::new(),
        };
        (hooks, store)
    }

    #[test]
    fn test_fixed_steps_per_epoch() {
        let (mut hooks, _) = hooks("steps", SchedulerConfig::default());
        let mut model = FakeModel::new(0.1);
        let mut train = source(40);
        let mut val   = source(20);
        let plan = EpochPlan { start_epoch: 0, epochs: 3, train_steps: 10, val_steps: 5 };

        let summary = fit(&mut model, plan, &mut train, Some(&mut val), &mut hooks).unwrap();

        assert_eq!(summary.epochs_run, 3);
        assert_eq!(model.seen.len(), 30);
        // 40 characters, B = 4, W = 3: offsets 0..=32 fit, then the cursor wraps
        assert_eq!(&model.seen[..10], &[0, 4, 8, 12, 16, 20, 24, 28, 32, 0]);
    }

    #[test]
    fn test_logs_handed_to_sinks() {
        let (mut hooks, _) = hooks("sinks", SchedulerConfig::default());
        let rows = Rc::new(RefCell::new(Vec::new()));
        hooks.sinks.push(Box::new(Recorder(rows.clone())));

        let mut model = FakeModel::new(0.5);
        let plan = EpochPlan { start_epoch: 4, epochs: 2, train_steps: 2, val_steps: 1 };
        fit(&mut model, plan, &mut source(40), Some(&mut source(20)), &mut hooks).unwrap();

        let rows = rows.borrow();
        assert_eq!(rows.iter().map(|(e, _)| *e).collect::<Vec<_>>(), vec![4, 5]);
        let (_, first) = &rows[0];
        assert_eq!(first.get(LOSS), Some(9.25));
        assert_eq!(first.get(VAL_LOSS), Some(9.0));
        assert_eq!(first.get(LR), Some(0.1));
        assert_eq!(first.get(ACC), Some(0.25));
    }

    #[test]
    fn test_checkpoint_sees_scheduler_update() {
        // Improves every epoch; frequency 1 forces a reduction each epoch too
        let scheduler = SchedulerConfig {
            mode:      Mode::Min,
            frequency: Some(1),
            ..SchedulerConfig::default()
        };
        let (mut hooks, store) = hooks("order", scheduler);
        let mut model = FakeModel::new(1.0);
        let plan = EpochPlan { start_epoch: 0, epochs: 1, train_steps: 1, val_steps: 1 };

        let summary = fit(&mut model, plan, &mut source(40), Some(&mut source(20)), &mut hooks).unwrap();

        assert_eq!(summary.checkpoints, 1);
        assert_eq!(summary.final_lr, 0.05);
        let saved: LoadedCheckpoint<u32> = store.load().unwrap();
        assert_eq!(saved.header.optimizer.learning_rate, 0.05);
        assert_eq!(saved.header.window, 3);
    }

    #[test]
    fn test_plateau_reduces_and_skips_checkpoint() {
        let (mut hooks, _) = hooks("plateau", SchedulerConfig { mode: Mode::Min, ..SchedulerConfig::default() });
        let mut model = FakeModel::new(0.0);
        let plan = EpochPlan { start_epoch: 0, epochs: 3, train_steps: 1, val_steps: 1 };

        let summary = fit(&mut model, plan, &mut source(40), Some(&mut source(20)), &mut hooks).unwrap();

        assert_eq!(summary.checkpoints, 1);
        assert_eq!(summary.best, 10.0);
        assert_eq!(summary.final_lr, 0.025);
    }

    #[test]
    fn test_missing_validation_metric_fails() {
        // val_loss is monitored but no validation source is given
        let (mut hooks, _) = hooks("noval", SchedulerConfig::default());
        let mut model = FakeModel::new(0.1);
        let plan = EpochPlan { start_epoch: 0, epochs: 1, train_steps: 1, val_steps: 0 };
        assert!(fit(&mut model, plan, &mut source(40), None, &mut hooks).is_err());
    }

    #[test]
    fn test_resume_restores_learning_rate() {
        use burn::backend::NdArray;
        type TestBackend = Autodiff<NdArray>;

        let config = CharRnnConfig::new(5, 4, 1);
        let device = Default::default();

        let (mut first, store) = hooks("resume", SchedulerConfig {
            monitor:   LOSS.to_string(),
            frequency: Some(1),
            ..SchedulerConfig::default()
        });
        let plan  = EpochPlan { start_epoch: 0, epochs: 1, train_steps: 2, val_steps: 0 };
        let fresh = ModelSetup {
            model_config: config.clone(),
            optimizer:    OptimizerSettings { kind: OptimizerKind::Adam, learning_rate: 0.01, clip_value: Some(4.0) },
            resume_from:  None,
            lr_override:  None,
        };
        let summary = train_on::<TestBackend>(fresh, plan, &mut source(40), None, &mut first, &device).unwrap();
        assert_eq!(summary.checkpoints, 1);
        assert_eq!(summary.final_lr, 0.005);

        let (mut second, _) = hooks("resume_second", SchedulerConfig {
            monitor: LOSS.to_string(),
            ..SchedulerConfig::default()
        });
        let rows = Rc::new(RefCell::new(Vec::new()));
        second.sinks.push(Box::new(Recorder(rows.clone())));

        let resumed = ModelSetup {
            model_config: config,
            optimizer:    OptimizerSettings { kind: OptimizerKind::Adam, learning_rate: 0.01, clip_value: Some(4.0) },
            resume_from:  Some(store),
            lr_override:  None,
        };
        let plan = EpochPlan { start_epoch: 1, epochs: 1, train_steps: 1, val_steps: 0 };
        train_on::<TestBackend>(resumed, plan, &mut source(40), None, &mut second, &device).unwrap();

        assert_eq!(rows.borrow()[0].1.get(LR), Some(0.005));
    }

    #[test]
    fn test_resume_keeps_checkpoint_optimiser() {
        use burn::backend::NdArray;
        type TestBackend = Autodiff<NdArray>;

        let config = CharRnnConfig::new(5, 4, 1);
        let device = Default::default();
        let loss_monitor = || SchedulerConfig { monitor: LOSS.to_string(), ..SchedulerConfig::default() };

        let (mut first, store) = hooks("sgd_first", loss_monitor());
        let fresh = ModelSetup {
            model_config: config.clone(),
            optimizer:    OptimizerSettings::with_defaults(OptimizerKind::Sgd, Some(4.0)),
            resume_from:  None,
            lr_override:  None,
        };
        let plan = EpochPlan { start_epoch: 0, epochs: 1, train_steps: 2, val_steps: 0 };
        train_on::<TestBackend>(fresh, plan, &mut source(40), None, &mut first, &device).unwrap();
        let saved: LoadedCheckpoint<CharRnnConfig> = store.load().unwrap();
        assert_eq!(saved.header.optimizer.kind, OptimizerKind::Sgd);
        assert_eq!(saved.header.optimizer.learning_rate, 0.01);

        // The resumed run asks for adam; the checkpoint's sgd wins
        let (mut second, second_store) = hooks("sgd_second", loss_monitor());
        let resumed = ModelSetup {
            model_config: config,
            optimizer:    OptimizerSettings::with_defaults(OptimizerKind::Adam, Some(4.0)),
            resume_from:  Some(store),
            lr_override:  None,
        };
        let plan = EpochPlan { start_epoch: 1, epochs: 1, train_steps: 1, val_steps: 0 };
        train_on::<TestBackend>(resumed, plan, &mut source(40), None, &mut second, &device).unwrap();

        let resaved: LoadedCheckpoint<CharRnnConfig> = second_store.load().unwrap();
        assert_eq!(resaved.header.optimizer.kind, OptimizerKind::Sgd);
        assert_eq!(resaved.header.optimizer.learning_rate, 0.01);
    }
}
