// ============================================================
// Layer 5 — Adaptive Learning-Rate Scheduler
// ============================================================
// Reduce-on-plateau and reduce-on-period in one state machine.
//
// State:
//   best               — best monitored value so far
//   cooldown_remaining — > 0 means COOLDOWN, <= 0 means NORMAL
//
// Per epoch, with the monitored value `new`:
//   1. not improved                    → reduction attempt (Plateau)
//   2. improved, (epoch + 1) % freq == 0 → reduction attempt (Periodic)
//   3. improved otherwise              → best = new
//   4. cooldown_remaining -= 1
//
// Improvement:
//   Minimize → new < best - epsilon
//   Maximize → new > best + epsilon
//
// A reduction attempt is a no-op while in cooldown or once the
// learning rate is at the floor (lr <= min_lr + min_lr * epsilon).
// Otherwise lr = max(lr * factor, min_lr).
//
// A successful reduction arms `cooldown + 1` so that, after the
// decrement of the same epoch, exactly `cooldown` following epochs
// are suppressed.
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::domain::epoch::EpochLogs;
use crate::domain::monitor::{Direction, Mode};
use crate::domain::traits::LearningRate;

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Metric name read from the epoch logs
    pub monitor:   String,
    pub mode:      Mode,
    /// Multiplier applied on each reduction, in (0, 1)
    pub factor:    f64,
    pub min_lr:    f64,
    /// Forced reduction every `frequency` epochs; None or 0 disables it
    pub frequency: Option<usize>,
    pub epsilon:   f64,
    pub cooldown:  usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monitor:   "val_loss".to_string(),
            mode:      Mode::Auto,
            factor:    0.5,
            min_lr:    0.0,
            frequency: None,
            epsilon:   1e-4,
            cooldown:  0,
        }
    }
}

// ─── Decision ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Plateau,
    Periodic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Cooldown,
    Floor,
}

/// What one epoch boundary did to the learning rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LrDecision {
    /// Metric improved; `best` was updated
    Improved { best: f64 },
    Reduced { trigger: Trigger, from: f64, to: f64 },
    Suppressed { trigger: Trigger, reason: SuppressReason },
}

// ─── Scheduler ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct LrScheduler {
    config:             SchedulerConfig,
    direction:          Direction,
    best:               f64,
    cooldown_remaining: i64,
}

impl LrScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let direction = config.mode.resolve(&config.monitor);
        tracing::debug!(
            "LR scheduler monitors '{}' ({:?}, mode {})",
            config.monitor, direction, config.mode
        );
        Self {
            best: direction.initial_best(),
            config,
            direction,
            cooldown_remaining: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn in_cooldown(&self) -> bool {
        self.cooldown_remaining > 0
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run the epoch-boundary transition against the monitored metric.
    pub fn on_epoch_end<M: LearningRate + ?Sized>(
        &mut self,
        epoch: usize,
        logs:  &EpochLogs,
        model: &mut M,
    ) -> Result<LrDecision> {
        let current = logs.get(&self.config.monitor).ok_or_else(|| {
            anyhow!(
                "LR scheduler monitors '{}' but epoch {} logged only [{}]",
                self.config.monitor,
                epoch,
                logs.names().collect::<Vec<_>>().join(", ")
            )
        })?;
        Ok(self.step(epoch, current, model))
    }

    /// Transition on a bare metric value.
    pub fn step<M: LearningRate + ?Sized>(&mut self, epoch: usize, current: f64, model: &mut M) -> LrDecision {
        let periodic = matches!(self.config.frequency, Some(f) if f > 0 && (epoch + 1) % f == 0);

        let decision = if !self.direction.improved(current, self.best, self.config.epsilon) {
            self.reduce_lr(Trigger::Plateau, model)
        } else if periodic {
            self.reduce_lr(Trigger::Periodic, model)
        } else {
            self.best = current;
            LrDecision::Improved { best: current }
        };

        self.cooldown_remaining -= 1;
        decision
    }

    fn reduce_lr<M: LearningRate + ?Sized>(&mut self, trigger: Trigger, model: &mut M) -> LrDecision {
        if self.in_cooldown() {
            tracing::debug!("{:?} reduction suppressed: cooling down", trigger);
            return LrDecision::Suppressed { trigger, reason: SuppressReason::Cooldown };
        }

        let lr    = model.learning_rate();
        let floor = self.config.min_lr + self.config.min_lr * self.config.epsilon;
        if lr <= floor {
            tracing::debug!("{:?} reduction suppressed: lr {:.3e} at floor", trigger, lr);
            return LrDecision::Suppressed { trigger, reason: SuppressReason::Floor };
        }

        let new_lr = (lr * self.config.factor).max(self.config.min_lr);
        model.set_learning_rate(new_lr);
        self.cooldown_remaining = self.config.cooldown as i64 + 1;

        tracing::info!(
            "Reducing learning rate {:.3e} → {:.3e} ({:?})",
            lr, new_lr, trigger
        );
        LrDecision::Reduced { trigger, from: lr, to: new_lr }
    }
}
