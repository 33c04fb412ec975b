// ============================================================
// Layer 5 — LSTM Learner
// ============================================================
// Binds a CharRnn to its optimiser and learning rate and exposes
// the pair through the CharModel trait, so the training loop
// never touches Burn types.
//
// Supported optimisers, all with element-wise gradient clipping
// g = clamp(g, -clip, clip) applied before the update:
//   sgd     θ = θ - lr * g
//   adam    m = β1*m + (1-β1)*g,  v = β2*v + (1-β2)*g²
//           θ = θ - lr * m / (√v + ε)
//   rmsprop v = ρ*v + (1-ρ)*g²,   θ = θ - lr * g / (√v + ε)
//
// The learning rate is a plain field: `step` receives it on
// every call, so a scheduler write takes effect at the next step.
//
// Evaluation and prediction run on `model.valid()`, i.e. the inner
// backend with dropout disabled and no autodiff graph.
//
// Reference: Burn Book §5 (Custom Training Loop)
//            Kingma & Ba (2015) Adam

use anyhow::{anyhow, Context, Result};
use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{
        adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer, RmsProp,
        RmsPropConfig, Sgd, SgdConfig,
    },
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{activation::softmax, backend::AutodiffBackend},
};

use crate::domain::batch::OneHotBatch;
use crate::domain::epoch::StepStats;
use crate::domain::optimizer::{OptimizerKind, OptimizerSettings};
use crate::domain::traits::{CharModel, LearningRate};
use crate::ml::model::{CharRnn, CharRnnConfig};

/// One of the supported Burn optimisers over a CharRnn.
enum CharOptimizer<B: AutodiffBackend> {
    Sgd(OptimizerAdaptor<Sgd<B::InnerBackend>, CharRnn<B>, B>),
    Adam(OptimizerAdaptor<Adam, CharRnn<B>, B>),
    RmsProp(OptimizerAdaptor<RmsProp, CharRnn<B>, B>),
}

impl<B: AutodiffBackend> CharOptimizer<B> {
    fn new(kind: OptimizerKind, clip_value: Option<f64>) -> Self {
        let clipping = clip_value.map(|clip| GradientClippingConfig::Value(clip as f32));
        match kind {
            OptimizerKind::Sgd => Self::Sgd(
                SgdConfig::new().with_gradient_clipping(clipping).init(),
            ),
            OptimizerKind::Adam => Self::Adam(
                AdamConfig::new()
                    .with_epsilon(1e-8)
                    .with_grad_clipping(clipping)
                    .init(),
            ),
            OptimizerKind::RmsProp => Self::RmsProp(
                RmsPropConfig::new()
                    .with_alpha(0.9)
                    .with_momentum(0.0)
                    .with_epsilon(1e-7)
                    .with_grad_clipping(clipping)
                    .init(),
            ),
        }
    }

    fn step(&mut self, lr: f64, model: CharRnn<B>, grads: GradientsParams) -> CharRnn<B> {
        match self {
            Self::Sgd(optim)     => optim.step(lr, model, grads),
            Self::Adam(optim)    => optim.step(lr, model, grads),
            Self::RmsProp(optim) => optim.step(lr, model, grads),
        }
    }
}

pub struct LstmLearner<B: AutodiffBackend> {
    model:    CharRnn<B>,
    optim:    CharOptimizer<B>,
    config:   CharRnnConfig,
    settings: OptimizerSettings,
    device:   B::Device,
}

impl<B: AutodiffBackend> LstmLearner<B> {
    /// Fresh CharRnn with the optimiser described by `settings`.
    pub fn new(config: CharRnnConfig, settings: &OptimizerSettings, device: &B::Device) -> Self {
        let optim = CharOptimizer::new(settings.kind, settings.clip_value);
        let model: CharRnn<B> = config.init(device);
        tracing::info!(
            "Model ready: {} LSTM layers, hidden={}, vocab={}, optimiser={} (lr={:.3e})",
            config.num_layers, config.hidden_size, config.vocab_size,
            settings.kind, settings.learning_rate
        );

        Self {
            model,
            optim,
            config,
            settings: settings.clone(),
            device:   device.clone(),
        }
    }

    fn inputs(&self, batch: &OneHotBatch) -> Tensor<B, 3> {
        Tensor::from_data(
            TensorData::new(batch.inputs.clone(), batch.input_shape()),
            &self.device,
        )
    }

    fn targets(&self, batch: &OneHotBatch) -> Tensor<B, 1, Int> {
        let ids: Vec<i64> = batch.target_ids.iter().map(|&id| id as i64).collect();
        Tensor::from_data(TensorData::new(ids, [batch.batch_size]), &self.device)
    }
}

/// Rows whose arg-max equals the target.
fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted.equal(targets).int().sum().into_scalar().elem::<i64>();
    correct as usize
}

impl<B: AutodiffBackend> LearningRate for LstmLearner<B> {
    fn learning_rate(&self) -> f64 {
        self.settings.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.settings.learning_rate = lr;
    }
}

impl<B: AutodiffBackend> CharModel for LstmLearner<B> {
    type Config = CharRnnConfig;

    fn config(&self) -> CharRnnConfig {
        self.config.clone()
    }

    fn optimizer_settings(&self) -> OptimizerSettings {
        self.settings.clone()
    }

    fn train_step(&mut self, batch: &OneHotBatch) -> Result<StepStats> {
        let targets = self.targets(batch);
        let (loss, logits) = self.model.forward_loss(self.inputs(batch), targets.clone());

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        let correct = count_correct(logits, targets);

        // Backward pass + optimiser update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.settings.learning_rate, self.model.clone(), grads);

        Ok(StepStats::new(loss_val, correct, batch.batch_size))
    }

    fn eval_step(&self, batch: &OneHotBatch) -> Result<StepStats> {
        let model   = self.model.valid();
        let targets = self.targets(batch).inner();
        let (loss, logits) = model.forward_loss(self.inputs(batch).inner(), targets.clone());

        let loss_val: f64 = loss.into_scalar().elem::<f64>();
        Ok(StepStats::new(loss_val, count_correct(logits, targets), batch.batch_size))
    }

    fn predict(&self, batch: &OneHotBatch) -> Result<Vec<f32>> {
        let logits = self.model.valid().forward(self.inputs(batch).inner());
        softmax(logits, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))
    }

    fn export_weights(&self) -> Result<Vec<u8>> {
        BinBytesRecorder::<FullPrecisionSettings>::default()
            .record(self.model.clone().into_record(), ())
            .context("Failed to serialise model weights")
    }

    fn import_weights(&mut self, weights: Vec<u8>) -> Result<()> {
        let record = BinBytesRecorder::<FullPrecisionSettings>::default()
            .load(weights, &self.device)
            .context("Stored weights do not match the model architecture")?;
        self.model = self.model.clone().load_record(record);
        Ok(())
    }
}
