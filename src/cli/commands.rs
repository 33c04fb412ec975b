// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `inspect`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, Mode, OovPolicy, OptimizerKind)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::data::encoder::OovPolicy;
use crate::domain::monitor::Mode;
use crate::domain::optimizer::OptimizerKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the character model on plain-text files
    Train(TrainArgs),

    /// Print a checkpoint's window, vocabulary and optimiser settings
    Inspect(InspectArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Text files, or directories of .txt files, to train on
    #[arg(required = true)]
    pub datasets: Vec<String>,

    /// Checkpoint path; metrics go to the same path with a .csv extension
    #[arg(long, default_value = "model.ckpt")]
    pub model: String,

    /// Continue from the checkpoint at --model
    #[arg(long)]
    pub resume: bool,

    /// Number of overlapping windows per batch
    #[arg(long = "batch", default_value_t = 32)]
    pub batch_size: usize,

    /// Characters per input window [default: 40, or the checkpoint's on --resume]
    #[arg(long)]
    pub window: Option<usize>,

    /// Number of epochs to run
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Number of stacked LSTM layers
    #[arg(long, default_value_t = 3)]
    pub layers: usize,

    /// LSTM hidden size
    #[arg(long, default_value_t = 128)]
    pub hidden: usize,

    /// Dropout probability after each LSTM layer
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// sgd | adam | rmsprop  [default: adam, or the checkpoint's on --resume]
    #[arg(long)]
    pub optimizer: Option<OptimizerKind>,

    /// Learning rate [default: sgd 0.01, adam/rmsprop 0.001, or the checkpoint's on --resume]
    #[arg(long)]
    pub lr: Option<f64>,

    /// Element-wise gradient clipping bound
    #[arg(long, default_value_t = 4.0)]
    pub clip: f64,

    /// Metric watched by the scheduler and the checkpoint writer
    #[arg(long, default_value = "val_loss")]
    pub monitor: String,

    /// auto | min | max  (auto maximises metrics whose name contains "acc")
    #[arg(long, default_value = "auto")]
    pub mode: Mode,

    /// Learning-rate multiplier applied on each reduction
    #[arg(long, default_value_t = 0.5)]
    pub decay: f64,

    /// Learning-rate floor
    #[arg(long, default_value_t = 0.0)]
    pub min_lr: f64,

    /// Also reduce every N epochs, improving or not
    #[arg(long)]
    pub decay_freq: Option<usize>,

    /// Minimum change that counts as an improvement
    #[arg(long, default_value_t = 1e-4)]
    pub epsilon: f64,

    /// Epochs to wait after a reduction before the next one
    #[arg(long, default_value_t = 0)]
    pub cooldown: usize,

    /// Fraction of the corpus held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub split: f64,

    /// Batches prepared ahead on background threads (0 = none)
    #[arg(long, default_value_t = 4)]
    pub prefetch: usize,

    /// reject | unknown  (what to do with characters outside the vocabulary)
    #[arg(long, default_value = "reject")]
    pub oov: OovPolicy,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            datasets:   a.datasets,
            model:      a.model,
            resume:     a.resume,
            batch_size: a.batch_size,
            window:     a.window,
            epochs:     a.epochs,
            layers:     a.layers,
            hidden:     a.hidden,
            dropout:    a.dropout,
            optimizer:  a.optimizer,
            lr:         a.lr,
            clip:       Some(a.clip),
            monitor:    a.monitor,
            mode:       a.mode,
            decay:      a.decay,
            min_lr:     a.min_lr,
            decay_freq: a.decay_freq,
            epsilon:    a.epsilon,
            cooldown:   a.cooldown,
            val_split:  a.split,
            prefetch:   a.prefetch,
            oov:        a.oov,
        }
    }
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Checkpoint file written by `train`
    pub checkpoint: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use crate::cli::commands::Commands;
    use crate::application::train_use_case::TrainConfig;
    use crate::data::encoder::OovPolicy;
    use crate::domain::monitor::Mode;
    use crate::domain::optimizer::OptimizerKind;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config() {
        let cli = Cli::try_parse_from(["char-rnn", "train", "corpus.txt"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();

        assert_eq!(cfg.datasets, vec!["corpus.txt".to_string()]);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.window, None);
        assert_eq!(cfg.lr, None);
        assert_eq!(cfg.optimizer, None);
        assert_eq!(cfg.clip, def.clip);
        assert_eq!(cfg.monitor, def.monitor);
        assert_eq!(cfg.mode, Mode::Auto);
        assert_eq!(cfg.val_split, def.val_split);
        assert_eq!(cfg.oov, OovPolicy::Reject);
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "char-rnn", "train", "a.txt", "texts/",
            "--resume", "--window", "64", "--lr", "0.01",
            "--mode", "max", "--monitor", "val_acc",
            "--decay-freq", "5", "--oov", "unknown", "--optimizer", "rmsprop",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.datasets.len(), 2);
        assert!(cfg.resume);
        assert_eq!(cfg.window, Some(64));
        assert_eq!(cfg.lr, Some(0.01));
        assert_eq!(cfg.mode, Mode::Max);
        assert_eq!(cfg.decay_freq, Some(5));
        assert_eq!(cfg.oov, OovPolicy::Unknown);
        assert_eq!(cfg.optimizer, Some(OptimizerKind::RmsProp));
    }

    #[test]
    fn test_bad_mode_rejected_by_parser() {
        assert!(Cli::try_parse_from(["char-rnn", "train", "a.txt", "--mode", "sideways"]).is_err());
    }

    #[test]
    fn test_unsupported_optimiser_rejected_by_parser() {
        assert!(Cli::try_parse_from(["char-rnn", "train", "a.txt", "--optimizer", "nadam"]).is_err());
    }

    #[test]
    fn test_inspect_args() {
        let cli = Cli::try_parse_from(["char-rnn", "inspect", "m.ckpt", "--json"]).unwrap();
        let Commands::Inspect(args) = cli.command else { panic!("expected inspect") };
        assert_eq!(args.checkpoint, "m.ckpt");
        assert!(args.json);
    }
}
