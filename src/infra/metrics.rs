// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the epoch logs to a CSV file next to the checkpoint.
//
// Output file: <model path with .csv extension>
//   model.ckpt → model.csv
//
// Example CSV output:
//   epoch,acc,loss,lr,val_acc,val_loss
//   1,0.212000,3.124500,0.001000,0.231000,3.089200
//   2,0.284000,2.890100,0.001000,0.301000,2.854300
//   ...
//
// Columns are fixed by the first logged epoch (names in sorted
// order). A later epoch missing a column leaves its cell empty.
//
// Fresh runs truncate the file; resumed runs append to it and
// only write the header when the file was empty.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::epoch::EpochLogs;
use crate::domain::traits::EpochCallback;

/// `<model>.csv` for a checkpoint at `<model>.<ext>`.
pub fn csv_path_for(model_path: &Path) -> PathBuf {
    model_path.with_extension("csv")
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,

    /// Set by the first logged epoch
    columns: Option<Vec<String>>,

    header_written: bool,
}

impl MetricsLogger {
    /// Open the CSV file, truncating it unless `append` is set.
    pub fn new(csv_path: impl Into<PathBuf>, append: bool) -> Result<Self> {
        let csv_path = csv_path.into();

        if let Some(dir) = csv_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let has_rows = append
            && fs::metadata(&csv_path).map(|m| m.len() > 0).unwrap_or(false);

        if !append {
            fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create metrics CSV '{}'", csv_path.display()))?;
        }
        tracing::debug!(
            "Metrics CSV: '{}' ({})",
            csv_path.display(),
            if append { "append" } else { "truncate" }
        );

        Ok(Self { csv_path, columns: None, header_written: has_rows })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&mut self, epoch: usize, logs: &EpochLogs) -> Result<()> {
        let columns = self
            .columns
            .get_or_insert_with(|| logs.names().map(str::to_string).collect());

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open metrics CSV '{}'", self.csv_path.display()))?;

        if !self.header_written {
            writeln!(f, "epoch,{}", columns.join(","))?;
            self.header_written = true;
        }

        let cells: Vec<String> = columns
            .iter()
            .map(|name| logs.get(name).map(|v| format!("{v:.6}")).unwrap_or_default())
            .collect();
        writeln!(f, "{},{}", epoch + 1, cells.join(","))?;

        tracing::debug!("Logged epoch {} metrics to '{}'", epoch + 1, self.csv_path.display());
        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl EpochCallback for MetricsLogger {
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) -> Result<()> {
        self.log(epoch, logs)
    }
}
