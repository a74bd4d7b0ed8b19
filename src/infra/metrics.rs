// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: average cross-entropy loss on training set
//   - val_<name>: every value returned by the sequence metrics
//                 for the validation epoch (cer, seq_acc, ser)
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_cer,val_seq_acc,val_ser
//   1,3.124500,81.250000,0.000000,92.400000
//   2,2.890100,64.100000,1.500000,77.800000
//   ...
//
// The header is fixed by the first logged row, so metric
// names must stay the same for the whole run.

use anyhow::{ensure, Result};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average cross-entropy loss over all training batches
    pub train_loss: f64,

    /// Validation metrics by name, sorted
    pub values: BTreeMap<String, f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, values: BTreeMap<String, f64>) -> Self {
        Self { epoch, train_loss, values }
    }

    /// Validation symbol error rate; infinite when it was not computed.
    pub fn val_ser(&self) -> f64 {
        self.values.get("ser").copied().unwrap_or(f64::INFINITY)
    }

    /// Lower SER than the best so far
    pub fn is_improvement(&self, best_val_ser: f64) -> bool {
        self.val_ser() < best_val_ser
    }

    fn header(&self) -> String {
        let mut cols = vec!["epoch".to_string(), "train_loss".to_string()];
        cols.extend(self.values.keys().map(|k| format!("val_{k}")));
        cols.join(",")
    }

    fn row(&self) -> String {
        let mut cols = vec![self.epoch.to_string(), format!("{:.6}", self.train_loss)];
        cols.extend(self.values.values().map(|v| format!("{v:.6}")));
        cols.join(",")
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory; the header is written with the first row.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;
        Ok(Self { csv_path: dir.join("metrics.csv") })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let header = m.header();

        if self.csv_path.exists() {
            let existing = fs::read_to_string(&self.csv_path)?;
            let first = existing.lines().next().unwrap_or_default();
            ensure!(
                first == header,
                "Metric columns changed: '{}' vs '{}' in '{}'",
                header, first, self.csv_path.display()
            );
        } else {
            fs::write(&self.csv_path, format!("{header}\n"))?;
            tracing::debug!("Created metrics CSV: '{}'", self.csv_path.display());
        }

        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{}", m.row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_ser={:.2}",
            m.epoch, m.train_loss, m.val_ser(),
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn values(ser: f64, cer: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("ser".to_string(), ser), ("cer".to_string(), cer)])
    }

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, values(30.0, 10.0));
        assert!(m.is_improvement(40.0));
        assert!(!m.is_improvement(30.0));

        // Without a SER value nothing counts as better
        let empty = EpochMetrics::new(1, 1.0, BTreeMap::new());
        assert!(!empty.is_improvement(f64::INFINITY));
    }

    #[test]
    fn test_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().to_string_lossy()).unwrap();
        logger.log(&EpochMetrics::new(1, 3.0, values(50.0, 20.0))).unwrap();
        logger.log(&EpochMetrics::new(2, 2.0, values(25.0, 10.0))).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,val_cer,val_ser");
        assert_eq!(lines[1], "1,3.000000,20.000000,50.000000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_changed_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().to_string_lossy()).unwrap();
        logger.log(&EpochMetrics::new(1, 3.0, values(50.0, 20.0))).unwrap();
        assert!(logger.log(&EpochMetrics::new(2, 2.0, BTreeMap::new())).is_err());
    }
}
