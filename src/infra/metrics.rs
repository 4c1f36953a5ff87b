// ============================================================
// Layer 6 — Scalar Summaries
// ============================================================
// Records training curves as CSV files inside the run's logs
// directory, one file per series:
//
//   scalars.csv        step,loss,accuracy     every training step
//   test_accuracy.csv  step,accuracy          every evaluation
//
// Example:
//   step,loss,accuracy
//   0,1.912034,0.156250
//   1,1.840117,0.210938
//
// Files are created fresh when the logger opens and stay open
// for the whole run. Rows are buffered and flushed at every
// evaluation and when the logger is dropped.
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Loss and accuracy of one training step's minibatch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub step:     usize,
    /// Mean cross-entropy over the minibatch, dropout active.
    pub loss:     f64,
    /// Fraction of the minibatch predicted correctly, in [0, 1].
    pub accuracy: f64,
}

impl StepMetrics {
    pub fn new(step: usize, loss: f64, accuracy: f64) -> Self {
        Self { step, loss, accuracy }
    }
}

pub struct MetricsLogger {
    scalars: BufWriter<File>,
    test:    BufWriter<File>,
}

impl MetricsLogger {
    /// Create both CSV files in `dir`, writing their header rows.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let mut scalars = open_csv(&dir.join("scalars.csv"))?;
        writeln!(scalars, "step,loss,accuracy")?;
        let mut test = open_csv(&dir.join("test_accuracy.csv"))?;
        writeln!(test, "step,accuracy")?;

        tracing::debug!("Writing scalar summaries to '{}'", dir.display());
        Ok(Self { scalars, test })
    }

    pub fn log_step(&mut self, m: &StepMetrics) -> Result<()> {
        writeln!(self.scalars, "{},{:.6},{:.6}", m.step, m.loss, m.accuracy)
            .context("Cannot write step summary")?;
        Ok(())
    }

    pub fn log_test(&mut self, step: usize, accuracy: f64) -> Result<()> {
        writeln!(self.test, "{},{:.6}", step, accuracy).context("Cannot write test summary")?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.scalars.flush().context("Cannot flush scalars.csv")?;
        self.test.flush().context("Cannot flush test_accuracy.csv")?;
        Ok(())
    }
}

fn open_csv(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    Ok(BufWriter::new(file))
}
