// ============================================================
// Layer 6 — Run Log
// ============================================================
// The human-readable record of a training run, output.txt at
// the top of the results directory. Every progress line is
// written to the file and echoed to stdout:
//
//   HYPER_PARAMETERS_USED
//   ---------------------
//   NUM_SAMPLES:324000
//   ...
//   *****************EPOCH: 1
//   EPOCH:1 Step:0|| Minibatch Loss= 1.8123 Accuracy: 16.67%
//   ...
//   --- 812.4 seconds ---
//
// Each line begins with a newline rather than ending with one,
// which keeps the file in the same shape as earlier runs.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

use crate::application::train_use_case::TrainConfig;

pub struct RunLog {
    out: BufWriter<File>,
}

impl RunLog {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Cannot create run log '{}'", path.display()))?;
        Ok(Self { out: BufWriter::new(file) })
    }

    /// The hyperparameter block. File only.
    pub fn write_header(&mut self, cfg: &TrainConfig) -> Result<()> {
        write!(
            self.out,
            "HYPER_PARAMETERS_USED\
             \n---------------------\
             \nNUM_SAMPLES:{}\
             \nEPOCHS:{}\
             \nBATCH_SIZE:{}\
             \nSTEPS:{}\
             \nLEARNING_RATE:{}\
             \nDECAY:{}\
             \nMOMENTUM:{}\
             \nDROPOUT:{}",
            cfg.num_samples,
            cfg.epochs,
            cfg.batch_size,
            cfg.steps(),
            cfg.lr,
            cfg.decay,
            cfg.momentum,
            cfg.dropout,
        )?;
        self.out.flush()?;
        Ok(())
    }

    pub fn epoch(&mut self, epoch: usize) -> Result<()> {
        self.emit(&format!("\n*****************EPOCH: {epoch}"))
    }

    pub fn test_result(&mut self, epoch: usize, step: usize, loss: f64, accuracy: f64) -> Result<()> {
        self.emit(&format!(
            "\nEPOCH:{epoch} Step:{step}|| Minibatch Loss= {loss:.4} Accuracy: {:.2}%",
            accuracy * 100.0
        ))
    }

    pub fn elapsed(&mut self, seconds: f64) -> Result<()> {
        self.emit(&format!("\n--- {seconds} seconds ---"))
    }

    fn emit(&mut self, line: &str) -> Result<()> {
        println!("{line}");
        self.out.write_all(line.as_bytes()).context("Cannot write run log")?;
        self.out.flush().context("Cannot flush run log")?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let cfg = TrainConfig::default();

        let mut log = RunLog::create(&path).unwrap();
        log.write_header(&cfg).unwrap();
        log.epoch(1).unwrap();
        log.test_result(1, 0, 1.81234, 0.1667).unwrap();
        drop(log);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("HYPER_PARAMETERS_USED\n---------------------\nNUM_SAMPLES:324000\nEPOCHS:1\nBATCH_SIZE:128\nSTEPS:2531"));
        assert!(text.contains("\nLEARNING_RATE:0.0001\nDECAY:0.9\nMOMENTUM:0\nDROPOUT:0.5"));
        assert!(text.contains("\n*****************EPOCH: 1"));
        assert!(text.ends_with("\nEPOCH:1 Step:0|| Minibatch Loss= 1.8123 Accuracy: 16.67%"));
    }
}
