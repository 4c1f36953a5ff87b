// ============================================================
// Layer 2 — ExportUseCase
// ============================================================
// Writes the label list and the thumbnail sprite for the last
// `shard_size` test samples, the block whose embeddings the
// training run captures.

use std::path::PathBuf;

use anyhow::{ensure, Result};

use crate::domain::traits::DatasetSource;
use crate::infra::exporters::{write_labels, write_sprite};

pub const DEFAULT_LABELS_FILE: &str = "metadata-sat6.tsv";
pub const DEFAULT_SPRITE_FILE: &str = "sprite-sat6.png";

pub struct ExportUseCase {
    shard_size: usize,
    labels_out: PathBuf,
    sprite_out: PathBuf,
}

impl ExportUseCase {
    pub fn new(shard_size: usize, labels_out: impl Into<PathBuf>, sprite_out: impl Into<PathBuf>) -> Self {
        Self {
            shard_size,
            labels_out: labels_out.into(),
            sprite_out: sprite_out.into(),
        }
    }

    /// Returns the number of samples exported.
    pub fn execute(&self, source: &dyn DatasetSource) -> Result<usize> {
        ensure!(self.shard_size > 0, "shard size must be at least 1");

        let data  = source.load()?;
        let block = data.test.tail(self.shard_size)?;

        write_labels(&self.labels_out, &block)?;
        write_sprite(&self.sprite_out, &block)?;
        Ok(block.len())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::partition::tests::cycling_partition;
    use crate::domain::partition::SatDataset;

    struct InMemory(SatDataset);

    impl DatasetSource for InMemory {
        fn load(&self) -> Result<SatDataset> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_export_last_block() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join(DEFAULT_LABELS_FILE);
        let sprite = dir.path().join(DEFAULT_SPRITE_FILE);
        let source = InMemory(SatDataset { train: cycling_partition(1), test: cycling_partition(10) });

        let count = ExportUseCase::new(4, &labels, &sprite).execute(&source).unwrap();
        assert_eq!(count, 4);

        let text = std::fs::read_to_string(&labels).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["building", "barren land", "trees", "grassland"]);

        let png = image::open(&sprite).unwrap();
        assert_eq!((png.width(), png.height()), (56, 56));
    }

    #[test]
    fn test_shard_larger_than_test_set_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = InMemory(SatDataset { train: cycling_partition(1), test: cycling_partition(3) });
        let use_case = ExportUseCase::new(5, dir.path().join("l.tsv"), dir.path().join("s.png"));
        assert!(use_case.execute(&source).is_err());
    }
}
