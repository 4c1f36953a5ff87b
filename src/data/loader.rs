// ============================================================
// Layer 4 — SAT-6 Loader
// ============================================================
// Loads sat-6-full.mat into two in-memory partitions.
//
// The file holds four arrays, all column-major (MATLAB order):
//
//   train_x  [28, 28, 4, N_train]   uint8 pixels
//   train_y  [6, N_train]           one-hot labels
//   test_x   [28, 28, 4, N_test]
//   test_y   [6, N_test]
//
// The training pipeline wants sample-major NHWC images and
// [N, 6] label rows, so both are transposed while copying:
//
//   image (row r, col c, channel ch, sample s)
//     lives at  r + 28c + 784ch + 3136s   in the file
//     goes to   ((s·28 + r)·28 + c)·4 + ch  in the partition
//
// Pixels are divided by 255 on the way through. Sample order
// is kept exactly as stored; nothing is shuffled.
//
// Reference: MATLAB "MAT-File Format" (Level 5)
//            Rust Book §9 (Error Handling)

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

use crate::data::mat::{MatArray, MatFile};
use crate::domain::land_cover::NUM_CLASSES;
use crate::domain::partition::{Partition, SatDataset, CHANNELS, IMAGE_LEN, IMAGE_SIDE};
use crate::domain::traits::DatasetSource;

const TRAIN_IMAGES: &str = "train_x";
const TRAIN_LABELS: &str = "train_y";
const TEST_IMAGES:  &str = "test_x";
const TEST_LABELS:  &str = "test_y";

/// Loads the SAT-6 dataset from a Level-5 MAT file.
/// Implements the DatasetSource trait from Layer 3.
pub struct SatLoader {
    path: PathBuf,
}

impl SatLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for SatLoader {
    fn load(&self) -> Result<SatDataset> {
        tracing::info!("Loading SAT-6 data from '{}'", self.path.display());

        let mut mat = MatFile::open(
            &self.path,
            &[TRAIN_IMAGES, TRAIN_LABELS, TEST_IMAGES, TEST_LABELS],
        )
        .with_context(|| format!("Cannot read MAT file '{}'", self.path.display()))?;

        let train = partition_from_arrays(mat.take(TRAIN_IMAGES)?, mat.take(TRAIN_LABELS)?)
            .context("Invalid training partition")?;
        let test = partition_from_arrays(mat.take(TEST_IMAGES)?, mat.take(TEST_LABELS)?)
            .context("Invalid test partition")?;

        tracing::info!(
            "Loaded {} training and {} test samples",
            train.len(),
            test.len()
        );
        Ok(SatDataset { train, test })
    }
}

/// Transpose one image array and one label array into a partition.
pub fn partition_from_arrays(images: MatArray, labels: MatArray) -> Result<Partition> {
    ensure!(
        images.dims.len() == 4
            && images.dims[0] == IMAGE_SIDE
            && images.dims[1] == IMAGE_SIDE
            && images.dims[2] == CHANNELS,
        "'{}' has dims {:?}, expected [{}, {}, {}, N]",
        images.name, images.dims, IMAGE_SIDE, IMAGE_SIDE, CHANNELS
    );
    ensure!(
        labels.dims.len() == 2 && labels.dims[0] == NUM_CLASSES,
        "'{}' has dims {:?}, expected [{}, N]",
        labels.name, labels.dims, NUM_CLASSES
    );

    let count = images.dims[3];
    ensure!(
        labels.dims[1] == count,
        "'{}' holds {} samples but '{}' holds {}",
        images.name, count, labels.name, labels.dims[1]
    );

    let plane = IMAGE_SIDE * IMAGE_SIDE;
    let mut pixels = vec![0.0f32; count * IMAGE_LEN];
    for s in 0..count {
        for r in 0..IMAGE_SIDE {
            for c in 0..IMAGE_SIDE {
                for ch in 0..CHANNELS {
                    let src = r + IMAGE_SIDE * c + plane * ch + IMAGE_LEN * s;
                    let dst = ((s * IMAGE_SIDE + r) * IMAGE_SIDE + c) * CHANNELS + ch;
                    pixels[dst] = images.data.get_f32(src) / 255.0;
                }
            }
        }
    }

    // Column-major [6, N] is already sample-major row by row.
    let rows: Vec<f32> = (0..count * NUM_CLASSES)
        .map(|i| labels.data.get_f32(i))
        .collect();

    Partition::new(pixels, rows)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::data::mat::fixtures::*;
    use crate::data::mat::MatData;

    /// Column-major pixel buffer where every value encodes its position.
    fn coded_pixels(count: usize) -> Vec<u8> {
        let mut data = vec![0u8; count * IMAGE_LEN];
        for s in 0..count {
            for ch in 0..CHANNELS {
                for c in 0..IMAGE_SIDE {
                    for r in 0..IMAGE_SIDE {
                        let i = r + IMAGE_SIDE * c + IMAGE_SIDE * IMAGE_SIDE * ch + IMAGE_LEN * s;
                        data[i] = ((r + 2 * c + 3 * ch + 5 * s) % 256) as u8;
                    }
                }
            }
        }
        data
    }

    fn one_hot(classes: &[usize]) -> Vec<u8> {
        let mut data = vec![0u8; classes.len() * NUM_CLASSES];
        for (s, k) in classes.iter().enumerate() {
            data[s * NUM_CLASSES + k] = 1;
        }
        data
    }

    fn write_dataset(dir: &Path, train: usize, test: usize) -> PathBuf {
        let mut file = header();
        let train_classes: Vec<usize> = (0..train).map(|i| i % NUM_CLASSES).collect();
        let test_classes:  Vec<usize> = (0..test).map(|i| (i + 3) % NUM_CLASSES).collect();

        file.extend(compressed(&matrix(
            "train_x", CLASS_UINT8, &[28, 28, 4, train], TYPE_UINT8, &coded_pixels(train),
        )));
        file.extend(matrix("train_y", CLASS_UINT8, &[6, train], TYPE_UINT8, &one_hot(&train_classes)));
        file.extend(compressed(&matrix(
            "test_x", CLASS_UINT8, &[28, 28, 4, test], TYPE_UINT8, &coded_pixels(test),
        )));
        file.extend(compressed(&matrix(
            "test_y", CLASS_UINT8, &[6, test], TYPE_UINT8, &one_hot(&test_classes),
        )));

        let path = dir.join("sat-6-mini.mat");
        std::fs::write(&path, file).unwrap();
        path
    }

    #[test]
    fn test_load_transposes_to_sample_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(dir.path(), 3, 2);

        let data = SatLoader::new(&path).load().unwrap();
        assert_eq!(data.train.len(), 3);
        assert_eq!(data.test.len(), 2);

        // Pixel (r=5, c=7, ch=2) of training sample 1.
        let image = data.train.slice(1..2).image(0);
        let expected = (5 + 2 * 7 + 3 * 2 + 5) as f32 / 255.0;
        assert!((image[(5 * IMAGE_SIDE + 7) * CHANNELS + 2] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_load_keeps_label_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dataset(dir.path(), 8, 4);

        let data = SatLoader::new(&path).load().unwrap();
        assert_eq!(data.train.slice(0..8).classes(), vec![0, 1, 2, 3, 4, 5, 0, 1]);
        assert_eq!(data.test.slice(0..4).classes(), vec![3, 4, 5, 0]);
    }

    #[test]
    fn test_pixels_are_normalised() {
        let images = MatArray {
            name: "x".into(),
            dims: vec![28, 28, 4, 1],
            data: MatData::U8(vec![255; IMAGE_LEN]),
        };
        let labels = MatArray {
            name: "y".into(),
            dims: vec![6, 1],
            data: MatData::U8(vec![0, 0, 1, 0, 0, 0]),
        };
        let p = partition_from_arrays(images, labels).unwrap();
        assert!(p.slice(0..1).images().iter().all(|v| (*v - 1.0).abs() < 1e-6));
        assert_eq!(p.slice(0..1).classes(), vec![2]);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let images = MatArray {
            name: "x".into(),
            dims: vec![28, 28, 4, 2],
            data: MatData::U8(vec![0; 2 * IMAGE_LEN]),
        };
        let labels = MatArray {
            name: "y".into(),
            dims: vec![6, 3],
            data: MatData::U8(vec![0; 18]),
        };
        assert!(partition_from_arrays(images, labels).is_err());
    }

    #[test]
    fn test_wrong_image_shape_rejected() {
        let images = MatArray {
            name: "x".into(),
            dims: vec![32, 32, 3, 1],
            data: MatData::U8(vec![0; 32 * 32 * 3]),
        };
        let labels = MatArray {
            name: "y".into(),
            dims: vec![6, 1],
            data: MatData::U8(vec![1, 0, 0, 0, 0, 0]),
        };
        assert!(partition_from_arrays(images, labels).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SatLoader::new(dir.path().join("absent.mat")).load().is_err());
    }

    #[test]
    fn test_missing_array_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = header();
        file.extend(matrix("train_x", CLASS_UINT8, &[28, 28, 4, 0], TYPE_UINT8, &[]));
        let path = dir.path().join("partial.mat");
        std::fs::write(&path, file).unwrap();
        assert!(SatLoader::new(&path).load().is_err());
    }
}
