// ============================================================
// Layer 3 — Dataset Partition
// ============================================================
// A partition is one labelled subset of SAT-6 (train or test),
// held entirely in memory:
//
//   images: [N, 28, 28, 4]  row-major, sample index first,
//                           pixel values normalised to [0, 1]
//   labels: [N, 6]          one-hot rows, same order as images
//
// Both buffers are flat Vec<f32>. A sample is addressed by its
// index; a contiguous run of samples is a SampleSlice, which is
// what batches and test shards are made of.
//
// The order is fixed at load time. Nothing here shuffles.

use std::ops::Range;

use anyhow::{bail, ensure, Result};

use crate::domain::land_cover::NUM_CLASSES;

/// Height and width of one patch, in pixels.
pub const IMAGE_SIDE: usize = 28;

/// Channels per pixel (R, G, B, near-infrared).
pub const CHANNELS: usize = 4;

/// Number of f32 values in one image.
pub const IMAGE_LEN: usize = IMAGE_SIDE * IMAGE_SIDE * CHANNELS;

/// One labelled subset of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    images: Vec<f32>,
    labels: Vec<f32>,
    len:    usize,
}

impl Partition {
    /// Build a partition from flat NHWC image data and flat one-hot labels.
    /// Fails if the buffers are not whole samples or disagree on the count.
    pub fn new(images: Vec<f32>, labels: Vec<f32>) -> Result<Self> {
        ensure!(
            images.len() % IMAGE_LEN == 0,
            "image buffer of {} values is not a whole number of {}x{}x{} patches",
            images.len(), IMAGE_SIDE, IMAGE_SIDE, CHANNELS
        );
        ensure!(
            labels.len() % NUM_CLASSES == 0,
            "label buffer of {} values is not a whole number of {}-class rows",
            labels.len(), NUM_CLASSES
        );

        let image_count = images.len() / IMAGE_LEN;
        let label_count = labels.len() / NUM_CLASSES;
        ensure!(
            image_count == label_count,
            "partition has {} images but {} labels",
            image_count, label_count
        );

        Ok(Self { images, labels, len: image_count })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow samples `range.start..range.end`.
    ///
    /// # Panics
    /// Panics if the range reaches past the end, like slice indexing.
    pub fn slice(&self, range: Range<usize>) -> SampleSlice<'_> {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "sample range {:?} out of bounds for partition of {}",
            range, self.len
        );
        SampleSlice {
            images: &self.images[range.start * IMAGE_LEN..range.end * IMAGE_LEN],
            labels: &self.labels[range.start * NUM_CLASSES..range.end * NUM_CLASSES],
            start:  range.start,
        }
    }

    /// The last `count` samples.
    pub fn tail(&self, count: usize) -> Result<SampleSlice<'_>> {
        ensure!(
            count <= self.len,
            "requested the last {} samples of a partition of {}",
            count, self.len
        );
        Ok(self.slice(self.len - count..self.len))
    }

    /// Split the partition into `count` equal contiguous shards.
    /// The partition length must be divisible by `count`.
    pub fn shard_ranges(&self, count: usize) -> Result<Vec<Range<usize>>> {
        if count == 0 {
            bail!("shard count must be at least 1");
        }
        ensure!(
            self.len % count == 0,
            "cannot split {} samples into {} equal shards",
            self.len, count
        );
        let size = self.len / count;
        Ok((0..count).map(|i| i * size..(i + 1) * size).collect())
    }
}

/// A borrowed, contiguous run of samples from a partition.
#[derive(Debug, Clone, Copy)]
pub struct SampleSlice<'a> {
    images: &'a [f32],
    labels: &'a [f32],
    start:  usize,
}

impl<'a> SampleSlice<'a> {
    pub fn len(&self) -> usize {
        self.labels.len() / NUM_CLASSES
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Partition indices covered by this slice.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.start + self.len()
    }

    /// Flat NHWC pixel data for every sample in the slice.
    pub fn images(&self) -> &'a [f32] {
        self.images
    }

    /// Pixel data of the `i`-th sample of the slice, HWC order.
    pub fn image(&self, i: usize) -> &'a [f32] {
        &self.images[i * IMAGE_LEN..(i + 1) * IMAGE_LEN]
    }

    /// Class index of every sample (arg-max of its one-hot row).
    pub fn classes(&self) -> Vec<usize> {
        self.labels.chunks_exact(NUM_CLASSES).map(argmax).collect()
    }
}

/// Index of the first maximum, matching numpy's `argmax`.
/// An empty slice yields 0.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Both halves of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SatDataset {
    pub train: Partition,
    pub test:  Partition,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `count` blank images whose labels cycle through all classes.
    pub(crate) fn cycling_partition(count: usize) -> Partition {
        let images = vec![0.0; count * IMAGE_LEN];
        let mut labels = vec![0.0; count * NUM_CLASSES];
        for i in 0..count {
            labels[i * NUM_CLASSES + i % NUM_CLASSES] = 1.0;
        }
        Partition::new(images, labels).unwrap()
    }

    #[test]
    fn test_counts_agree() {
        let p = cycling_partition(6);
        assert_eq!(p.len(), 6);
        assert_eq!(p.slice(0..6).images().len(), 6 * IMAGE_LEN);
    }

    #[test]
    fn test_mismatched_counts_rejected() {
        let images = vec![0.0; 3 * IMAGE_LEN];
        let labels = vec![0.0; 2 * NUM_CLASSES];
        assert!(Partition::new(images, labels).is_err());
    }

    #[test]
    fn test_partial_image_rejected() {
        let images = vec![0.0; IMAGE_LEN + 1];
        let labels = vec![0.0; NUM_CLASSES];
        assert!(Partition::new(images, labels).is_err());
    }

    #[test]
    fn test_slice_classes_follow_labels() {
        let p = cycling_partition(8);
        let s = p.slice(4..8);
        assert_eq!(s.len(), 4);
        assert_eq!(s.indices(), 4..8);
        assert_eq!(s.classes(), vec![4, 5, 0, 1]);
    }

    #[test]
    fn test_tail() {
        let p = cycling_partition(10);
        let t = p.tail(3).unwrap();
        assert_eq!(t.indices(), 7..10);
        assert!(p.tail(11).is_err());
    }

    #[test]
    fn test_shard_ranges() {
        let p = cycling_partition(20);
        let shards = p.shard_ranges(10).unwrap();
        assert_eq!(shards.len(), 10);
        assert_eq!(shards[0], 0..2);
        assert_eq!(shards[9], 18..20);
        assert!(p.shard_ranges(3).is_err());
        assert!(p.shard_ranges(0).is_err());
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.0, 1.0, 1.0]), 1);
        assert_eq!(argmax(&[0.0; 6]), 0);
        assert_eq!(argmax(&[]), 0);
    }
}
