// ============================================================
// Layer 6 — Visualization Exporters
// ============================================================
// Files that describe the test shard used for embedding capture,
// for viewing in an embedding projector:
//
//   metadata-sat6.tsv   one class name per line, sample order
//   sprite-sat6.png     all thumbnails tiled in a square grid
//   embeddings.tsv      one 200-value activation row per sample
//
// Sprite layout for N thumbnails of 28×28:
//
//   side  = ceil(sqrt(N))
//   image = (side·28) × (side·28) RGB, white background
//   cell i → row i / side, column i % side
//
// Only the first three channels (RGB) are drawn; near-infrared
// is dropped. Unused cells stay white.
//
// Reference: image crate documentation (ImageBuffer, Rgb)

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{bail, ensure, Context, Result};
use image::{Rgb, RgbImage};

use crate::domain::land_cover::LandCover;
use crate::domain::partition::{SampleSlice, CHANNELS, IMAGE_SIDE};

/// Write the class name of every sample, one per line.
pub fn write_labels(path: &Path, samples: &SampleSlice<'_>) -> Result<()> {
    let mut out = create(path)?;
    for class in samples.classes() {
        let Some(land_cover) = LandCover::from_index(class) else {
            bail!("label index {} has no class name", class);
        };
        writeln!(out, "{}", land_cover.name())?;
    }
    out.flush()?;
    tracing::info!("Wrote {} labels to '{}'", samples.len(), path.display());
    Ok(())
}

/// Smallest side of a square grid holding `count` cells.
pub fn grid_side(count: usize) -> usize {
    let mut side = (count as f64).sqrt().ceil() as usize;
    while side * side < count {
        side += 1;
    }
    while side > 0 && (side - 1) * (side - 1) >= count {
        side -= 1;
    }
    side
}

/// Tile every sample's RGB channels into one square sprite.
pub fn build_sprite(samples: &SampleSlice<'_>) -> RgbImage {
    let side  = grid_side(samples.len());
    let pixels = (side * IMAGE_SIDE) as u32;
    let mut sprite = RgbImage::from_pixel(pixels, pixels, Rgb([255, 255, 255]));

    for i in 0..samples.len() {
        let image = samples.image(i);
        let top   = (i / side) * IMAGE_SIDE;
        let left  = (i % side) * IMAGE_SIDE;
        for r in 0..IMAGE_SIDE {
            for c in 0..IMAGE_SIDE {
                let px = &image[(r * IMAGE_SIDE + c) * CHANNELS..][..3];
                let rgb = [to_byte(px[0]), to_byte(px[1]), to_byte(px[2])];
                sprite.put_pixel((left + c) as u32, (top + r) as u32, Rgb(rgb));
            }
        }
    }
    sprite
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn write_sprite(path: &Path, samples: &SampleSlice<'_>) -> Result<()> {
    ensure!(!samples.is_empty(), "cannot build a sprite from zero images");
    let sprite = build_sprite(samples);
    sprite
        .save(path)
        .with_context(|| format!("Cannot write sprite '{}'", path.display()))?;
    tracing::info!(
        "Wrote {}x{} sprite of {} images to '{}'",
        sprite.width(),
        sprite.height(),
        samples.len(),
        path.display()
    );
    Ok(())
}

/// Write `values` as rows of `width` tab-separated numbers.
pub fn write_embeddings(path: &Path, values: &[f32], width: usize) -> Result<()> {
    ensure!(width > 0, "embedding width must be positive");
    ensure!(
        values.len() % width == 0,
        "{} embedding values do not form rows of {}",
        values.len(),
        width
    );

    let mut out = create(path)?;
    for row in values.chunks_exact(width) {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    out.flush()?;
    tracing::debug!("Wrote {} embedding rows to '{}'", values.len() / width, path.display());
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    Ok(BufWriter::new(file))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::land_cover::NUM_CLASSES;
    use crate::domain::partition::tests::cycling_partition;
    use crate::domain::partition::{Partition, IMAGE_LEN};

    #[test]
    fn test_grid_side() {
        assert_eq!(grid_side(0), 0);
        assert_eq!(grid_side(1), 1);
        assert_eq!(grid_side(4), 2);
        assert_eq!(grid_side(5), 3);
        assert_eq!(grid_side(8100), 90);
        assert_eq!(grid_side(8101), 91);
    }

    #[test]
    fn test_labels_one_name_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata-sat6.tsv");
        let p = cycling_partition(8);
        write_labels(&path, &p.tail(4).unwrap()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["road", "water", "building", "barren land"]);
        let names: Vec<&str> = LandCover::ALL.iter().map(|c| c.name()).collect();
        assert!(lines.iter().all(|l| names.contains(l)));
    }

    #[test]
    fn test_sprite_layout_and_fill() {
        // Five images, each a flat grey of 0.2 * (i + 1), NIR at 1.0.
        let mut images = vec![0.0; 5 * IMAGE_LEN];
        for i in 0..5 {
            for px in 0..IMAGE_SIDE * IMAGE_SIDE {
                let base = i * IMAGE_LEN + px * CHANNELS;
                images[base]     = 0.2 * (i + 1) as f32;
                images[base + 1] = 0.2 * (i + 1) as f32;
                images[base + 2] = 0.2 * (i + 1) as f32;
                images[base + 3] = 1.0;
            }
        }
        let labels: Vec<f32> = (0..5 * NUM_CLASSES).map(|k| (k % NUM_CLASSES == 0) as u8 as f32).collect();
        let p = Partition::new(images, labels).unwrap();

        let sprite = build_sprite(&p.slice(0..5));
        assert_eq!(sprite.dimensions(), (3 * 28, 3 * 28));

        // Image 4 sits at row 1, column 1.
        assert_eq!(sprite.get_pixel(28 + 3, 28 + 3), &Rgb([255, 255, 255]));
        assert_eq!(sprite.get_pixel(0, 0), &Rgb([51, 51, 51]));
        assert_eq!(sprite.get_pixel(2 * 28, 0), &Rgb([153, 153, 153]));
        // Cells 5..9 are unused and stay white.
        assert_eq!(sprite.get_pixel(2 * 28 + 5, 28 + 5), &Rgb([255, 255, 255]));
        assert_eq!(sprite.get_pixel(2 * 28 + 5, 2 * 28 + 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_sprite_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let p = cycling_partition(0);
        assert!(write_sprite(&dir.path().join("s.png"), &p.slice(0..0)).is_err());
    }

    #[test]
    fn test_sprite_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprite-sat6.png");
        let p = cycling_partition(3);
        write_sprite(&path, &p.slice(0..3)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_embeddings_tsv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.tsv");
        write_embeddings(&path, &[1.0, 0.5, 0.0, 2.0, 3.0, 4.0], 3).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1\t0.5\t0\n2\t3\t4\n");
        assert!(write_embeddings(&path, &[1.0, 2.0], 3).is_err());
    }
}
