// ============================================================
// Layer 3 — Land-Cover Classes
// ============================================================
// The six SAT-6 classes, in the order of the one-hot label
// rows stored in the dataset file:
//
//   index 0 → building
//   index 1 → barren land
//   index 2 → trees
//   index 3 → grassland
//   index 4 → road
//   index 5 → water
//
// The display names are what ends up in metadata-sat6.tsv.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of output classes of the classifier.
pub const NUM_CLASSES: usize = 6;

/// One SAT-6 land-cover class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandCover {
    Building,
    BarrenLand,
    Trees,
    Grassland,
    Road,
    Water,
}

impl LandCover {
    /// All classes in label-index order.
    pub const ALL: [LandCover; NUM_CLASSES] = [
        LandCover::Building,
        LandCover::BarrenLand,
        LandCover::Trees,
        LandCover::Grassland,
        LandCover::Road,
        LandCover::Water,
    ];

    /// Map a label index (arg-max of a one-hot row) to its class.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable name used by the visualization metadata file.
    pub fn name(self) -> &'static str {
        match self {
            LandCover::Building   => "building",
            LandCover::BarrenLand => "barren land",
            LandCover::Trees      => "trees",
            LandCover::Grassland  => "grassland",
            LandCover::Road       => "road",
            LandCover::Water      => "water",
        }
    }
}

impl fmt::Display for LandCover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, class) in LandCover::ALL.iter().enumerate() {
            assert_eq!(*class as usize, i);
            assert_eq!(LandCover::from_index(i), Some(*class));
        }
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(LandCover::from_index(NUM_CLASSES), None);
    }

    #[test]
    fn test_names_match_dataset_annotations() {
        let names: Vec<&str> = LandCover::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["building", "barren land", "trees", "grassland", "road", "water"]
        );
        assert_eq!(LandCover::BarrenLand.to_string(), "barren land");
    }
}
