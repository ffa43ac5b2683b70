use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sample – one measured point on the wafer
// ---------------------------------------------------------------------------

/// A single thickness measurement at a wafer coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    /// Thickness in nm.
    pub thickness: f64,
}

impl Sample {
    /// Distance from the wafer center.
    pub fn radius(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

// ---------------------------------------------------------------------------
// WaferDataset – the complete measurement map
// ---------------------------------------------------------------------------

/// An ordered sequence of samples plus the column names of the source file.
///
/// Row order is irrelevant for statistics but kept stable so that emitted
/// files are reproducible. Reduction never mutates in place: each round
/// produces a fresh dataset via [`WaferDataset::without_indices`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaferDataset {
    pub samples: Vec<Sample>,
    /// Header names for (x, y, thickness), preserved from the input.
    pub columns: [String; 3],
}

impl WaferDataset {
    /// Default column names used when the source file had no header.
    pub fn default_columns() -> [String; 3] {
        ["x".to_string(), "y".to_string(), "thickness".to_string()]
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        WaferDataset {
            samples,
            columns: Self::default_columns(),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The thickness column as a plain array for the detectors.
    pub fn thickness_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.thickness).collect()
    }

    /// Indices of the `count` lowest-thickness samples, ascending by index.
    /// Ties go to the earlier row.
    pub fn lowest_thickness_indices(&self, count: usize) -> BTreeSet<usize> {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        order.sort_by(|&a, &b| self.samples[a].thickness.total_cmp(&self.samples[b].thickness));
        order.into_iter().take(count).collect()
    }

    /// A new dataset excluding the given row indices. Out-of-range indices
    /// are ignored. Column names carry over.
    pub fn without_indices(&self, indices: &BTreeSet<usize>) -> WaferDataset {
        let samples = self
            .samples
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, s)| *s)
            .collect();
        WaferDataset {
            samples,
            columns: self.columns.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
