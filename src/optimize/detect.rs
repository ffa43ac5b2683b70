use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RefineError;
use crate::stats;

// ---------------------------------------------------------------------------
// Detection methods
// ---------------------------------------------------------------------------

/// Outlier detection method applied to the thickness column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// 1.5·IQR fences around the quartiles.
    Iqr,
    /// Standard score against mean and sample std.
    ZScore,
    /// Iglewicz–Hoaglin score against median and MAD; robust when the IQR
    /// fence degenerates.
    ModifiedZScore,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::Iqr => write!(f, "iqr"),
            DetectionMethod::ZScore => write!(f, "z_score"),
            DetectionMethod::ModifiedZScore => write!(f, "modified_z_score"),
        }
    }
}

impl std::str::FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iqr" => Ok(DetectionMethod::Iqr),
            "z_score" => Ok(DetectionMethod::ZScore),
            "modified_z_score" => Ok(DetectionMethod::ModifiedZScore),
            other => Err(format!(
                "unknown method '{other}' (expected iqr, z_score, or modified_z_score)"
            )),
        }
    }
}

/// Outcome of one detection pass. Ephemeral: produced and consumed within a
/// single round.
#[derive(Debug, Clone)]
pub struct Detection {
    pub method: DetectionMethod,
    /// Indices of outlying values, ascending. May be empty.
    pub indices: BTreeSet<usize>,
    /// Inlier value range `[lower, upper]` where the method defines one
    /// (IQR fences); `None` for score-based methods.
    pub bounds: Option<(f64, f64)>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Detect outliers in `values` with the given method.
///
/// Fails with [`RefineError::InsufficientData`] below 4 values (quartiles
/// undefined). Numeric degeneracies (zero std, zero MAD) yield an empty
/// index set instead of an error so the caller can fall through to
/// minimum-value removal.
pub fn detect(
    values: &[f64],
    method: DetectionMethod,
    z_threshold: f64,
    modified_z_threshold: f64,
) -> Result<Detection, RefineError> {
    if values.len() < 4 {
        return Err(RefineError::InsufficientData {
            rows: values.len(),
            required: 4,
        });
    }

    match method {
        DetectionMethod::Iqr => Ok(detect_iqr(values)),
        DetectionMethod::ZScore => Ok(detect_z_score(values, z_threshold)),
        DetectionMethod::ModifiedZScore => Ok(detect_modified_z_score(values, modified_z_threshold)),
    }
}

/// Quartile fences: values strictly outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`.
/// Ties at a fence are inliers.
fn detect_iqr(values: &[f64]) -> Detection {
    let q1 = stats::percentile(values, 25.0);
    let q3 = stats::percentile(values, 75.0);
    let iqr = q3 - q1;

    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let indices = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v < lower || v > upper)
        .map(|(i, _)| i)
        .collect();

    Detection {
        method: DetectionMethod::Iqr,
        indices,
        bounds: Some((lower, upper)),
    }
}

/// `|v - mean| / std > threshold`. Zero std → empty set.
fn detect_z_score(values: &[f64], threshold: f64) -> Detection {
    let summary = stats::summarize(values);

    let indices = if summary.std_dev == 0.0 {
        BTreeSet::new()
    } else {
        values
            .iter()
            .enumerate()
            .filter(|(_, &v)| ((v - summary.mean) / summary.std_dev).abs() > threshold)
            .map(|(i, _)| i)
            .collect()
    };

    Detection {
        method: DetectionMethod::ZScore,
        indices,
        bounds: None,
    }
}

/// `0.6745 · (v - median) / MAD`, threshold 3.5 by default. Zero MAD →
/// empty set.
fn detect_modified_z_score(values: &[f64], threshold: f64) -> Detection {
    let median = stats::median(values);
    let mad = stats::mad(values);

    let indices = if mad == 0.0 {
        BTreeSet::new()
    } else {
        values
            .iter()
            .enumerate()
            .filter(|(_, &v)| (0.6745 * (v - median) / mad).abs() > threshold)
            .map(|(i, _)| i)
            .collect()
    };

    Detection {
        method: DetectionMethod::ModifiedZScore,
        indices,
        bounds: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn detect_with(values: &[f64], method: DetectionMethod) -> Detection {
        detect(values, method, 3.0, 3.5).unwrap()
    }

    #[test]
    fn too_few_values_is_an_error() {
        let err = detect(&[1.0, 2.0, 3.0], DetectionMethod::Iqr, 3.0, 3.5).unwrap_err();
        assert!(matches!(err, RefineError::InsufficientData { rows: 3, required: 4 }));
    }

    #[test]
    fn iqr_flags_single_spike() {
        // 19 values near 50, one at 1000.
        let mut values: Vec<f64> = (0..19).map(|i| 50.0 + (i % 5) as f64).collect();
        values.push(1000.0);

        let d = detect_with(&values, DetectionMethod::Iqr);
        assert_eq!(d.indices.into_iter().collect::<Vec<_>>(), vec![19]);

        let (lower, upper) = d.bounds.unwrap();
        assert!(lower <= upper);
        assert!(upper < 1000.0);
    }

    #[test]
    fn iqr_bounds_ordering_and_membership() {
        let values = [47.0, 49.0, 50.0, 50.5, 51.0, 52.0, 53.0, 120.0, 2.0];
        let d = detect_with(&values, DetectionMethod::Iqr);
        let (lower, upper) = d.bounds.unwrap();

        let q1 = crate::stats::percentile(&values, 25.0);
        let q3 = crate::stats::percentile(&values, 75.0);
        assert!(lower <= q1 && q1 <= q3 && q3 <= upper);

        for (i, &v) in values.iter().enumerate() {
            let outside = v < lower || v > upper;
            assert_eq!(outside, d.indices.contains(&i), "value {v} at {i}");
        }
    }

    #[test]
    fn iqr_fence_tie_is_inlier() {
        // Q1 = Q3 = 1, so both fences collapse to 1. The 1s sit exactly on
        // the fence and must not be flagged; only the strict exceedance is.
        let values = [1.0, 1.0, 1.0, 1.0, 5.0];
        let d = detect_with(&values, DetectionMethod::Iqr);
        assert_eq!(d.bounds, Some((1.0, 1.0)));
        assert_eq!(d.indices.into_iter().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn iqr_is_idempotent() {
        let values = [50.0, 51.0, 49.0, 48.0, 52.0, 200.0, 50.5];
        let first = detect_with(&values, DetectionMethod::Iqr);
        let second = detect_with(&values, DetectionMethod::Iqr);
        assert_eq!(first.indices, second.indices);
    }

    #[test]
    fn z_score_zero_std_is_empty_not_error() {
        let values = [50.0; 12];
        let d = detect_with(&values, DetectionMethod::ZScore);
        assert!(d.is_empty());
    }

    #[test]
    fn z_score_flags_extreme_value() {
        let mut values: Vec<f64> = (0..20).map(|i| 50.0 + (i % 3) as f64).collect();
        values.push(500.0);
        let d = detect_with(&values, DetectionMethod::ZScore);
        assert!(d.indices.contains(&20));
    }

    #[test]
    fn modified_z_zero_mad_is_empty() {
        // Majority identical values force MAD to zero despite the spike.
        let values = [50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 1000.0];
        let d = detect_with(&values, DetectionMethod::ModifiedZScore);
        assert!(d.is_empty());
    }

    #[test]
    fn modified_z_flags_spike() {
        let values = [48.0, 49.0, 50.0, 50.0, 51.0, 52.0, 49.5, 50.5, 300.0];
        let d = detect_with(&values, DetectionMethod::ModifiedZScore);
        assert_eq!(d.indices.into_iter().collect::<Vec<_>>(), vec![8]);
    }
}
