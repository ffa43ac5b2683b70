use super::model::WaferDataset;
use crate::error::RefineError;

// ---------------------------------------------------------------------------
// Data quality validator
// ---------------------------------------------------------------------------

/// Pre-flight checks run before the first round and defensively before every
/// detection call. Short-circuits in priority order:
///
/// 1. row count ≥ `min_data_points`
/// 2. thickness column free of NaN / infinities
/// 3. every coordinate within `wafer_radius` of the center
///
/// Never mutates the dataset.
pub fn validate(
    dataset: &WaferDataset,
    min_data_points: usize,
    wafer_radius: f64,
) -> Result<(), RefineError> {
    if dataset.len() < min_data_points {
        return Err(RefineError::InsufficientData {
            rows: dataset.len(),
            required: min_data_points,
        });
    }

    for (row, sample) in dataset.samples.iter().enumerate() {
        if !sample.thickness.is_finite() {
            return Err(RefineError::InvalidValue {
                row,
                value: sample.thickness,
            });
        }
    }

    for (row, sample) in dataset.samples.iter().enumerate() {
        if sample.radius() > wafer_radius {
            return Err(RefineError::OutOfRange {
                row,
                x: sample.x,
                y: sample.y,
                radius: wafer_radius,
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
