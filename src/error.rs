use thiserror::Error;

// ---------------------------------------------------------------------------
// RefineError – failure taxonomy for the reduction core
// ---------------------------------------------------------------------------

/// Errors produced by validation, detection, and configuration.
///
/// Degenerate statistics (zero std, zero MAD) are *not* errors: the
/// detectors resolve them to an empty outlier set so the controller can fall
/// through to minimum-value removal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefineError {
    /// Too few rows for the requested operation.
    #[error("insufficient data: {rows} rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    /// A thickness value is NaN or infinite.
    #[error("invalid thickness at row {row}: {value}")]
    InvalidValue { row: usize, value: f64 },

    /// A sample lies outside the configured wafer radius.
    #[error("sample at row {row} ({x:.2}, {y:.2}) outside wafer radius {radius:.2}")]
    OutOfRange { row: usize, x: f64, y: f64, radius: f64 },

    /// Invalid option value at construction. Never silently clamped.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}
