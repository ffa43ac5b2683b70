// ---------------------------------------------------------------------------
// Thickness statistics
// ---------------------------------------------------------------------------

/// Summary statistics over a thickness column.
///
/// `uniformity` is the range-over-mean figure the downstream simulation is
/// judged against: `(max - min) / mean * 100`, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThicknessSummary {
    pub count: usize,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (ddof = 1); 0.0 below two values.
    pub std_dev: f64,
    pub uniformity: f64,
}

impl ThicknessSummary {
    fn empty() -> Self {
        ThicknessSummary {
            count: 0,
            max: 0.0,
            min: 0.0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            uniformity: 0.0,
        }
    }
}

/// Summarize a value array. An empty input yields an all-zero summary.
pub fn summarize(values: &[f64]) -> ThicknessSummary {
    if values.is_empty() {
        return ThicknessSummary::empty();
    }

    let n = values.len();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    let mean = sum / n as f64;

    let std_dev = if n < 2 {
        0.0
    } else {
        let ss: f64 = values.iter().map(|&v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    };

    let uniformity = if mean == 0.0 {
        0.0
    } else {
        (max - min) / mean * 100.0
    };

    ThicknessSummary {
        count: n,
        max,
        min,
        mean,
        median: median(values),
        std_dev,
        uniformity,
    }
}

/// Median via the percentile rule below.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Linearly-interpolated percentile (the numpy default): for quantile `q`
/// over a sorted copy, the value at fractional rank `q/100 * (n - 1)`.
///
/// Returns 0.0 for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Median absolute deviation from the median.
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|&v| (v - med).abs()).collect();
    median(&deviations)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
