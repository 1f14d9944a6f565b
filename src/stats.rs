//! Small numeric helpers shared by scoring, analytics and the risk models

/// Round half away from zero toward positive infinity, matching the rounding
/// the index has always used (2.5 -> 3, -2.5 -> -2).
pub fn round_half_up(x: f64) -> f64 {
    let r = (x + 0.5).floor();
    // Avoid rendering "-0"
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Round to `dp` decimal places using half-up rounding
pub fn round_dp(x: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    round_half_up(x * factor) / factor
}

/// Replace NaN and infinities with `fallback`
pub fn finite_or(x: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). Zero when fewer than two values.
pub fn sample_sd(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Population standard deviation (n). Zero for an empty slice.
pub fn population_sd(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Median of the values, `None` for an empty slice
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
