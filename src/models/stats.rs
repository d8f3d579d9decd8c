//! Closed-form statistics over hour samples.
//!
//! Pure, stateless functions with no knowledge of features or time entries.
//! All functions reject empty input with `Error::EmptyInput` instead of
//! dividing by zero; callers that want a fallback (the seed path) handle
//! that branch themselves.

use crate::{Error, Result};

/// Arithmetic mean: sum / count.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput("mean requires at least one value".to_string()));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median: middle element of the sorted values, or the average of the two
/// middle elements for even counts.
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput(
            "median requires at least one value".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Linear-interpolation percentile.
///
/// Uses the standard "linear" method: rank = p/100 × (n−1), interpolating
/// between the floor and ceil ranks. `p` must be within 0..=100.
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput(
            "percentile requires at least one value".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&p) || !p.is_finite() {
        return Err(Error::Computation(format!(
            "percentile must be within 0..=100, got {}",
            p
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Ok(sorted[lower]);
    }

    let weight = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Population standard deviation (divide by n, not n−1).
///
/// The population form is deterministic for the single-observation samples
/// common in this domain, where the sample form would divide by zero.
pub fn std_dev(values: &[f64]) -> Result<f64> {
    let avg = mean(values)?;
    let variance = values
        .iter()
        .map(|v| {
            let d = v - avg;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    Ok(variance.sqrt())
}
