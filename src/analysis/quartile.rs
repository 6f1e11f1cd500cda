use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::model::QuartileBounds;
use crate::error::{HyperspecError, Result};

// ---------------------------------------------------------------------------
// Quartile method
// ---------------------------------------------------------------------------

/// How Q1 and Q3 are derived from a sorted population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum QuartileMethod {
    /// Median of the lower and upper halves; for odd N the middle element
    /// belongs to neither half. This is the reference method.
    #[default]
    SplitMedian,
    /// 25th / 75th percentile with linear interpolation at rank `p * (N - 1)`.
    LinearPercentile,
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Estimate quartiles with the split-median method.
///
/// NaN values are left out of the population. An empty input is an
/// [`HyperspecError::EmptyPopulation`]; an input made only of NaN yields NaN
/// quartiles, whose fences retain nothing.
pub fn estimate_quartiles(values: &[f64]) -> Result<QuartileBounds> {
    estimate_quartiles_with(values, QuartileMethod::SplitMedian)
}

pub fn estimate_quartiles_with(values: &[f64], method: QuartileMethod) -> Result<QuartileBounds> {
    if values.is_empty() {
        return Err(HyperspecError::EmptyPopulation);
    }
    let sorted = sorted_population(values);
    if sorted.is_empty() {
        log::debug!("quartiles over {} values, all NaN", values.len());
        return Ok(QuartileBounds::new(f64::NAN, f64::NAN));
    }
    let bounds = match method {
        QuartileMethod::SplitMedian => split_median_quartiles(&sorted),
        QuartileMethod::LinearPercentile => QuartileBounds::new(
            linear_percentile(&sorted, 25.0),
            linear_percentile(&sorted, 75.0),
        ),
    };
    log::debug!(
        "quartiles over {} values ({method:?}): q1={} q3={} iqr={}",
        sorted.len(),
        bounds.q1,
        bounds.q3,
        bounds.iqr
    );
    Ok(bounds)
}

/// Ascending copy of `values` without NaN. The caller's slice is untouched.
fn sorted_population(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted
}

fn split_median_quartiles(sorted: &[f64]) -> QuartileBounds {
    let n = sorted.len();
    // A single value has two empty halves; both quartiles collapse onto it.
    if n == 1 {
        return QuartileBounds::new(sorted[0], sorted[0]);
    }
    let mid = n / 2;
    let lower = &sorted[..mid];
    let upper = if n % 2 == 0 {
        &sorted[mid..]
    } else {
        &sorted[mid + 1..]
    };
    QuartileBounds::new(median_of_sorted(lower), median_of_sorted(upper))
}

/// Median of a non-empty sorted slice.
fn median_of_sorted(values: &[f64]) -> f64 {
    let m = values.len();
    let mid = m / 2;
    if m % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn linear_percentile(sorted: &[f64], percent: f64) -> f64 {
    let rank = percent / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
