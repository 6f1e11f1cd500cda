//! Mean/standard-deviation band selection.
//!
//! Unlike the Tukey filter, which discards both tails symmetrically, the
//! default band `[mu + sigma, mu + 2 sigma]` keeps only pixels whose mean is
//! *above* the population mean. A pixel with an ordinary mean may simply have
//! averaged out noise; a higher-than-average mean is more likely to come from
//! real absorbance by the sample, which makes these pixels the preferred
//! candidates for spectral inspection and classification.

use ndarray::{Array2, Zip};

use super::reduce::mean_grid;
use crate::data::model::{GoodPixelRecord, SpectralCube};
use crate::error::{HyperspecError, Result};

// ---------------------------------------------------------------------------
// BandPolicy
// ---------------------------------------------------------------------------

/// Band edges expressed as multiples of the population standard deviation
/// above the population mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPolicy {
    pub lower_sigma: f64,
    pub upper_sigma: f64,
}

impl Default for BandPolicy {
    fn default() -> Self {
        BandPolicy {
            lower_sigma: 1.0,
            upper_sigma: 2.0,
        }
    }
}

impl BandPolicy {
    fn validate(&self) -> Result<()> {
        let finite = self.lower_sigma.is_finite() && self.upper_sigma.is_finite();
        if finite && self.lower_sigma <= self.upper_sigma {
            Ok(())
        } else {
            Err(HyperspecError::InvalidBandPolicy {
                lower: self.lower_sigma,
                upper: self.upper_sigma,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// BandSelection
// ---------------------------------------------------------------------------

/// Result of a band-selection pass over a cube.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSelection {
    /// `true` for every good pixel, shape `(rows, cols)`.
    pub mask: Array2<bool>,
    /// Good pixels in row-major order, each with its full spectrum.
    pub good_pixels: Vec<GoodPixelRecord>,
    pub population_mean: f64,
    /// Population standard deviation (denominator N).
    pub population_std: f64,
    pub lower: f64,
    pub upper: f64,
}

impl BandSelection {
    pub fn good_count(&self) -> usize {
        self.good_pixels.len()
    }

    pub fn total_count(&self) -> usize {
        self.mask.len()
    }

    /// Share of good pixels in percent.
    pub fn percentage(&self) -> f64 {
        if self.total_count() == 0 {
            return 0.0;
        }
        self.good_count() as f64 / self.total_count() as f64 * 100.0
    }
}

/// Population mean and standard deviation (denominator N) of a non-empty set.
pub fn population_mean_std(values: &[f64]) -> Result<(f64, f64)> {
    if values.is_empty() {
        return Err(HyperspecError::EmptyPopulation);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Ok((mean, variance.sqrt()))
}

/// Select the pixels whose mean lies in `[mu + sigma, mu + 2 sigma]`.
pub fn select_band(cube: &SpectralCube) -> Result<BandSelection> {
    select_band_with(cube, BandPolicy::default())
}

/// Band selection with explicit sigma multipliers.
pub fn select_band_with(cube: &SpectralCube, policy: BandPolicy) -> Result<BandSelection> {
    policy.validate()?;
    let means = mean_grid(cube)?;
    let (mean, std) = population_mean_std(means.as_slice().unwrap_or_default())?;
    let lower = mean + policy.lower_sigma * std;
    let upper = mean + policy.upper_sigma * std;

    let mut mask = Array2::from_elem(means.dim(), false);
    Zip::from(&mut mask)
        .and(&means)
        .par_for_each(|m, &v| *m = lower <= v && v <= upper);

    let good_pixels: Vec<GoodPixelRecord> = mask
        .indexed_iter()
        .filter(|(_, &good)| good)
        .filter_map(|((row, col), _)| {
            cube.spectrum(row, col).map(|s| GoodPixelRecord {
                row,
                col,
                spectrum: s.to_vec(),
            })
        })
        .collect();

    log::debug!(
        "band [{lower}, {upper}] (mu={mean}, sigma={std}) kept {}/{} pixels",
        good_pixels.len(),
        mask.len()
    );

    Ok(BandSelection {
        mask,
        good_pixels,
        population_mean: mean,
        population_std: std,
        lower,
        upper,
    })
}
