use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::interpolate::ResamplePlan;
use crate::data::model::{GoodPixelRecord, PixelPrediction, WavelengthGrid};
use crate::error::{HyperspecError, Result};

// ---------------------------------------------------------------------------
// SpectrumClassifier – the model seam
// ---------------------------------------------------------------------------

/// A pre-trained per-spectrum classifier.
///
/// Classifiers are usually trained on a different band layout than the
/// acquisition cube; `feature_grid` tells [`classify_pixels`] where to
/// resample each pixel spectrum before calling `predict`.
pub trait SpectrumClassifier: Sync {
    fn feature_grid(&self) -> &WavelengthGrid;

    /// `features` is aligned to [`SpectrumClassifier::feature_grid`].
    fn predict(&self, features: &[f64]) -> bool;
}

// ---------------------------------------------------------------------------
// LogisticModel
// ---------------------------------------------------------------------------

fn default_threshold() -> f64 {
    0.5
}

/// Binary logistic-regression weights exported from a trained model.
///
/// ```json
/// { "wavelengths": [1650.0, 1652.0], "coefficients": [0.8, -1.2], "intercept": 0.1 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub wavelengths: WavelengthGrid,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Positive when the probability is strictly above this value.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticModel {
    pub fn new(wavelengths: WavelengthGrid, coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = LogisticModel {
            wavelengths,
            coefficients,
            intercept,
            threshold: default_threshold(),
        };
        model.validate()?;
        Ok(model)
    }

    /// One coefficient per feature wavelength.
    pub fn validate(&self) -> Result<()> {
        if self.coefficients.len() != self.wavelengths.len() {
            return Err(HyperspecError::shape(
                format!("{} coefficients (one per wavelength)", self.wavelengths.len()),
                format!("{} coefficients", self.coefficients.len()),
            ));
        }
        Ok(())
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// `intercept + w · x`.
    pub fn decision(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    /// Logistic probability of the positive class.
    pub fn probability(&self, features: &[f64]) -> f64 {
        1.0 / (1.0 + (-self.decision(features)).exp())
    }
}

impl SpectrumClassifier for LogisticModel {
    fn feature_grid(&self) -> &WavelengthGrid {
        &self.wavelengths
    }

    fn predict(&self, features: &[f64]) -> bool {
        // NaN probability compares false -> negative
        self.probability(features) > self.threshold
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Number of `target` wavelengths outside the span of `source`, which
/// resampling can only fill by clamping to an end value.
pub fn clamped_targets(source: &WavelengthGrid, target: &WavelengthGrid) -> usize {
    match source.range() {
        Some((lo, hi)) => target
            .as_slice()
            .iter()
            .filter(|&&t| t < lo || t > hi)
            .count(),
        None => target.len(),
    }
}

/// Resample every good pixel from `source` onto the classifier's grid and
/// classify it. Output order and pixel identity follow `pixels`.
pub fn classify_pixels<C: SpectrumClassifier>(
    pixels: &[GoodPixelRecord],
    source: &WavelengthGrid,
    classifier: &C,
) -> Result<Vec<PixelPrediction>> {
    let plan = ResamplePlan::new(source, classifier.feature_grid())?;
    pixels
        .par_iter()
        .map(|p| {
            let features = plan.apply(&p.spectrum)?;
            Ok(PixelPrediction {
                row: p.row,
                column: p.col,
                is_plastic: classifier.predict(&features),
            })
        })
        .collect()
}
