use std::path::Path;
use std::time::Instant;

use anyhow::{ensure, Context, Result};

use crate::analysis::band::{select_band_with, BandPolicy, BandSelection};
use crate::analysis::filter::{
    filter_by_iqr_with_report, percent_removed, FilterReport, DEFAULT_IQR_MULTIPLIER,
};
use crate::analysis::quartile::QuartileMethod;
use crate::analysis::reduce::reduce_cube;
use crate::classify::{classify_pixels, clamped_targets};
use crate::data::loader;
use crate::data::model::PixelPrediction;
use crate::data::writer;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tunables shared by the reduce and select runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Tukey fence multiplier.
    pub multiplier: f64,
    pub quartile_method: QuartileMethod,
    pub band: BandPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_IQR_MULTIPLIER,
            quartile_method: QuartileMethod::default(),
            band: BandPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeInfo {
    pub rows: usize,
    pub cols: usize,
    pub bands: usize,
}

impl CubeInfo {
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }
}

pub fn cube_info(cube_path: &Path) -> Result<CubeInfo> {
    let cube = loader::load_cube(cube_path)?;
    let (rows, cols, bands) = cube.dim();
    Ok(CubeInfo { rows, cols, bands })
}

// ---------------------------------------------------------------------------
// reduce: cube -> per-pixel means -> Tukey-filtered means
// ---------------------------------------------------------------------------

/// Reduce every pixel of the cube to its mean, save the means, and
/// optionally save the Tukey-filtered subset.
pub fn run_reduce(
    cube_path: &Path,
    means_out: &Path,
    filtered_out: Option<&Path>,
    options: &PipelineOptions,
) -> Result<FilterReport> {
    let cube = loader::load_cube(cube_path)?;

    let start = Instant::now();
    let means = reduce_cube(&cube).context("reducing cube to per-pixel means")?;
    log::info!("reduced {} pixels in {:.2?}", means.len(), start.elapsed());
    writer::save_pixel_records(means_out, &means)?;

    let (filtered, report) =
        filter_by_iqr_with_report(&means, options.multiplier, options.quartile_method)
            .context("filtering per-pixel means")?;
    log::info!(
        "Q1 = {:.6}, Q3 = {:.6}, IQR = {:.6}, fences [{:.6}, {:.6}]",
        report.bounds.q1,
        report.bounds.q3,
        report.bounds.iqr,
        report.lower_fence,
        report.upper_fence
    );
    log::info!(
        "kept {} of {} pixels, {:.2}% of data removed",
        report.retained_len,
        report.original_len,
        report.percent_removed()
    );

    if let Some(path) = filtered_out {
        writer::save_pixel_records(path, &filtered)?;
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// summarize: compare a saved mean collection with its filtered subset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSummary {
    pub original_len: usize,
    pub filtered_len: usize,
}

impl FilterSummary {
    pub fn percent_removed(&self) -> f64 {
        percent_removed(self.original_len, self.filtered_len)
    }
}

pub fn summarize(means_path: &Path, filtered_path: &Path) -> Result<FilterSummary> {
    let original = loader::load_pixel_records(means_path)?;
    let filtered = loader::load_pixel_records(filtered_path)?;
    ensure!(
        filtered.len() <= original.len(),
        "{} has more records ({}) than {} ({})",
        filtered_path.display(),
        filtered.len(),
        means_path.display(),
        original.len()
    );
    let summary = FilterSummary {
        original_len: original.len(),
        filtered_len: filtered.len(),
    };
    log::info!(
        "original {} records, filtered {} records, {:.2}% of data removed",
        summary.original_len,
        summary.filtered_len,
        summary.percent_removed()
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// select: cube -> good pixels in the sigma band
// ---------------------------------------------------------------------------

pub fn run_select(
    cube_path: &Path,
    good_out: &Path,
    mask_out: Option<&Path>,
    policy: BandPolicy,
) -> Result<BandSelection> {
    let cube = loader::load_cube(cube_path)?;
    let selection = select_band_with(&cube, policy).context("selecting good pixels")?;
    log::info!(
        "mean = {:.6}, std = {:.6}, band [{:.6}, {:.6}]",
        selection.population_mean,
        selection.population_std,
        selection.lower,
        selection.upper
    );
    log::info!(
        "{} good pixels of {} ({:.2}%)",
        selection.good_count(),
        selection.total_count(),
        selection.percentage()
    );

    writer::save_good_pixels(good_out, &selection.good_pixels)?;
    if let Some(path) = mask_out {
        writer::save_mask(path, &selection.mask)?;
    }
    Ok(selection)
}

// ---------------------------------------------------------------------------
// classify: good pixels -> resampled spectra -> logistic model
// ---------------------------------------------------------------------------

/// Inputs of a classification run.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyPaths<'a> {
    pub good_pixels: &'a Path,
    /// Wavelength grid the good-pixel spectra were acquired on.
    pub wavelengths: &'a Path,
    pub model: &'a Path,
    /// Training table whose numeric headers replace the model's feature grid.
    pub training_csv: Option<&'a Path>,
    pub out: &'a Path,
}

pub fn run_classify(paths: ClassifyPaths<'_>, threshold: Option<f64>) -> Result<Vec<PixelPrediction>> {
    let pixels = loader::load_good_pixels(paths.good_pixels)?;
    let source = loader::load_wavelengths(paths.wavelengths)?;
    let mut model = loader::load_logistic_model(paths.model)?;

    if let Some(csv_path) = paths.training_csv {
        model.wavelengths = loader::load_training_wavelengths(csv_path)?;
        model
            .validate()
            .with_context(|| format!("model does not match training table {}", csv_path.display()))?;
    }
    if let Some(t) = threshold {
        ensure!((0.0..=1.0).contains(&t), "threshold {t} is outside [0, 1]");
        model = model.with_threshold(t);
    }
    log::info!(
        "classifying {} pixels: {} source bands -> {} model features",
        pixels.len(),
        source.len(),
        model.wavelengths.len()
    );

    let clamped = clamped_targets(&source, &model.wavelengths);
    if clamped > 0 {
        log::warn!(
            "{clamped} model wavelengths lie outside the source range {:?}; their features are clamped",
            source.range()
        );
    }

    let start = Instant::now();
    let predictions = classify_pixels(&pixels, &source, &model).context("classifying good pixels")?;
    let elapsed = start.elapsed();
    if !predictions.is_empty() {
        log::info!(
            "classified {} pixels in {:.2?} ({:.2?} per pixel)",
            predictions.len(),
            elapsed,
            elapsed / u32::try_from(predictions.len()).unwrap_or(u32::MAX)
        );
    }
    let plastic = predictions.iter().filter(|p| p.is_plastic).count();
    log::info!("{plastic} of {} pixels classified as plastic", predictions.len());

    writer::save_predictions(paths.out, &predictions)?;
    Ok(predictions)
}
