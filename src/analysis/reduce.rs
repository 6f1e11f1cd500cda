use ndarray::Array2;
use rayon::prelude::*;

use crate::data::model::{PixelRecord, SpectralCube};
use crate::error::{HyperspecError, Result};

/// Mean of one spectrum: plain sum divided by count. NaN/Inf propagate.
#[inline]
pub fn spectrum_mean(spectrum: &[f64]) -> f64 {
    let total: f64 = spectrum.iter().sum();
    total / spectrum.len() as f64
}

/// Per-pixel means in row-major order (row outer, column inner).
fn pixel_means(cube: &SpectralCube) -> Result<Vec<f64>> {
    let bands = cube.bands();
    if bands == 0 {
        return Err(HyperspecError::DegenerateSpectrum);
    }
    // Indexed parallel iterator: `collect` keeps chunk order.
    Ok(cube
        .as_slice()
        .par_chunks_exact(bands)
        .map(spectrum_mean)
        .collect())
}

/// Reduce every pixel of `cube` to its mean value.
///
/// Returns exactly `rows * cols` records in row-major order.
pub fn reduce_cube(cube: &SpectralCube) -> Result<Vec<PixelRecord>> {
    let cols = cube.cols();
    let means = pixel_means(cube)?;
    log::debug!(
        "reduced {} pixels over {} bands",
        means.len(),
        cube.bands()
    );
    Ok(means
        .into_iter()
        .enumerate()
        .map(|(i, value)| PixelRecord::new(i / cols, i % cols, value))
        .collect())
}

/// The same means as [`reduce_cube`], laid out as a `(rows, cols)` grid.
pub fn mean_grid(cube: &SpectralCube) -> Result<Array2<f64>> {
    let means = pixel_means(cube)?;
    Array2::from_shape_vec((cube.rows(), cube.cols()), means).map_err(|e| {
        HyperspecError::shape(
            format!("({}, {}) mean grid", cube.rows(), cube.cols()),
            e.to_string(),
        )
    })
}
