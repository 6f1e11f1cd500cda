use std::fmt;

use ndarray::{Array3, ArrayD, Ix3};
use serde::{Deserialize, Serialize};

use crate::error::{HyperspecError, Result};

// ---------------------------------------------------------------------------
// PixelRecord – one scalar summary per spatial pixel
// ---------------------------------------------------------------------------

/// A per-pixel scalar summary (typically the mean absorbance) tagged with the
/// pixel's position in the source grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRecord {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

impl PixelRecord {
    pub fn new(row: usize, col: usize, value: f64) -> Self {
        PixelRecord { row, col, value }
    }
}

impl fmt::Display for PixelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) = {:.4}", self.row, self.col, self.value)
    }
}

// ---------------------------------------------------------------------------
// GoodPixelRecord – a selected pixel carrying its full spectrum
// ---------------------------------------------------------------------------

/// A pixel that passed band selection. `spectrum` has one value per band of
/// the source cube, aligned to the cube's wavelength grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodPixelRecord {
    pub row: usize,
    pub col: usize,
    pub spectrum: Vec<f64>,
}

// ---------------------------------------------------------------------------
// PixelPrediction – classifier output for one pixel
// ---------------------------------------------------------------------------

/// Classification result for a single pixel. Column names match the
/// `row,column,is_plastic` CSV layout downstream tools expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPrediction {
    pub row: usize,
    pub column: usize,
    pub is_plastic: bool,
}

// ---------------------------------------------------------------------------
// QuartileBounds
// ---------------------------------------------------------------------------

/// First and third quartile of a population plus their spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuartileBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl QuartileBounds {
    pub fn new(q1: f64, q3: f64) -> Self {
        QuartileBounds { q1, q3, iqr: q3 - q1 }
    }

    /// Tukey fences `(q1 - m*iqr, q3 + m*iqr)`.
    pub fn fences(&self, multiplier: f64) -> (f64, f64) {
        (
            self.q1 - multiplier * self.iqr,
            self.q3 + multiplier * self.iqr,
        )
    }
}

// ---------------------------------------------------------------------------
// SpectralCube – the (row, col, band) input array
// ---------------------------------------------------------------------------

/// Immutable hyperspectral cube with axes `(row, col, band)`.
///
/// Values are held contiguously in row-major order, so the spectrum of pixel
/// `(r, c)` is the slice `[(r * cols + c) * bands .. + bands]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralCube {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
    bands: usize,
}

impl SpectralCube {
    /// Wrap an owned 3-D array. Any memory layout is accepted.
    pub fn new(data: Array3<f64>) -> Self {
        let (rows, cols, bands) = data.dim();
        // `iter` walks in logical (row-major) order regardless of strides.
        let values = data.iter().copied().collect();
        SpectralCube {
            values,
            rows,
            cols,
            bands,
        }
    }

    /// Build a cube from a dynamically-dimensioned array; anything that is
    /// not rank 3 is rejected.
    pub fn from_dyn(data: ArrayD<f64>) -> Result<Self> {
        let shape = data.shape().to_vec();
        data.into_dimensionality::<Ix3>()
            .map(SpectralCube::new)
            .map_err(|_| {
                HyperspecError::shape(
                    "3-D array (rows, cols, bands)",
                    format!("{}-D array with shape {shape:?}", shape.len()),
                )
            })
    }

    /// Build a cube from a flat row-major buffer.
    pub fn from_shape_vec(rows: usize, cols: usize, bands: usize, values: Vec<f64>) -> Result<Self> {
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(bands))
            .ok_or_else(|| {
                HyperspecError::shape(
                    "a shape whose element count fits in usize",
                    format!("({rows}, {cols}, {bands})"),
                )
            })?;
        if values.len() != expected {
            return Err(HyperspecError::shape(
                format!("{expected} values for shape ({rows}, {cols}, {bands})"),
                format!("{} values", values.len()),
            ));
        }
        Ok(SpectralCube {
            values,
            rows,
            cols,
            bands,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// `(rows, cols, bands)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.bands)
    }

    /// Number of spatial pixels.
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// The flat row-major value buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Spectrum of a single pixel, or `None` when out of bounds.
    pub fn spectrum(&self, row: usize, col: usize) -> Option<&[f64]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let start = (row * self.cols + col) * self.bands;
        self.values.get(start..start + self.bands)
    }

    /// Copy the cube back into an `ndarray` array.
    pub fn to_array(&self) -> Array3<f64> {
        Array3::from_shape_fn(self.dim(), |(r, c, b)| {
            self.values[(r * self.cols + c) * self.bands + b]
        })
    }
}

// ---------------------------------------------------------------------------
// WavelengthGrid – validated spectral axis
// ---------------------------------------------------------------------------

/// Ordered wavelength (or wavenumber) axis.
///
/// Construction checks that the values are finite and strictly monotonic,
/// either increasing or decreasing. Deserialization goes through the same
/// check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WavelengthGrid {
    values: Vec<f64>,
}

impl WavelengthGrid {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        validate_monotonic(&values)?;
        Ok(WavelengthGrid { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// `true` when the grid is increasing (a single-point grid counts as increasing).
    pub fn is_ascending(&self) -> bool {
        match self.values.as_slice() {
            [first, second, ..] => first < second,
            _ => true,
        }
    }

    /// Smallest and largest wavelength, or `None` for an empty grid.
    pub fn range(&self) -> Option<(f64, f64)> {
        let first = *self.values.first()?;
        let last = *self.values.last()?;
        Some(if first <= last { (first, last) } else { (last, first) })
    }
}

impl TryFrom<Vec<f64>> for WavelengthGrid {
    type Error = HyperspecError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        WavelengthGrid::new(values)
    }
}

impl From<WavelengthGrid> for Vec<f64> {
    fn from(grid: WavelengthGrid) -> Self {
        grid.values
    }
}

fn validate_monotonic(values: &[f64]) -> Result<()> {
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(HyperspecError::NonMonotonicGrid {
            index,
            previous: if index > 0 { values[index - 1] } else { values[index] },
            current: values[index],
        });
    }
    let ascending = match values {
        [first, second, ..] => first < second,
        _ => return Ok(()),
    };
    for (i, pair) in values.windows(2).enumerate() {
        let ok = if ascending {
            pair[0] < pair[1]
        } else {
            pair[0] > pair[1]
        };
        if !ok {
            return Err(HyperspecError::NonMonotonicGrid {
                index: i + 1,
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}
