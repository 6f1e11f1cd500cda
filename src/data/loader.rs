use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type, UInt32Type, UInt64Type};
use arrow::record_batch::RecordBatch;
use ndarray::{ArrayD, Ix1};
use ndarray_npy::ReadNpyExt;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{GoodPixelRecord, PixelRecord, SpectralCube, WavelengthGrid};
use crate::classify::LogisticModel;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Load a hyperspectral cube. Only `.npy` arrays of shape
/// `(rows, cols, bands)` are supported; `f32` data is widened to `f64`.
pub fn load_cube(path: &Path) -> Result<SpectralCube> {
    match extension(path).as_str() {
        "npy" => {
            let array = read_npy_f64(path)?;
            let cube = SpectralCube::from_dyn(array)
                .with_context(|| format!("{} is not a spectral cube", path.display()))?;
            log::info!(
                "loaded cube {} with shape {:?} ({} pixels)",
                path.display(),
                cube.dim(),
                cube.pixel_count()
            );
            Ok(cube)
        }
        other => bail!("Unsupported cube file extension: .{other}"),
    }
}

/// Load a wavelength (wavenumber) grid.
///
/// Supported formats:
/// * `.npy`  – 1-D array
/// * `.json` – `[900.0, 902.5, ...]`
/// * `.csv`  – one value per line, optional header line
pub fn load_wavelengths(path: &Path) -> Result<WavelengthGrid> {
    let values = match extension(path).as_str() {
        "npy" => read_npy_f64(path)?
            .into_dimensionality::<Ix1>()
            .with_context(|| format!("{}: wavelength array must be 1-D", path.display()))?
            .to_vec(),
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            serde_json::from_str::<Vec<f64>>(&text).context("parsing wavelength JSON array")?
        }
        "csv" => load_wavelength_column(path)?,
        other => bail!("Unsupported wavelength file extension: .{other}"),
    };
    let grid = WavelengthGrid::new(values)
        .with_context(|| format!("validating wavelength grid from {}", path.display()))?;
    log::debug!("loaded {} wavelengths from {}", grid.len(), path.display());
    Ok(grid)
}

/// Wavelength grid taken from the header of a training table: every column
/// whose name is made of digits and dots (e.g. `1650.5`) is a feature
/// wavelength, kept in header order.
pub fn load_training_wavelengths(path: &Path) -> Result<WavelengthGrid> {
    let mut reader = csv::Reader::from_path(path).context("opening training CSV")?;
    let headers = reader.headers().context("reading CSV headers")?;
    let values: Vec<f64> = headers
        .iter()
        .filter(|h| is_wavelength_header(h))
        .map(|h| {
            h.parse::<f64>()
                .with_context(|| format!("header '{h}' is not a number"))
        })
        .collect::<Result<_>>()?;
    if values.is_empty() {
        bail!("{}: no numeric wavelength columns in header", path.display());
    }
    WavelengthGrid::new(values)
        .with_context(|| format!("validating training wavelengths from {}", path.display()))
}

fn is_wavelength_header(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Load a collection of per-pixel scalar records.
///
/// Supported formats:
/// * `.csv`     – header `row,col,value`
/// * `.json`    – `[{ "row": 0, "col": 0, "value": 0.12 }, ...]`
/// * `.parquet` – integer `row` / `col` columns and a float `value` column
pub fn load_pixel_records(path: &Path) -> Result<Vec<PixelRecord>> {
    let records = match extension(path).as_str() {
        "csv" => load_records_csv(path)?,
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            serde_json::from_str(&text).context("parsing pixel records JSON")?
        }
        "parquet" | "pq" => load_records_parquet(path)?,
        other => bail!("Unsupported pixel record file extension: .{other}"),
    };
    log::debug!("loaded {} pixel records from {}", records.len(), path.display());
    Ok(records)
}

/// Load good-pixel records (position plus full spectrum).
///
/// Supported formats:
/// * `.json`    – `[{ "row": 3, "col": 7, "spectrum": [...] }, ...]`
/// * `.parquet` – `row`, `col` and a `spectrum` list column
pub fn load_good_pixels(path: &Path) -> Result<Vec<GoodPixelRecord>> {
    let pixels = match extension(path).as_str() {
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            serde_json::from_str(&text).context("parsing good pixel JSON")?
        }
        "parquet" | "pq" => load_good_pixels_parquet(path)?,
        other => bail!("Unsupported good pixel file extension: .{other}"),
    };
    log::debug!("loaded {} good pixels from {}", pixels.len(), path.display());
    Ok(pixels)
}

/// Load pre-trained logistic-regression weights from `.json`.
pub fn load_logistic_model(path: &Path) -> Result<LogisticModel> {
    let model: LogisticModel = match extension(path).as_str() {
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            serde_json::from_str(&text).context("parsing logistic model JSON")?
        }
        other => bail!("Unsupported model file extension: .{other}"),
    };
    model
        .validate()
        .with_context(|| format!("validating model from {}", path.display()))?;
    log::debug!(
        "loaded logistic model with {} features from {}",
        model.coefficients.len(),
        path.display()
    );
    Ok(model)
}

// ---------------------------------------------------------------------------
// NPY helpers
// ---------------------------------------------------------------------------

/// Read an `.npy` file as `f64`, falling back to `f32` storage.
fn read_npy_f64(path: &Path) -> Result<ArrayD<f64>> {
    let open = || File::open(path).with_context(|| format!("opening {}", path.display()));
    match ArrayD::<f64>::read_npy(open()?) {
        Ok(array) => Ok(array),
        Err(f64_err) => match ArrayD::<f32>::read_npy(open()?) {
            Ok(array) => Ok(array.mapv(f64::from)),
            Err(_) => Err(f64_err)
                .with_context(|| format!("reading {} as an f64/f32 .npy array", path.display())),
        },
    }
}

// ---------------------------------------------------------------------------
// CSV loaders
// ---------------------------------------------------------------------------

fn load_records_csv(path: &Path) -> Result<Vec<PixelRecord>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    reader
        .deserialize::<PixelRecord>()
        .enumerate()
        .map(|(row_no, result)| result.with_context(|| format!("CSV row {row_no}")))
        .collect()
}

fn load_wavelength_column(path: &Path) -> Result<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context("opening CSV")?;
    let mut values = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = record.get(0).unwrap_or("").trim();
        match cell.parse::<f64>() {
            Ok(v) => values.push(v),
            // a single leading header line is allowed
            Err(_) if row_no == 0 => continue,
            Err(_) => bail!("CSV row {row_no}: '{cell}' is not a number"),
        }
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Parquet loaders
// ---------------------------------------------------------------------------

fn read_parquet_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;
    reader
        .map(|batch| batch.context("reading parquet record batch"))
        .collect()
}

fn load_records_parquet(path: &Path) -> Result<Vec<PixelRecord>> {
    let mut records = Vec::new();
    for batch in read_parquet_batches(path)? {
        let rows = index_column(&batch, "row")?;
        let cols = index_column(&batch, "col")?;
        let values = float_column(&batch, "value")?;
        records.extend(
            rows.into_iter()
                .zip(cols)
                .zip(values)
                .map(|((row, col), value)| PixelRecord { row, col, value }),
        );
    }
    Ok(records)
}

fn load_good_pixels_parquet(path: &Path) -> Result<Vec<GoodPixelRecord>> {
    let mut pixels = Vec::new();
    for batch in read_parquet_batches(path)? {
        let rows = index_column(&batch, "row")?;
        let cols = index_column(&batch, "col")?;
        let spectra = batch
            .column_by_name("spectrum")
            .context("Parquet file missing 'spectrum' column")?;
        for (i, (row, col)) in rows.into_iter().zip(cols).enumerate() {
            let spectrum = extract_f64_list(spectra, i)
                .with_context(|| format!("Row {i}: failed to read 'spectrum'"))?;
            pixels.push(GoodPixelRecord { row, col, spectrum });
        }
    }
    Ok(pixels)
}

// -- Parquet / Arrow helpers --

/// Read a non-null integer column as pixel indices.
fn index_column(batch: &RecordBatch, name: &str) -> Result<Vec<usize>> {
    let col = batch
        .column_by_name(name)
        .with_context(|| format!("Parquet file missing '{name}' column"))?;
    if col.null_count() > 0 {
        bail!("column '{name}' contains nulls");
    }
    let to_index = |v: i64| {
        usize::try_from(v).with_context(|| format!("column '{name}': negative index {v}"))
    };
    match col.data_type() {
        DataType::UInt64 => Ok(col
            .as_primitive::<UInt64Type>()
            .values()
            .iter()
            .map(|&v| v as usize)
            .collect()),
        DataType::UInt32 => Ok(col
            .as_primitive::<UInt32Type>()
            .values()
            .iter()
            .map(|&v| v as usize)
            .collect()),
        DataType::Int64 => col
            .as_primitive::<Int64Type>()
            .values()
            .iter()
            .map(|&v| to_index(v))
            .collect(),
        DataType::Int32 => col
            .as_primitive::<Int32Type>()
            .values()
            .iter()
            .map(|&v| to_index(v as i64))
            .collect(),
        other => bail!("column '{name}': expected an integer type, got {other:?}"),
    }
}

/// Read a float column; nulls become NaN.
fn float_column(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let col = batch
        .column_by_name(name)
        .with_context(|| format!("Parquet file missing '{name}' column"))?;
    match col.data_type() {
        DataType::Float64 => Ok(col
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()),
        DataType::Float32 => Ok(col
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect()),
        other => bail!("column '{name}': expected Float64 or Float32, got {other:?}"),
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wavelength_header_detection() {
        assert!(is_wavelength_header("1650.5"));
        assert!(is_wavelength_header("4000"));
        assert!(!is_wavelength_header("plastic_or_not"));
        assert!(!is_wavelength_header("."));
        assert!(!is_wavelength_header("-12"));
        assert!(!is_wavelength_header(""));
    }

    #[test]
    fn test_unsupported_extensions() {
        assert!(load_cube(Path::new("cube.hdr")).is_err());
        assert!(load_wavelengths(Path::new("grid.txt")).is_err());
        assert!(load_pixel_records(Path::new("means.npy")).is_err());
        assert!(load_good_pixels(Path::new("good.csv")).is_err());
        assert!(load_logistic_model(Path::new("model.pkl")).is_err());
    }
}
