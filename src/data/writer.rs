use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Float64Builder, ListBuilder, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ndarray::Array2;
use ndarray_npy::WriteNpyExt;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use super::model::{GoodPixelRecord, PixelPrediction, PixelRecord, SpectralCube, WavelengthGrid};

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Record collections
// ---------------------------------------------------------------------------

/// Save per-pixel scalar records. Dispatch by extension: `.csv`, `.json`,
/// `.parquet`. The record order is written as-is.
pub fn save_pixel_records(path: &Path, records: &[PixelRecord]) -> Result<()> {
    match extension(path).as_str() {
        "csv" => write_csv(path, records)?,
        "json" => {
            if let Some(bad) = records.iter().find(|r| !r.value.is_finite()) {
                bail!("JSON cannot hold the non-finite value at {bad}; write .csv or .parquet instead");
            }
            write_json(path, records)?
        }
        "parquet" | "pq" => write_records_parquet(path, records)?,
        other => bail!("Unsupported pixel record file extension: .{other}"),
    }
    log::info!("saved {} pixel records to {}", records.len(), path.display());
    Ok(())
}

/// Save good-pixel records: `.json` or `.parquet`.
pub fn save_good_pixels(path: &Path, pixels: &[GoodPixelRecord]) -> Result<()> {
    match extension(path).as_str() {
        "json" => {
            let non_finite = pixels
                .iter()
                .find(|p| p.spectrum.iter().any(|v| !v.is_finite()));
            if let Some(p) = non_finite {
                bail!(
                    "JSON cannot hold the non-finite spectrum of pixel ({}, {}); write .parquet instead",
                    p.row,
                    p.col
                );
            }
            write_json(path, pixels)?
        }
        "parquet" | "pq" => write_good_pixels_parquet(path, pixels)?,
        other => bail!("Unsupported good pixel file extension: .{other}"),
    }
    log::info!("saved {} good pixels to {}", pixels.len(), path.display());
    Ok(())
}

/// Save classifier output as `row,column,is_plastic` CSV.
pub fn save_predictions(path: &Path, predictions: &[PixelPrediction]) -> Result<()> {
    match extension(path).as_str() {
        "csv" => write_csv(path, predictions)?,
        other => bail!("Unsupported prediction file extension: .{other}"),
    }
    log::info!("saved {} predictions to {}", predictions.len(), path.display());
    Ok(())
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for (i, row) in rows.iter().enumerate() {
        writer
            .serialize(row)
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path).context("creating JSON file")?);
    serde_json::to_writer(&mut writer, value).context("writing JSON")?;
    writer.flush().context("flushing JSON file")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet writers
// ---------------------------------------------------------------------------

fn index_array(values: impl Iterator<Item = usize>) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(values.map(|v| v as u64)))
}

fn write_batch(path: &Path, batch: RecordBatch) -> Result<()> {
    let file = File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn write_records_parquet(path: &Path, records: &[PixelRecord]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("row", DataType::UInt64, false),
        Field::new("col", DataType::UInt64, false),
        Field::new("value", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            index_array(records.iter().map(|r| r.row)),
            index_array(records.iter().map(|r| r.col)),
            Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.value))),
        ],
    )
    .context("building pixel record batch")?;
    write_batch(path, batch)
}

fn write_good_pixels_parquet(path: &Path, pixels: &[GoodPixelRecord]) -> Result<()> {
    let mut spectra = ListBuilder::new(Float64Builder::new());
    for p in pixels {
        spectra.values().append_slice(&p.spectrum);
        spectra.append(true);
    }
    let schema = Arc::new(Schema::new(vec![
        Field::new("row", DataType::UInt64, false),
        Field::new("col", DataType::UInt64, false),
        Field::new(
            "spectrum",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            index_array(pixels.iter().map(|p| p.row)),
            index_array(pixels.iter().map(|p| p.col)),
            Arc::new(spectra.finish()),
        ],
    )
    .context("building good pixel batch")?;
    write_batch(path, batch)
}

// ---------------------------------------------------------------------------
// NPY writers
// ---------------------------------------------------------------------------

fn create_buffered(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Save the band-selection mask as a 2-D boolean `.npy` array.
pub fn save_mask(path: &Path, mask: &Array2<bool>) -> Result<()> {
    let mut writer = create_buffered(path)?;
    mask.write_npy(&mut writer).context("writing mask .npy")?;
    writer.flush().context("flushing mask .npy")?;
    log::info!("saved {:?} mask to {}", mask.dim(), path.display());
    Ok(())
}

/// Save a cube as a 3-D `f64` `.npy` array.
pub fn save_cube(path: &Path, cube: &SpectralCube) -> Result<()> {
    let mut writer = create_buffered(path)?;
    cube.to_array()
        .write_npy(&mut writer)
        .context("writing cube .npy")?;
    writer.flush().context("flushing cube .npy")?;
    Ok(())
}

/// Save a wavelength grid as a 1-D `f64` `.npy` array.
pub fn save_wavelengths(path: &Path, grid: &WavelengthGrid) -> Result<()> {
    let mut writer = create_buffered(path)?;
    ndarray::aview1(grid.as_slice())
        .write_npy(&mut writer)
        .context("writing wavelength .npy")?;
    writer.flush().context("flushing wavelength .npy")?;
    Ok(())
}
