use std::path::Path;

use ndarray::Array3;
use tempfile::{tempdir, TempDir};

use rusty_hyperspec::analysis::band::BandPolicy;
use rusty_hyperspec::analysis::quartile::QuartileMethod;
use rusty_hyperspec::classify::LogisticModel;
use rusty_hyperspec::data::loader::{load_good_pixels, load_pixel_records};
use rusty_hyperspec::data::model::{PixelPrediction, SpectralCube, WavelengthGrid};
use rusty_hyperspec::data::writer::{save_cube, save_wavelengths};
use rusty_hyperspec::pipeline::{
    cube_info, run_classify, run_reduce, run_select, summarize, ClassifyPaths, PipelineOptions,
};

/// 4 x 5 cube, three flat bands per pixel. Pixel i (row-major) has mean i,
/// except the last pixel which is a 1000.0 outlier.
fn write_cube(dir: &TempDir) -> std::path::PathBuf {
    let cube = Array3::from_shape_fn((4, 5, 3), |(r, c, _)| {
        let i = r * 5 + c;
        if i == 19 {
            1000.0
        } else {
            i as f64
        }
    });
    let path = dir.path().join("cube.npy");
    save_cube(&path, &SpectralCube::new(cube)).unwrap();
    path
}

fn write_model(path: &Path, model: &LogisticModel) {
    std::fs::write(path, serde_json::to_string(model).unwrap()).unwrap();
}

#[test]
fn test_info() {
    let dir = tempdir().unwrap();
    let info = cube_info(&write_cube(&dir)).unwrap();
    assert_eq!((info.rows, info.cols, info.bands), (4, 5, 3));
    assert_eq!(info.pixel_count(), 20);
}

#[test]
fn test_reduce_and_summarize() {
    let dir = tempdir().unwrap();
    let cube = write_cube(&dir);
    let means = dir.path().join("means.csv");
    let filtered = dir.path().join("filtered.parquet");

    let report = run_reduce(&cube, &means, Some(&filtered), &PipelineOptions::default()).unwrap();
    // lower half 0..=9, upper half 10..=18 + 1000
    assert_eq!(report.bounds.q1, 4.5);
    assert_eq!(report.bounds.q3, 14.5);
    assert_eq!((report.lower_fence, report.upper_fence), (-5.5, 24.5));
    assert_eq!(report.original_len, 20);
    assert_eq!(report.retained_len, 19);
    assert!((report.percent_removed() - 5.0).abs() < 1e-12);

    let saved = load_pixel_records(&means).unwrap();
    assert_eq!(saved.len(), 20);
    for (i, r) in saved.iter().enumerate() {
        assert_eq!((r.row, r.col), (i / 5, i % 5));
    }

    let kept = load_pixel_records(&filtered).unwrap();
    assert_eq!(kept, saved[..19].to_vec());

    let summary = summarize(&means, &filtered).unwrap();
    assert_eq!((summary.original_len, summary.filtered_len), (20, 19));
    assert!((summary.percent_removed() - 5.0).abs() < 1e-12);
    assert!(summarize(&filtered, &means).is_err());
}

#[test]
fn test_reduce_options() {
    let dir = tempdir().unwrap();
    let cube = write_cube(&dir);
    let means = dir.path().join("means.json");

    let options = PipelineOptions {
        multiplier: 0.0,
        quartile_method: QuartileMethod::LinearPercentile,
        ..PipelineOptions::default()
    };
    let report = run_reduce(&cube, &means, None, &options).unwrap();
    // ranks 4.75 and 14.25 over 0..=18, 1000
    assert!((report.bounds.q1 - 4.75).abs() < 1e-12);
    assert!((report.bounds.q3 - 14.25).abs() < 1e-12);
    // 5..=14 survive the raw quartile window
    assert_eq!(report.retained_len, 10);

    let bad = PipelineOptions {
        multiplier: -1.0,
        ..PipelineOptions::default()
    };
    assert!(run_reduce(&cube, &means, None, &bad).is_err());
}

#[test]
fn test_reduce_all_nan_cube_keeps_nothing() {
    let dir = tempdir().unwrap();
    let cube = dir.path().join("nan.npy");
    save_cube(&cube, &SpectralCube::new(Array3::from_elem((2, 3, 4), f64::NAN))).unwrap();
    let means = dir.path().join("means.csv");

    let report = run_reduce(&cube, &means, None, &PipelineOptions::default()).unwrap();
    assert_eq!((report.original_len, report.retained_len), (6, 0));
    assert!(report.bounds.q1.is_nan() && report.bounds.q3.is_nan());

    let saved = load_pixel_records(&means).unwrap();
    assert_eq!(saved.len(), 6);
    assert!(saved.iter().all(|r| r.value.is_nan()));
}

#[test]
fn test_select_writes_good_pixels_and_mask() {
    let dir = tempdir().unwrap();
    let cube = write_cube(&dir);
    let good = dir.path().join("good.json");
    let mask = dir.path().join("mask.npy");

    // [mu, mu + 5 sigma] holds only the outlier
    let policy = BandPolicy {
        lower_sigma: 0.0,
        upper_sigma: 5.0,
    };
    let selection = run_select(&cube, &good, Some(&mask), policy).unwrap();
    assert_eq!(selection.good_count(), 1);
    assert_eq!(selection.total_count(), 20);

    let pixels = load_good_pixels(&good).unwrap();
    assert_eq!(pixels.len(), 1);
    assert_eq!((pixels[0].row, pixels[0].col), (3, 4));
    assert_eq!(pixels[0].spectrum, vec![1000.0; 3]);

    let saved: ndarray::Array2<bool> = ndarray_npy::read_npy(&mask).unwrap();
    assert_eq!(saved, selection.mask);
    assert!(saved[[3, 4]]);

    // default band [mu + sigma, mu + 2 sigma] is empty for this cube
    let selection = run_select(&cube, &good, None, BandPolicy::default()).unwrap();
    assert_eq!(selection.good_count(), 0);
    assert!(load_good_pixels(&good).unwrap().is_empty());
}

#[test]
fn test_select_then_classify() {
    let dir = tempdir().unwrap();
    let cube = write_cube(&dir);
    let good = dir.path().join("good.parquet");
    let wavelengths = dir.path().join("wl.npy");
    let model_path = dir.path().join("model.json");
    let out = dir.path().join("predictions.csv");

    save_wavelengths(&wavelengths, &WavelengthGrid::new(vec![10.0, 20.0, 30.0]).unwrap()).unwrap();
    let wide = BandPolicy {
        lower_sigma: -10.0,
        upper_sigma: 10.0,
    };
    run_select(&cube, &good, None, wide).unwrap();

    // plastic when the value at 15 exceeds 10
    let model = LogisticModel::new(WavelengthGrid::new(vec![15.0]).unwrap(), vec![1.0], -10.0).unwrap();
    write_model(&model_path, &model);

    let paths = ClassifyPaths {
        good_pixels: &good,
        wavelengths: &wavelengths,
        model: &model_path,
        training_csv: None,
        out: &out,
    };
    let predictions = run_classify(paths, None).unwrap();
    assert_eq!(predictions.len(), 20);
    for (i, p) in predictions.iter().enumerate() {
        assert_eq!((p.row, p.column), (i / 5, i % 5));
        assert_eq!(p.is_plastic, i > 10, "pixel {i}");
    }

    let mut reader = csv::Reader::from_path(&out).unwrap();
    assert_eq!(reader.headers().unwrap(), vec!["row", "column", "is_plastic"]);
    let saved: Vec<PixelPrediction> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(saved, predictions);

    // a stricter threshold leaves only the outlier
    let predictions = run_classify(paths, Some(0.999_999)).unwrap();
    let plastic: Vec<_> = predictions.iter().filter(|p| p.is_plastic).collect();
    assert_eq!(plastic.len(), 1);
    assert_eq!((plastic[0].row, plastic[0].column), (3, 4));
    assert!(run_classify(paths, Some(1.5)).is_err());
}

#[test]
fn test_classify_with_training_table_grid() {
    let dir = tempdir().unwrap();
    let cube = write_cube(&dir);
    let good = dir.path().join("good.json");
    let wavelengths = dir.path().join("wl.json");
    let model_path = dir.path().join("model.json");
    let training = dir.path().join("train.csv");
    let out = dir.path().join("predictions.csv");

    std::fs::write(&wavelengths, "[10.0, 20.0, 30.0]").unwrap();
    run_select(
        &cube,
        &good,
        None,
        BandPolicy {
            lower_sigma: 0.0,
            upper_sigma: 5.0,
        },
    )
    .unwrap();

    let model = LogisticModel::new(WavelengthGrid::new(vec![15.0]).unwrap(), vec![1.0], -10.0).unwrap();
    write_model(&model_path, &model);
    std::fs::write(&training, "25,label\n0.5,0\n").unwrap();

    let paths = ClassifyPaths {
        good_pixels: &good,
        wavelengths: &wavelengths,
        model: &model_path,
        training_csv: Some(&training),
        out: &out,
    };
    let predictions = run_classify(paths, None).unwrap();
    assert_eq!(
        predictions,
        vec![PixelPrediction {
            row: 3,
            column: 4,
            is_plastic: true
        }]
    );

    // two feature columns no longer match one coefficient
    std::fs::write(&training, "25,27,label\n0.5,0.5,0\n").unwrap();
    assert!(run_classify(paths, None).is_err());
}
