use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use rusty_hyperspec::classify::LogisticModel;
use rusty_hyperspec::data::model::{SpectralCube, WavelengthGrid};
use rusty_hyperspec::data::writer;

/// Write a synthetic NIR cube with a rectangular plastic patch, its
/// wavelength grid, and a matching logistic model.
#[derive(Parser, Debug)]
#[command(name = "generate_sample", long_about = None)]
struct Args {
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 64)]
    rows: usize,

    #[arg(long, default_value_t = 48)]
    cols: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Absorption bands of polyethylene-like material: (centre nm, width nm, depth).
const PLASTIC_PEAKS: [(f64, f64, f64); 3] = [(1210.0, 18.0, 0.35), (1395.0, 25.0, 0.2), (1540.0, 30.0, 0.15)];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn pixel_spectrum(
    wavelengths: &[f64],
    baseline: f64,
    peaks: &[(f64, f64, f64)],
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&wl| {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp))
                .sum();
            baseline + signal + noise.sample(rng)
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let noise = Normal::new(0.0, 0.01).context("building noise distribution")?;

    // 900 -> 1700 nm, step 4
    let wavelengths: Vec<f64> = (0..=200).map(|i| 900.0 + i as f64 * 4.0).collect();
    let bands = wavelengths.len();
    let (rows, cols) = (args.rows, args.cols);

    // Plastic occupies the centre third of the scene.
    let in_patch = |r: usize, c: usize| {
        (rows / 3..2 * rows / 3).contains(&r) && (cols / 3..2 * cols / 3).contains(&c)
    };

    let mut cube = Array3::<f64>::zeros((rows, cols, bands));
    let mut plastic = 0usize;
    for r in 0..rows {
        for c in 0..cols {
            let baseline = 0.1 + 0.02 * rng.gen::<f64>();
            let spectrum = if in_patch(r, c) {
                plastic += 1;
                pixel_spectrum(&wavelengths, baseline, &PLASTIC_PEAKS, &noise, &mut rng)
            } else if rng.gen_bool(0.005) {
                // saturated sensor element
                vec![5.0; bands]
            } else {
                pixel_spectrum(&wavelengths, baseline, &[], &noise, &mut rng)
            };
            for (b, v) in spectrum.into_iter().enumerate() {
                cube[[r, c, b]] = v;
            }
        }
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let grid = WavelengthGrid::new(wavelengths)?;
    writer::save_cube(&args.out_dir.join("hyperspectral_data.npy"), &SpectralCube::new(cube))?;
    writer::save_wavelengths(&args.out_dir.join("wavelengths.npy"), &grid)?;

    // Weights on the strongest absorption band, trained on a coarser grid.
    let model_grid = WavelengthGrid::new(vec![1100.0, 1210.0, 1300.0])?;
    let model = LogisticModel::new(model_grid, vec![-20.0, 40.0, -20.0], -2.0)?;
    let model_path = args.out_dir.join("model.json");
    let text = serde_json::to_string_pretty(&model).context("serializing model")?;
    std::fs::write(&model_path, text).with_context(|| format!("writing {}", model_path.display()))?;

    println!(
        "Wrote {rows}x{cols}x{bands} cube ({plastic} plastic pixels) to {}",
        args.out_dir.display()
    );
    Ok(())
}
