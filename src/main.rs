use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use rusty_hyperspec::analysis::band::BandPolicy;
use rusty_hyperspec::analysis::filter::DEFAULT_IQR_MULTIPLIER;
use rusty_hyperspec::analysis::quartile::QuartileMethod;
use rusty_hyperspec::pipeline::{self, ClassifyPaths, PipelineOptions};

/// Per-pixel reduction, outlier filtering and band selection for
/// hyperspectral cubes.
#[derive(Parser, Debug)]
#[command(name = "rusty-hyperspec", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the shape of a cube
    Info {
        /// Cube as a (rows, cols, bands) .npy array
        #[arg(long)]
        cube: PathBuf,
    },

    /// Reduce every pixel to its mean absorbance and drop Tukey outliers
    Reduce {
        #[arg(long)]
        cube: PathBuf,

        /// Per-pixel means (.csv, .json or .parquet)
        #[arg(long)]
        means_out: PathBuf,

        /// Means that survive the Tukey fences
        #[arg(long)]
        filtered_out: Option<PathBuf>,

        /// Fence multiplier k in [Q1 - k*IQR, Q3 + k*IQR]
        #[arg(long, default_value_t = DEFAULT_IQR_MULTIPLIER)]
        multiplier: f64,

        #[arg(long, value_enum, default_value_t = QuartileMethod::SplitMedian)]
        quartile_method: QuartileMethod,
    },

    /// Report how much data a previous reduce run removed
    Summarize {
        #[arg(long)]
        means: PathBuf,

        #[arg(long)]
        filtered: PathBuf,
    },

    /// Select pixels whose mean lies between mu + lower*sigma and mu + upper*sigma
    Select {
        #[arg(long)]
        cube: PathBuf,

        /// Good pixels with their spectra (.json or .parquet)
        #[arg(long)]
        out: PathBuf,

        /// Boolean (rows, cols) mask as .npy
        #[arg(long)]
        mask_out: Option<PathBuf>,

        #[arg(long, default_value_t = 1.0)]
        lower_sigma: f64,

        #[arg(long, default_value_t = 2.0)]
        upper_sigma: f64,
    },

    /// Classify good pixels with a pre-trained logistic model
    Classify {
        /// Good pixels written by `select`
        #[arg(long)]
        good: PathBuf,

        /// Wavelength grid of the good-pixel spectra
        #[arg(long)]
        wavelengths: PathBuf,

        /// Logistic model weights (.json)
        #[arg(long)]
        model: PathBuf,

        /// Training table whose numeric column headers give the model's wavelengths
        #[arg(long)]
        training_csv: Option<PathBuf>,

        /// Probability above which a pixel counts as plastic
        #[arg(long)]
        threshold: Option<f64>,

        /// Predictions as row,column,is_plastic CSV
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Info { cube } => {
            let info = pipeline::cube_info(&cube)?;
            println!(
                "{}: {} rows x {} cols x {} bands ({} pixels)",
                cube.display(),
                info.rows,
                info.cols,
                info.bands,
                info.pixel_count()
            );
        }
        Command::Reduce {
            cube,
            means_out,
            filtered_out,
            multiplier,
            quartile_method,
        } => {
            let options = PipelineOptions {
                multiplier,
                quartile_method,
                ..PipelineOptions::default()
            };
            let report =
                pipeline::run_reduce(&cube, &means_out, filtered_out.as_deref(), &options)?;
            println!(
                "Original data: {} records; filtered data: {} records ({:.2}% removed)",
                report.original_len,
                report.retained_len,
                report.percent_removed()
            );
        }
        Command::Summarize { means, filtered } => {
            let summary = pipeline::summarize(&means, &filtered)?;
            println!("Original data size: {} records", summary.original_len);
            println!("Filtered data size: {} records", summary.filtered_len);
            println!("Percentage of data removed: {:.2}%", summary.percent_removed());
        }
        Command::Select {
            cube,
            out,
            mask_out,
            lower_sigma,
            upper_sigma,
        } => {
            let policy = BandPolicy {
                lower_sigma,
                upper_sigma,
            };
            let selection = pipeline::run_select(&cube, &out, mask_out.as_deref(), policy)?;
            println!(
                "Number of good pixels: {} of {} ({:.2}%)",
                selection.good_count(),
                selection.total_count(),
                selection.percentage()
            );
        }
        Command::Classify {
            good,
            wavelengths,
            model,
            training_csv,
            threshold,
            out,
        } => {
            let paths = ClassifyPaths {
                good_pixels: &good,
                wavelengths: &wavelengths,
                model: &model,
                training_csv: training_csv.as_deref(),
                out: &out,
            };
            let predictions = pipeline::run_classify(paths, threshold)?;
            let plastic = predictions.iter().filter(|p| p.is_plastic).count();
            println!("{plastic} of {} pixels classified as plastic", predictions.len());
        }
    }
    Ok(())
}
