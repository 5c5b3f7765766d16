use clap::Parser;
use log::{error, info, Level};
use motif_significance::config::{CorrectionFamilies, SignificanceConfig};
use motif_significance::correction::CorrectionMethod;
use motif_significance::error::SignificanceError;
use motif_significance::fisher::Alternative;
use motif_significance::inputs::{
    collect_motif_counts, read_motif_infos, read_motif_names, read_underfitting_log, CohortCounts,
};
use motif_significance::statistics::{motif_statistics, CollectionStatistics};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum SummaryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Significance(#[from] SignificanceError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Parser)]
#[command(
    name = "motif-summary",
    about = "Tests whether cancer mutations disrupt or create transcription factor binding sites more often than random mutations",
    long_about = "Builds, for every motif, contingency tables of cancer against randomized mutations for site \
                  disruption and site emergence, runs Fisher's exact test on each, corrects the p-values for \
                  multiple testing and prints one tab-separated row per motif.",
    version,
    after_help = "Example usage:\n    \
                  motif-summary results/cancer results/random motif_names.txt hocomoco_genes_infos.csv fitting.log\n    \
                  motif-summary cancer random names.txt infos.csv fitting.log --correction holm --output summary.tsv",
    color = clap::ColorChoice::Always
)]
#[derive(Debug)]
struct Args {
    /// Folder with cancer site counts
    /// (sites_disrupted.txt, sites_emerged.txt, sites_before.txt, sites_after.txt)
    #[arg(value_name = "CANCER_DIR")]
    cancer_dir: PathBuf,

    /// Folder with random site counts, same layout as the cancer folder
    #[arg(value_name = "RANDOM_DIR")]
    random_dir: PathBuf,

    /// File with motif names, one per line; sets the order of output rows
    #[arg(value_name = "MOTIF_NAMES")]
    motif_names: PathBuf,

    /// Tab-separated motif collection annotation (motif, gene, quality, weight, ...)
    #[arg(value_name = "MOTIF_INFOS")]
    motif_infos: PathBuf,

    /// Background fitting log with underfitted counts; a missing file means no underfitting
    #[arg(value_name = "FITTING_LOG")]
    fitting_log: PathBuf,

    /// P-value correction method
    /// (bonferroni/holm/hochberg/hommel/BH/fdr/BY/none)
    #[arg(long = "correction", value_name = "METHOD", default_value = "fdr")]
    correction: CorrectionMethod,

    /// Calculate statistics as if numbers in control set were N times greater.
    /// Use it only for preliminary checks
    #[arg(long = "expand-control-set", value_name = "N", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    expand_control_set: u64,

    /// Don't take underfitted values into account. Use it only for preliminary checks
    #[arg(long = "ignore-underfitting")]
    ignore_underfitting: bool,

    /// Correct disruption and emergence p-values as one family instead of two
    #[arg(long = "joint-correction")]
    joint_correction: bool,

    /// Alternative hypothesis of the exact test (two-sided, greater, less)
    #[arg(long, default_value = "two-sided")]
    alternative: Alternative,

    /// Output file; `.parquet` is written as Parquet, anything else as TSV.
    /// Standard output when omitted
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Number of threads
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Log every table and test
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> SignificanceConfig {
        SignificanceConfig {
            correction_method: self.correction,
            control_set_multiplier: self.expand_control_set,
            ignore_underfitting: self.ignore_underfitting,
            correction_families: if self.joint_correction {
                CorrectionFamilies::Joint
            } else {
                CorrectionFamilies::Separate
            },
            alternative: self.alternative,
        }
    }
}

fn write_output(
    statistics: &CollectionStatistics,
    output: Option<&Path>,
) -> Result<(), SummaryError> {
    match output {
        Some(path) => {
            // Create output directory if it doesn't exist
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            if path.extension().is_some_and(|ext| ext == "parquet") {
                let mut df = statistics.to_dataframe()?;
                ParquetWriter::new(file).finish(&mut df)?;
            } else {
                let mut writer = BufWriter::new(file);
                statistics.write_tsv(&mut writer)?;
                writer.flush()?;
            }
            info!("Summary written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            statistics.write_tsv(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<(), SummaryError> {
    let config = args.config();
    config.validate()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    let motif_names = read_motif_names(&args.motif_names)?;
    let motif_infos = read_motif_infos(&args.motif_infos)?;
    let underfitting = read_underfitting_log(&args.fitting_log)?;
    let cancer = CohortCounts::from_dir(&args.cancer_dir)?;
    let random = CohortCounts::from_dir(&args.random_dir)?;
    info!("{} motifs to test", motif_names.len());

    let counts = collect_motif_counts(&motif_names, &cancer, &random, &underfitting);
    let motifs = motif_statistics(&counts, &motif_infos, &config)?;
    let statistics = CollectionStatistics::from_config(motifs, &config);

    write_output(&statistics, args.output.as_deref())
}

fn main() {
    let start_time = std::time::Instant::now();

    let args = Args::parse();
    let level = if args.verbose { Level::Debug } else { Level::Info };
    simple_logger::init_with_level(level).unwrap_or_else(|e| {
        eprintln!("Failed to initialize logger: {}", e);
    });

    run(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start_time.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
