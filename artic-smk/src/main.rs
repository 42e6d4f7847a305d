mod run;

use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use eyre::Result;
use human_panic::setup_panic;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// Assemble and launch the ARTIC nanopore amplicon pipeline.
pub struct Args {
    /// Tab- or comma-separated file of samples, barcodes, and other
    /// sample-specific options
    #[clap(short = 's', long)]
    pub sample_sheet: PathBuf,

    /// Output directory
    #[clap(short = 'o', long, default_value = "artic-out")]
    pub output: PathBuf,

    /// Directory of fast5 files, typically the Nanopore run directory
    #[clap(long, alias = "f5")]
    pub fast5_dir: Option<PathBuf>,

    /// Input alternative to fast5-dir: directory of demultiplexed fastq
    /// files, one subdirectory per barcode
    #[clap(long, alias = "fq")]
    pub fastq_dir: Option<PathBuf>,

    /// Name for the consensus genome
    #[clap(short = 'g', long, default_value = "genome")]
    pub genome_name: String,

    /// For fast5 input: configuration for guppy_basecaller
    #[clap(long, default_value = "dna_r9.4.1_450bps_fast.cfg")]
    pub guppy_config: String,

    /// For fast5 input: barcode kit passed to guppy_barcoder
    #[clap(long, default_value = "EXP-NBD104")]
    pub guppy_barcode_kit: String,

    /// Additional options passed to guppy_basecaller, e.g. " --num_callers 10"
    #[clap(long, default_value = "")]
    pub guppy_basecaller_opts: String,

    /// Full path to the guppy bin directory. Leave empty if guppy is already
    /// on your search PATH
    #[clap(long)]
    pub guppy_path: Option<PathBuf>,

    /// Device for guppy: 'auto', 'cuda:<id>', or leave empty to probe
    /// whether a GPU is usable
    #[clap(long, default_value = "")]
    pub guppy_device: String,

    /// Ignore reads shorter than min-length
    #[clap(short = 'L', long, default_value_t = 350)]
    pub min_length: u32,

    /// Model to use for medaka
    #[clap(long, default_value = "r941_min_fast_g303")]
    pub medaka_model: String,

    /// Path to the primer scheme directory
    #[clap(long, alias = "sd", default_value = "primer-schemes")]
    pub medaka_scheme_directory: PathBuf,

    /// Scheme for medaka
    #[clap(long, default_value = "rabv_ea/V1")]
    pub medaka_scheme: String,

    /// Number of jobs snakemake may run in parallel
    #[clap(short = 'j', long, default_value_t = 1)]
    pub jobs: usize,

    /// Run the pipeline in dry-run mode
    #[clap(short = 'n', long)]
    pub dry_run: bool,

    /// Path to the pipeline Snakefile
    #[clap(long, default_value = "Snakefile")]
    pub snakefile: PathBuf,

    /// Additional options passed verbatim to snakemake, e.g.
    /// " --rerun-incomplete -k"
    #[clap(long, alias = "smk", default_value = "")]
    pub snakemake_opts: String,

    /// Rules or files to build, defaults to the full pipeline
    pub targets: Vec<String>,

    #[clap(flatten)]
    pub verbose: Verbosity,
}

fn main() -> Result<()> {
    setup_panic!();
    jane_eyre::install()?;

    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let cwd = std::env::current_dir()?;
    let code = run::run(args, &cwd)?;
    std::process::exit(code);
}
