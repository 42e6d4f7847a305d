use std::{
    fs,
    io::{BufRead, BufReader},
    path::Path,
    process::{Command, Stdio},
};

use colored::Colorize;
use eyre::Context;
use libartic_smk::{
    config::PipelineConfig,
    device,
    sample_sheet::SampleSheet,
    utils::absolutize,
};

use crate::Args;

/// Directory of pipeline support code expected next to the Snakefile.
const WORKFLOW_LIB: &str = "lib";

/// Validate everything, compose the snakemake invocation, stream its output
/// and hand back its exit code. All checks run before snakemake starts.
pub fn run(args: Args, cwd: &Path) -> eyre::Result<i32> {
    if args.fast5_dir.is_some() && args.fastq_dir.is_some() {
        eprintln!("Please provide fast5 or fastq input, not both");
        return Ok(1);
    }

    let snakefile = absolutize(cwd, &args.snakefile);
    if !snakefile.is_file() {
        eprintln!("Snakefile not found at {}", snakefile.display());
        return Ok(1);
    }
    let workflow_dir = snakefile
        .parent()
        .ok_or_else(|| eyre::eyre!("Snakefile has no parent directory"))?;
    if !workflow_dir.join(WORKFLOW_LIB).is_dir() {
        eprintln!(
            "Support directory {} not found next to the Snakefile",
            workflow_dir.join(WORKFLOW_LIB).display()
        );
        return Ok(1);
    }

    let sample_sheet = absolutize(cwd, &args.sample_sheet);
    let sheet = SampleSheet::from_path(&sample_sheet)
        .wrap_err_with(|| format!("Invalid sample sheet {}", sample_sheet.display()))?;
    log::info!(
        "Sample sheet {} with {} samples",
        sample_sheet.display(),
        sheet.len()
    );

    let guppy_path = args
        .guppy_path
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| absolutize(cwd, p));

    let mut config = PipelineConfig {
        sample_sheet,
        guppy_path,
        guppy_config: args.guppy_config.clone(),
        guppy_barcode_kit: args.guppy_barcode_kit.clone(),
        guppy_extra_opts: args.guppy_basecaller_opts.clone(),
        guppy_device: String::new(),
        min_length: args.min_length,
        medaka_model: args.medaka_model.clone(),
        medaka_scheme_directory: absolutize(cwd, &args.medaka_scheme_directory),
        medaka_scheme: args.medaka_scheme.clone(),
        genome_name: args.genome_name.clone(),
        fast5_dir: args.fast5_dir.as_deref().map(|p| absolutize(cwd, p)),
        fastq_dir: args.fastq_dir.as_deref().map(|p| absolutize(cwd, p)),
    };

    let output = absolutize(cwd, &args.output);
    fs::create_dir_all(&output)
        .wrap_err_with(|| format!("Could not create output directory {}", output.display()))?;
    config.normalize(&output)?;
    config.guppy_device = resolve_device(&args, &config)?;

    let mut cmd = snakemake_cmd(&args, &config, &snakefile, &output);
    eprintln!("{}", render(&cmd).cyan());
    log::info!("{cmd:?}");

    let mut child = cmd
        .stdout(Stdio::piped())
        .spawn()
        .wrap_err("Failed to launch snakemake")?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| eyre::eyre!("Could not capture stdout"))?;
    for line in BufReader::new(stdout).lines() {
        println!("{}", line?);
    }
    let status = child.wait()?;
    Ok(status.code().unwrap_or(1))
}

/// An explicit --guppy-device wins. Otherwise, on the basecalling path, ask
/// the probe whether a GPU is actually usable.
fn resolve_device(args: &Args, config: &PipelineConfig) -> eyre::Result<String> {
    if !args.guppy_device.is_empty() {
        return Ok(device::device_opt(&args.guppy_device)?);
    }
    if config.fastq_dir.is_some() {
        // Demultiplexed fastq input skips basecalling entirely.
        return Ok(String::new());
    }
    let flag = match device::resolve_basecaller(&config.guppy_path) {
        Some(basecaller) => {
            device::auto_device_flag(&basecaller, &config.guppy_config, &config.guppy_extra_opts)
        }
        None => {
            log::warn!("guppy_basecaller not found, skipping the GPU probe");
            String::new()
        }
    };
    Ok(flag)
}

fn snakemake_cmd(
    args: &Args,
    config: &PipelineConfig,
    snakefile: &Path,
    output: &Path,
) -> Command {
    let mut cmd = Command::new("snakemake");
    cmd.arg("--printshellcmds");
    if args.dry_run {
        cmd.arg("--dry-run");
    }
    cmd.arg("--jobs").arg(args.jobs.to_string());
    cmd.arg("--directory").arg(output);
    cmd.arg("--snakefile").arg(snakefile);
    cmd.arg("--config");
    for (key, value) in config.pairs() {
        cmd.arg(format!("{key}={value}"));
    }
    cmd.args(args.snakemake_opts.split_whitespace());
    if !args.targets.is_empty() {
        cmd.arg("--");
        cmd.args(&args.targets);
    }
    cmd
}

fn render(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}
