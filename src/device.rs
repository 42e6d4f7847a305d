use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use tempfile::TempDir;
use thiserror::Error;
use which::which;

/// Flag asking guppy to pick a GPU by itself.
pub const AUTO_FLAG: &str = "-x auto";

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Invalid option for guppy device: {0}")]
    InvalidDevice(String),
}

/// Map the user-facing device setting to a guppy CLI fragment. `gpu` and
/// the empty string leave the choice to the probe.
pub fn device_opt(value: &str) -> Result<String, DeviceError> {
    if value.is_empty() || value.eq_ignore_ascii_case("gpu") {
        Ok(String::new())
    } else if value.eq_ignore_ascii_case("auto") {
        Ok(AUTO_FLAG.to_string())
    } else if value.starts_with("cuda:") {
        Ok(format!("-x {value}"))
    } else {
        Err(DeviceError::InvalidDevice(value.to_string()))
    }
}

/// Locate the guppy_basecaller binary, either inside an explicit bin
/// directory or on PATH. None means the probe has nothing to run.
pub fn resolve_basecaller(guppy_path: &Option<PathBuf>) -> Option<PathBuf> {
    match guppy_path {
        Some(dir) if !dir.as_os_str().is_empty() => Some(dir.join("guppy_basecaller")),
        _ => which("guppy_basecaller").ok(),
    }
}

/// Decide empirically whether `-x auto` should be appended to the guppy
/// options. Respects a device already chosen in `extra_opts`, otherwise runs
/// a throwaway basecall against synthetic input and keeps only the exit
/// status. Every failure mode collapses to "no flag", the pipeline then
/// basecalls on CPU instead of aborting.
pub fn auto_device_flag(guppy_basecaller: &Path, guppy_config: &str, extra_opts: &str) -> String {
    if has_explicit_device(extra_opts) {
        return String::new();
    }
    match trial_run(guppy_basecaller, guppy_config, extra_opts) {
        Ok(true) => AUTO_FLAG.to_string(),
        Ok(false) => {
            log::warn!("GPU trial run exited nonzero, falling back to CPU basecalling");
            String::new()
        }
        Err(err) => {
            log::warn!("GPU trial run failed ({err}), falling back to CPU basecalling");
            String::new()
        }
    }
}

fn has_explicit_device(extra_opts: &str) -> bool {
    extra_opts
        .split_whitespace()
        .any(|tok| tok == "-x" || tok == "--device" || tok.starts_with("--device="))
}

fn trial_run(guppy_basecaller: &Path, guppy_config: &str, extra_opts: &str) -> eyre::Result<bool> {
    trial_run_in(
        &std::env::temp_dir(),
        guppy_basecaller,
        guppy_config,
        extra_opts,
    )
}

// The workspace parent comes in explicitly; the TempDir under it is removed
// on every exit path, including spawn failure.
fn trial_run_in(
    base: &Path,
    guppy_basecaller: &Path,
    guppy_config: &str,
    extra_opts: &str,
) -> eyre::Result<bool> {
    let workspace = TempDir::new_in(base)?;
    let fast5_dir = workspace.path().join("fast5");
    let barcode_dir = fast5_dir.join("barcode01");
    fs::create_dir_all(&barcode_dir)?;
    fs::write(barcode_dir.join("read0.fast5"), b"")?;
    let save_dir = workspace.path().join("basecalled");
    fs::create_dir_all(&save_dir)?;

    let mut cmd = Command::new(guppy_basecaller);
    cmd.arg("-i")
        .arg(&fast5_dir)
        .arg("-s")
        .arg(&save_dir)
        .arg("-c")
        .arg(guppy_config)
        .args(["-x", "auto"]);
    cmd.args(extra_opts.split_whitespace());
    cmd.stdout(Stdio::null()).stderr(Stdio::null());
    log::info!("{cmd:?}");
    let status = cmd.status()?;
    workspace.close()?;
    Ok(status.success())
}
