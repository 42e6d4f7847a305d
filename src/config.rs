use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, UNIX_EPOCH},
};

use thiserror::Error;

use crate::utils::{absolutize, symlink_force};

/// Stand-in fast5 directory created when the pipeline starts from
/// demultiplexed fastq input, so the rule graph sees a uniform input shape.
pub const PLACEHOLDER_FAST5: &str = "dummy_fast5";

/// Name of the symlink pointing at the demultiplexed fastq directory.
pub const FASTQ_LINK: &str = "fastq";

// 2000-01-01T00:00:00Z. Snakemake compares input mtimes, the placeholder
// must never look newer than real run data.
const PLACEHOLDER_MTIME_SECS: u64 = 946_684_800;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Provide one of fast5_dir or fastq_dir, not both")]
    ConflictingInput,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Everything the Snakefile receives through `--config`, as an explicit
/// struct rather than a loose key/value map.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub sample_sheet: PathBuf,
    pub guppy_path: Option<PathBuf>,
    pub guppy_config: String,
    pub guppy_barcode_kit: String,
    pub guppy_extra_opts: String,
    pub guppy_device: String,
    pub min_length: u32,
    pub medaka_model: String,
    pub medaka_scheme_directory: PathBuf,
    pub medaka_scheme: String,
    pub genome_name: String,
    pub fast5_dir: Option<PathBuf>,
    pub fastq_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Validate the input-directory choice and set up the fastq entry point
    /// under `workdir`. Creates at most one directory and one symlink,
    /// idempotent on re-runs.
    pub fn normalize(&mut self, workdir: &Path) -> Result<(), ConfigError> {
        if self.fast5_dir.is_some() && self.fastq_dir.is_some() {
            return Err(ConfigError::ConflictingInput);
        }

        if let Some(fastq_dir) = &self.fastq_dir {
            let placeholder = workdir.join(PLACEHOLDER_FAST5);
            fs::create_dir_all(&placeholder)?;
            let handle = fs::File::open(&placeholder)?;
            handle.set_modified(UNIX_EPOCH + Duration::from_secs(PLACEHOLDER_MTIME_SECS))?;

            let target = absolutize(workdir, fastq_dir);
            symlink_force(&target, &workdir.join(FASTQ_LINK))?;
            self.fast5_dir = Some(placeholder);
        }

        Ok(())
    }

    /// Shell fragment that makes the guppy binaries reachable, empty when
    /// guppy is expected on the caller's PATH already.
    pub fn export_cmd(&self) -> String {
        match &self.guppy_path {
            Some(path) if !path.as_os_str().is_empty() => {
                format!("export PATH={}:${{PATH}}", path.display())
            }
            _ => String::new(),
        }
    }

    /// Ordered key/value tokens for `snakemake --config`.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let display = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        let mut pairs = vec![
            ("sample_sheet", self.sample_sheet.display().to_string()),
            ("guppy_path", display(&self.guppy_path)),
            ("guppy_config", self.guppy_config.clone()),
            ("guppy_barcode_kit", self.guppy_barcode_kit.clone()),
            ("guppy_extra_opts", self.guppy_extra_opts.clone()),
            ("guppy_device", self.guppy_device.clone()),
            ("guppy_export_cmd", self.export_cmd()),
            ("min_length", self.min_length.to_string()),
            (
                "medaka_scheme_directory",
                self.medaka_scheme_directory.display().to_string(),
            ),
            ("medaka_scheme", self.medaka_scheme.clone()),
            ("medaka_model", self.medaka_model.clone()),
            ("genome_name", self.genome_name.clone()),
        ];
        if let Some(fast5_dir) = &self.fast5_dir {
            pairs.push(("fast5_dir", fast5_dir.display().to_string()));
        }
        if let Some(fastq_dir) = &self.fastq_dir {
            pairs.push(("fastq_dir", fastq_dir.display().to_string()));
        }
        pairs
    }
}
