use std::{fs, os::unix::fs::PermissionsExt};

use assert_cmd::Command;
use assert_fs::{fixture::FileWriteStr, prelude::PathChild, TempDir};
use predicates::prelude::*;

const SHEET: &str = "sample\tbarcode\ns1\tBC01\ns2\tBC02\n";

/// Working directory with a Snakefile, its lib/ support directory, a valid
/// sample sheet and a fake snakemake that echoes its arguments.
fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child("Snakefile").write_str("# pipeline rules\n").unwrap();
    fs::create_dir_all(tmp.child("lib").path()).unwrap();
    tmp.child("sample_sheet.tsv").write_str(SHEET).unwrap();
    fake_snakemake(&tmp, "#!/bin/sh\necho \"$@\"\nexit 0\n");
    tmp
}

fn fake_snakemake(tmp: &TempDir, script: &str) {
    let bin_dir = tmp.child("bin");
    fs::create_dir_all(bin_dir.path()).unwrap();
    let snakemake = bin_dir.child("snakemake");
    snakemake.write_str(script).unwrap();
    fs::set_permissions(snakemake.path(), fs::Permissions::from_mode(0o755)).unwrap();
}

fn artic_smk(tmp: &TempDir) -> Command {
    let path = format!(
        "{}:{}",
        tmp.child("bin").path().display(),
        std::env::var("PATH").unwrap_or_default()
    );
    let mut cmd = Command::cargo_bin("artic-smk").unwrap();
    cmd.current_dir(tmp.path()).env("PATH", path);
    cmd
}

#[test]
fn conflicting_input_dirs_exit_one_before_launch() {
    let tmp = fixture();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .args(["--fast5-dir", "fast5"])
        .args(["--fastq-dir", "fastq"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not both"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_snakefile_exits_one() {
    let tmp = fixture();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .args(["--snakefile", "elsewhere/Snakefile"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Snakefile not found"));
}

#[test]
fn missing_support_directory_exits_one() {
    let tmp = fixture();
    fs::remove_dir(tmp.child("lib").path()).unwrap();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Support directory"));
}

#[test]
fn invalid_sample_sheet_fails_before_launch() {
    let tmp = fixture();
    tmp.child("sample_sheet.tsv")
        .write_str("sample\tname\ns1\tfoo\n")
        .unwrap();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("barcode"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn composes_and_streams_the_snakemake_invocation() {
    let tmp = fixture();
    fs::create_dir_all(tmp.child("demuxed").path()).unwrap();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .args(["--fastq-dir", "demuxed"])
        .args(["-j", "4"])
        .args(["--genome-name", "my_genome"])
        .args(["--snakemake-opts", " --rerun-incomplete"])
        .arg("consensus")
        .assert()
        .success()
        .stdout(predicate::str::contains("--printshellcmds"))
        .stdout(predicate::str::contains("--jobs 4"))
        .stdout(predicate::str::contains("genome_name=my_genome"))
        .stdout(predicate::str::contains("fastq_dir="))
        .stdout(predicate::str::contains("--rerun-incomplete"))
        .stdout(predicate::str::contains("-- consensus"))
        .stderr(predicate::str::contains("snakemake"));

    // Normalization side effects live under the output directory.
    let out = tmp.child("artic-out");
    assert!(out.child("dummy_fast5").path().is_dir());
    assert_eq!(
        fs::read_link(out.child("fastq").path()).unwrap(),
        tmp.child("demuxed").path().to_path_buf()
    );
}

#[test]
fn dry_run_flag_is_forwarded() {
    let tmp = fixture();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv", "-n"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn child_exit_code_is_propagated() {
    let tmp = fixture();
    fake_snakemake(&tmp, "#!/bin/sh\nexit 7\n");
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .assert()
        .code(7);
}

#[test]
fn explicit_cuda_device_is_forwarded() {
    let tmp = fixture();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .args(["--guppy-device", "cuda:0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("guppy_device=-x cuda:0"));
}

#[test]
fn invalid_guppy_device_is_rejected() {
    let tmp = fixture();
    artic_smk(&tmp)
        .args(["-s", "sample_sheet.tsv"])
        .args(["--guppy-device", "tpu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid option for guppy device"));
}
