//! Command-line behaviour tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// Binary isolated from any user or working-directory config
fn layout_extract(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("layout-extract").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd
}

fn write_pdf(home: &TempDir, name: &str) -> std::path::PathBuf {
    let path = home.path().join(name);
    std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    let home = tempdir().unwrap();
    layout_extract(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn info_reports_version_and_config_locations() {
    let home = tempdir().unwrap();
    layout_extract(&home)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "layout-extract v{}",
            env!("CARGO_PKG_VERSION")
        )))
        .stdout(predicate::str::contains("layout-extract.toml"));
}

#[test]
fn missing_input_exits_with_input_not_found() {
    let home = tempdir().unwrap();
    layout_extract(&home)
        .args(["extract", "does-not-exist.pdf"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn directory_without_pdfs_exits_with_input_not_found() {
    let home = tempdir().unwrap();
    let empty = home.path().join("empty");
    std::fs::create_dir(&empty).unwrap();

    layout_extract(&home)
        .arg("extract")
        .arg(&empty)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No PDF files"));
}

#[test]
fn dry_run_prints_plan_with_overrides() {
    let home = tempdir().unwrap();
    let pdf = write_pdf(&home, "paper.pdf");

    layout_extract(&home)
        .arg("extract")
        .arg(&pdf)
        .args(["--dry-run", "--scale", "1.5", "-t", "3", "--detector-cmd", "my-detector"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry Run"))
        .stdout(predicate::str::contains("108 DPI"))
        .stdout(predicate::str::contains("my-detector"))
        .stdout(predicate::str::contains("Threads: 3"))
        .stdout(predicate::str::contains("paper.pdf"));
}

#[test]
fn dry_run_reads_local_config_file() {
    let home = tempdir().unwrap();
    let pdf = write_pdf(&home, "paper.pdf");
    std::fs::write(
        home.path().join("layout-extract.toml"),
        "[detector]\ncommand = \"from-config\"\n\n[ocr]\nlanguage = \"chi_sim\"\n",
    )
    .unwrap();

    layout_extract(&home)
        .arg("extract")
        .arg(&pdf)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-config"))
        .stdout(predicate::str::contains("lang: chi_sim"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let home = tempdir().unwrap();
    let pdf = write_pdf(&home, "paper.pdf");

    layout_extract(&home)
        .arg("extract")
        .arg(&pdf)
        .args(["--config", "nope.toml", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn extract_without_detector_fails() {
    let home = tempdir().unwrap();
    let pdf = write_pdf(&home, "paper.pdf");

    layout_extract(&home)
        .arg("extract")
        .arg(&pdf)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No detector command configured"));
}

#[test]
fn quiet_and_verbose_conflict() {
    let home = tempdir().unwrap();
    layout_extract(&home)
        .args(["extract", "a.pdf", "-q", "-v"])
        .assert()
        .failure();
}
