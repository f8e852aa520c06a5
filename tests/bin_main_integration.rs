use lopdf::Document;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_binary_dry_run_with_string_succeeds() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("-s").arg("# Hello from test").arg("--dry-run");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Dry-run validation complete"));
}

#[test]
fn test_binary_dry_run_reports_warning_count() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("-s").arg("| a | b |\n| 1 |\n\n$$\\nosuchcommand$$").arg("--dry-run");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 warning(s) found"));
}

#[test]
fn test_binary_returns_failure_when_no_input() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.assert().failure().code(1);
}

#[test]
fn test_binary_fails_on_missing_input_file() {
    let dir = tempdir().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("-p").arg(dir.path().join("absent.md"));
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("absent.md"));
}

#[test]
fn test_binary_prints_default_configuration() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("--get-default-configuration");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("[math]").and(predicate::str::contains("widthfraction")));
}

#[test]
fn test_binary_writes_pdf_next_to_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("report.md");
    fs::write(&input, "# Project Report\n\nBody text.\n\n$$a^2 + b^2 = c^2$$\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("-p").arg(&input).arg("-q");
    cmd.assert().success();

    let output = dir.path().join("report.pdf");
    let doc = Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_binary_title_and_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("style.toml");
    fs::write(&config, "[header]\ntitle = \"From Config\"\n\n[page]\nwidth = 148\nheight = 210\n").unwrap();
    let output = dir.path().join("out.pdf");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("-s")
        .arg("Some text")
        .arg("-c")
        .arg(&config)
        .arg("--title")
        .arg("From Flag")
        .arg("-o")
        .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Saved PDF"));

    let doc = Document::load(&output).unwrap();
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"From Flag");
}

#[test]
fn test_binary_missing_output_directory_fails() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("missing").join("out.pdf");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("-s").arg("text").arg("-o").arg(&output);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Output directory does not exist"));
    assert!(!output.exists());
}

#[test]
fn test_binary_dump_blocks() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("blocks.json");
    let output = dir.path().join("out.pdf");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md2report");
    cmd.arg("-s")
        .arg("# Title\n\n- item")
        .arg("--dump-blocks")
        .arg(&dump)
        .arg("-o")
        .arg(&output)
        .arg("-q");
    cmd.assert().success();

    let json = fs::read_to_string(&dump).unwrap();
    assert!(json.contains("\"type\": \"Heading\""));
    assert!(json.contains("\"type\": \"ListItem\""));
    assert!(output.exists());
}
