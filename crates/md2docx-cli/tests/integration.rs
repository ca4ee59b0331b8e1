//! Integration tests for the md2docx binary

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn md2docx(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_md2docx"))
        .args(args)
        .output()
        .expect("Failed to run md2docx")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn document_xml(docx: &Path) -> String {
    let file = fs::File::open(docx).expect("Failed to open output");
    let mut archive = zip::ZipArchive::new(file).expect("Output is not a zip archive");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("Missing word/document.xml")
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

#[test]
fn test_single_file_conversion() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("report.md");
    fs::write(&input, "# Report\n\nSee $\\frac{1}{2}$ and `code`.").unwrap();

    let output = md2docx(&[path_arg(&input)]);
    assert!(output.status.success(), "{output:?}");

    let expected = dir.path().join("report.docx");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), expected.display().to_string());

    let xml = document_xml(&expected);
    assert!(xml.contains("Report"));
    assert!(xml.contains("<m:f>"));
}

#[test]
fn test_explicit_output_path() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("a.md");
    let target = dir.path().join("out/b.docx");
    fs::write(&input, "text").unwrap();

    let output = md2docx(&[path_arg(&input), "-o", path_arg(&target), "-q"]);
    assert!(output.status.success(), "{output:?}");
    assert!(output.stdout.is_empty());
    assert!(target.is_file());
}

#[test]
fn test_wrong_extension_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "text").unwrap();

    let output = md2docx(&[path_arg(&input)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not a Markdown file"), "{stderr}");
}

#[test]
fn test_missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = md2docx(&[path_arg(&dir.path().join("nope"))]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let output = md2docx(&[path_arg(dir.path())]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No .md files found."));
}

#[test]
fn test_directory_report() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.md"), "# A").unwrap();
    fs::write(dir.path().join("bad.md"), [0xff, 0xfe]).unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/c.md"), "# C").unwrap();
    let out = dir.path().join("out");

    let output = md2docx(&[path_arg(dir.path()), "-o", path_arg(&out), "-r", "-j", "2"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CONVERSION RESULTS"));
    assert!(stdout.contains("[OK] a.md -> a.docx"));
    assert!(stdout.contains("[FAIL] bad.md - Error:"));
    assert!(stdout.contains("Total: 2 succeeded, 1 failed"));
    assert!(out.join("sub/c.docx").is_file());
}

#[test]
fn test_config_file_next_to_input() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("_md2docx.toml"),
        "[render]\nnotes_label = \"Quellen\"\n",
    )
    .unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "Claim[^1].\n\n[^1]: Source.").unwrap();

    let output = md2docx(&[path_arg(&input)]);
    assert!(output.status.success(), "{output:?}");
    assert!(document_xml(&dir.path().join("doc.docx")).contains("Quellen"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[output]\njobs = \"many\"\n").unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text").unwrap();

    let output = md2docx(&[path_arg(&input), "--config", path_arg(&config)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse config file"));
}

#[test]
fn test_dump_tokens() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("t.md");
    fs::write(&input, "# Hi").unwrap();

    let output = md2docx(&[path_arg(&input), "--dump-tokens"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"heading_open\""));
    assert!(!dir.path().join("t.docx").exists());
}

#[test]
fn test_print_config_schema() {
    let output = md2docx(&["--print-config-schema"]);
    assert!(output.status.success(), "{output:?}");
    let schema: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Schema is not JSON");
    assert!(schema.to_string().contains("RenderConfig"));
}

#[test]
fn test_init_writes_sample_config() {
    let dir = tempdir().unwrap();
    let output = md2docx(&[path_arg(dir.path()), "--init"]);
    assert!(output.status.success(), "{output:?}");

    let config = fs::read_to_string(dir.path().join("_md2docx.toml")).unwrap();
    assert!(config.starts_with("#:schema"));
    assert!(config.contains("[render]"));

    // A second run refuses to overwrite
    assert!(!md2docx(&[path_arg(dir.path()), "--init"]).status.success());
}
