//! Exit codes and messages of the compiled binary

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn olist_dw(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_olist-dw"))
        .arg("--data-dir")
        .arg(root)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("OLIST_DATA_DIR")
        .env_remove("PG_URL")
        .env_remove("PG_SCHEMA")
        .output()
        .unwrap()
}

#[test]
fn test_report_without_validation_fails() {
    let temp = TempDir::new().unwrap();
    let output = olist_dw(temp.path(), &["report"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("olist-dw validate"), "{stderr}");
}

#[test]
fn test_dry_run_reports_missing_raw_sources() {
    let temp = TempDir::new().unwrap();
    let output = olist_dw(temp.path(), &["run", "--stage", "clean", "--dry-run"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("raw/olist_orders_dataset.csv"), "{stderr}");
}

#[test]
fn test_unknown_stage_is_rejected() {
    let temp = TempDir::new().unwrap();
    let output = olist_dw(temp.path(), &["run", "--stage", "publish"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("publish"));
}

#[cfg(feature = "duckdb-backend")]
#[test]
fn test_init_is_repeatable() {
    let temp = TempDir::new().unwrap();
    let url = format!("duckdb://{}", temp.path().join("olist.duckdb").display());

    let first = olist_dw(temp.path(), &["--warehouse", &url, "init"]);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    assert!(String::from_utf8_lossy(&first.stdout).contains("Initialized warehouse"));

    let second = olist_dw(temp.path(), &["--warehouse", &url, "init"]);
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("already initialized"));
}
