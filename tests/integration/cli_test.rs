use std::path::Path;
use std::process::{Command, Output};

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::TempDir;

#[path = "../common/mod.rs"]
mod common;
use common::*;

fn workspace() -> Result<TempDir> {
    let dir = TempDir::new()?;
    write_table_file(dir.path(), "cities", &json!([["name", "pop"], ["SF", 800000], ["LA", 4000000]]))?;
    write_table_file(dir.path(), "states", &json!([["city", "state"], ["SF", "CA"]]))?;
    Ok(dir)
}

fn write_query(dir: &Path, descriptor: &Value) -> Result<std::path::PathBuf> {
    let path = dir.join("query.json");
    std::fs::write(&path, serde_json::to_string(descriptor)?)?;
    Ok(path)
}

fn tinyrel(args: &[&std::ffi::OsStr]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_tinyrel")).args(args).output()?)
}

fn stderr_error(output: &Output) -> Result<Value> {
    let stderr = String::from_utf8(output.stderr.clone())?;
    let line = stderr
        .lines()
        .last()
        .ok_or_else(|| anyhow::anyhow!("no stderr output"))?;
    Ok(serde_json::from_str(line)?)
}

#[test]
fn test_writes_result_file() -> Result<()> {
    let dir = workspace()?;
    let query = write_query(
        dir.path(),
        &json!({
            "select": ["name", "state"],
            "from": ["cities", "states"],
            "where": [{"left": {"column": "name"}, "op": "=", "right": {"column": "city"}}]
        }),
    )?;
    let out = dir.path().join("out.json");

    let output = tinyrel(&[dir.path().as_os_str(), query.as_os_str(), out.as_os_str()])?;
    assert!(output.status.success());

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(written, json!({"columns": ["name", "state"], "rows": [{"name": "SF", "state": "CA"}]}));
    Ok(())
}

#[test]
fn test_table_format_to_stdout() -> Result<()> {
    let dir = workspace()?;
    let query = write_query(dir.path(), &json!({"select": ["name"], "from": ["cities"], "order_by": ["name"]}))?;

    let output = tinyrel(&[
        dir.path().as_os_str(),
        query.as_os_str(),
        "--format".as_ref(),
        "table".as_ref(),
    ])?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("name"));
    assert!(stdout.find("LA") < stdout.find("SF"));
    Ok(())
}

#[test]
fn test_no_pushdown_gives_same_rows() -> Result<()> {
    let dir = workspace()?;
    let descriptor = json!({
        "select": ["cities.name"],
        "from": ["cities", "states"],
        "where": {"and": [
            {"compare": {"left": {"column": "pop"}, "op": "<", "right": {"literal": 1000000}}},
            {"compare": {"left": {"column": "name"}, "op": "=", "right": {"column": "city"}}}
        ]}
    });
    let query = write_query(dir.path(), &descriptor)?;

    let pushed = tinyrel(&[dir.path().as_os_str(), query.as_os_str()])?;
    let unpushed = tinyrel(&[dir.path().as_os_str(), query.as_os_str(), "--no-pushdown".as_ref()])?;
    assert!(pushed.status.success() && unpushed.status.success());
    assert_eq!(pushed.stdout, unpushed.stdout);
    Ok(())
}

#[test]
fn test_failure_reports_kind_and_writes_nothing() -> Result<()> {
    let dir = workspace()?;
    let query = write_query(dir.path(), &json!({"select": ["nope"], "from": ["cities"]}))?;
    let out = dir.path().join("out.json");

    let output = tinyrel(&[dir.path().as_os_str(), query.as_os_str(), out.as_os_str()])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());

    let error = stderr_error(&output)?;
    assert_eq!(error["error"]["kind"], "UnknownColumn");
    assert!(error["error"]["message"].as_str().is_some_and(|m| m.contains("nope")));
    Ok(())
}

#[test]
fn test_failure_kinds_from_inputs() -> Result<()> {
    let dir = workspace()?;

    let missing_table = write_query(dir.path(), &json!({"select": ["x"], "from": ["towns"]}))?;
    let output = tinyrel(&[dir.path().as_os_str(), missing_table.as_os_str()])?;
    assert_eq!(stderr_error(&output)?["error"]["kind"], "UnknownTable");

    let missing_query = dir.path().join("absent.json");
    let output = tinyrel(&[dir.path().as_os_str(), missing_query.as_os_str()])?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr_error(&output)?["error"]["kind"], "StorageError");

    let bad_descriptor = write_query(dir.path(), &json!({"select": ["name"], "from": ["cities"], "having": true}))?;
    let output = tinyrel(&[dir.path().as_os_str(), bad_descriptor.as_os_str()])?;
    assert_eq!(stderr_error(&output)?["error"]["kind"], "InvalidQuery");
    Ok(())
}
