//! Integration tests for multi-stage pipelines against scripted tools.

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use diag_collector::config::ToolEnvironment;
use diag_collector::error::PipelineError;
use diag_collector::utils::pipeline::{run_captured, CommandSpec, Pipeline};

fn install_tool(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn scripted_tools(dir: &Path) -> ToolEnvironment {
    ToolEnvironment::from_parts(Vec::new(), vec![dir.to_path_buf()])
}

/// Test that each stage reports its own status and stderr
#[test]
fn test_per_stage_status_and_stderr() -> Result<()> {
    let bin = TempDir::new()?;
    install_tool(bin.path(), "produce", "echo one; echo two; echo 'produce warning' >&2; exit 4")?;
    install_tool(bin.path(), "relay", "while read line; do echo \"r:$line\"; done")?;

    let pipeline = Pipeline::cmd("produce").pipe(CommandSpec::new("relay", Vec::<String>::new()));
    let (stdout, outcome) = run_captured(&pipeline, &scripted_tools(bin.path()))?;

    assert_eq!(stdout, b"r:one\nr:two\n");
    assert_eq!(outcome.stages.len(), 2);
    assert_eq!(outcome.stages[0].status, 4);
    assert_eq!(outcome.stages[1].status, 0);
    assert!(outcome.success());
    assert!(outcome.stages[0].stderr.contains("produce warning"));
    assert!(outcome.stages[1].stderr.is_empty());

    let text = outcome.stderr_text();
    assert!(text.contains("=== stage 1/2 (exit 4): produce ==="));
    assert!(text.contains("=== stage 2/2 (exit 0): relay ==="));
    Ok(())
}

/// Test that a missing later stage prevents every stage from starting
#[test]
fn test_missing_stage_spawns_nothing() -> Result<()> {
    let bin = TempDir::new()?;
    let marker = bin.path().join("started");
    install_tool(bin.path(), "first", &format!(": > '{}'; echo data", marker.display()))?;

    let pipeline = Pipeline::cmd("first").pipe(CommandSpec::new("not-installed", ["-x"]));
    match pipeline.spawn(&scripted_tools(bin.path())) {
        Err(PipelineError::MissingTool(tool)) => assert_eq!(tool, "not-installed"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("pipeline with a missing tool spawned"),
    }
    assert!(!marker.exists());
    Ok(())
}

/// Test that tools see the stabilized locale and search path only
#[test]
fn test_tools_see_stable_environment() -> Result<()> {
    let bin = TempDir::new()?;
    install_tool(bin.path(), "showenv", "echo \"$LC_ALL|$LANG|$PATH|${HOME:-unset}\"")?;

    let tools = ToolEnvironment::from_parts(
        vec![
            (OsString::from("HOME"), OsString::from("/root")),
            (OsString::from("LC_MESSAGES"), OsString::from("de_DE")),
        ],
        vec![bin.path().to_path_buf()],
    );
    let (stdout, outcome) = run_captured(&Pipeline::cmd("showenv"), &tools)?;

    assert!(outcome.success());
    let line = String::from_utf8(stdout)?;
    assert_eq!(line.trim_end(), format!("C.UTF-8|C.UTF-8|{}|/root", bin.path().display()));
    Ok(())
}
