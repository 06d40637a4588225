//! Process execution for builds and forwarded commands.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::config::Config;
use crate::discovery;
use crate::engine::{ExpansionPipeline, FileOutcome};
use crate::errors::GuardError;

use super::{exit_code, parse_plan, render_plan, rewrite_plan, BuildStep, Workspace};

/// Result of `guardex build`.
#[derive(Debug)]
pub struct BuildReport {
    pub exit_code: i32,
    /// Expansion results for every file copied into the workspace
    pub files: Vec<FileOutcome>,
    /// The rewritten plan, when only printing it
    pub rendered: Option<String>,
    /// Workspace left on disk by `build.keep_workspace`
    pub kept_workspace: Option<PathBuf>,
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Asks `tool` for its dry-run plan: `<tool> build -n <args>`.
pub fn dry_run(tool: &str, args: &[String]) -> Result<String, GuardError> {
    let output = Command::new(tool)
        .arg("build")
        .arg("-n")
        .args(args)
        .output()
        .map_err(|e| GuardError::io(tool, e))?;
    let text = combined(&output);
    if !output.status.success() {
        return Err(GuardError::build(format!(
            "`{tool} build -n` exited with status {}:\n{}",
            exit_code(output.status),
            text.trim()
        )));
    }
    Ok(text)
}

/// Runs every command through `sh -c` with `WORK` set to `work`.
///
/// A failing `mkdir` is tolerated; any other failure stops the plan and its
/// exit code is returned.
pub fn run_plan(steps: &[BuildStep], work: &Path) -> Result<i32, GuardError> {
    for command in steps.iter().flat_map(|step| &step.commands) {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("WORK", work)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GuardError::io("sh", e))?;
        let text = combined(&output);
        let text = text.trim();
        if !text.is_empty() {
            println!("{text}");
        }
        if !output.status.success() && !command.starts_with("mkdir") {
            return Ok(exit_code(output.status));
        }
    }
    Ok(0)
}

/// Forwards `args` to the build tool unchanged and returns its exit code.
pub fn passthrough(tool: &str, args: &[String]) -> Result<i32, GuardError> {
    let status = Command::new(tool)
        .args(args)
        .status()
        .map_err(|e| GuardError::io(tool, e))?;
    Ok(exit_code(status))
}

/// Builds the package in `root` from expanded sources.
///
/// With `print_only` the rewritten plan is returned instead of executed and no
/// workspace is created.
pub fn run_build(config: &Config, root: &Path, print_only: bool, args: &[String]) -> Result<BuildReport, GuardError> {
    let plan = dry_run(&config.build.tool, args)?;
    let mut steps = parse_plan(&plan);
    let extension = config.expand.extension.as_str();
    rewrite_plan(&mut steps, root, |dir| discovery::list_package_files(dir, extension))?;

    if print_only {
        return Ok(BuildReport {
            exit_code: 0,
            files: Vec::new(),
            rendered: Some(render_plan(&steps)),
            kept_workspace: None,
        });
    }

    let workspace = Workspace::create(config.build.keep_workspace)?;
    let pipeline = ExpansionPipeline::new(config.expand.clone());
    let files = workspace.populate(&pipeline, root, &steps)?;
    let code = run_plan(&steps, workspace.path())?;
    let kept_workspace = workspace.finish()?;
    Ok(BuildReport {
        exit_code: code,
        files,
        rendered: None,
        kept_workspace,
    })
}
