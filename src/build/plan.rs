//! Dry-run plan parsing and rewriting.
//!
//! A dry-run plan is the command listing the build tool prints with `-n`.
//! Commands are grouped under headers naming the package directory:
//!
//! ```text
//! #
//! # _/home/me/proj/cmd
//! #
//!
//! mkdir -p $WORK/b001/
//! compile -o $WORK/b001/_pkg_.a -p main ./main.go ./util.go
//! ```
//!
//! Everything here is a pure function over that text.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::GuardError;

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^# _(.+)$").expect("valid header regex"));
/// A command that names at least one `./*.go` file.
static COMPILE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+?(\./.+?\.go).*?$").expect("valid compile regex"));
/// The file tail of a compile line, from the first `./` to the end.
static FILE_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\./.+$").expect("valid file regex"));

/// Commands of one package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub dir: String,
    pub commands: Vec<String>,
}

/// Groups the plan's commands under their directory headers.
///
/// Blank lines and other comment lines are dropped. A header with no
/// commands before the next header produces no step, and commands printed
/// before the first header join the first step.
pub fn parse_plan(text: &str) -> Vec<BuildStep> {
    let mut steps = Vec::new();
    let mut dir: Option<String> = None;
    let mut commands = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if let Some(captures) = HEADER.captures(line) {
                if dir.is_some() && !commands.is_empty() {
                    steps.push(BuildStep {
                        dir: dir.take().unwrap_or_default(),
                        commands: std::mem::take(&mut commands),
                    });
                }
                dir = Some(captures[1].to_string());
            }
            continue;
        }
        commands.push(line.to_string());
    }
    if !commands.is_empty() {
        steps.push(BuildStep {
            dir: dir.unwrap_or_default(),
            commands,
        });
    }
    steps
}

pub fn is_compile_line(command: &str) -> bool {
    COMPILE_LINE.is_match(command)
}

/// The `./name.go` arguments of every compile line, in plan order.
pub fn source_files(steps: &[BuildStep]) -> Vec<String> {
    steps
        .iter()
        .flat_map(|step| &step.commands)
        .filter(|command| is_compile_line(command))
        .filter_map(|command| FILE_TAIL.find(command))
        .flat_map(|tail| tail.as_str().split(' ').map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Points every compile line at the workspace copies of its package files.
///
/// `lister` returns the source files of a step's directory; each becomes a
/// quoted `"$WORK/<path relative to root>"` argument replacing the original
/// `./...` tail.
pub fn rewrite_plan<F>(steps: &mut [BuildStep], root: &Path, mut lister: F) -> Result<(), GuardError>
where
    F: FnMut(&Path) -> Result<Vec<PathBuf>, GuardError>,
{
    for step in steps.iter_mut() {
        let dir = PathBuf::from(&step.dir);
        for command in step.commands.iter_mut() {
            if !is_compile_line(command) {
                continue;
            }
            let files = lister(&dir)?;
            let suffix = files
                .iter()
                .map(|file| workspace_argument(file, root))
                .collect::<Vec<_>>()
                .join(" ");
            *command = format!("{}{}", FILE_TAIL.replace(command, ""), suffix);
        }
    }
    Ok(())
}

fn workspace_argument(file: &Path, root: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let relative = relative.to_string_lossy();
    let relative = relative.trim_start_matches('/');
    format!("\"$WORK/{}\"", escape_filename(relative))
}

/// Renders steps in the dry-run layout.
pub fn render_plan(steps: &[BuildStep]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&format!("\n#\n# _{}\n#\n\n", step.dir));
        for command in &step.commands {
            out.push_str(command);
            out.push('\n');
        }
    }
    out
}

/// Escapes the characters that stay special inside double quotes in `sh`.
pub fn escape_filename(name: &str) -> Cow<'_, str> {
    if !name.contains(|c: char| matches!(c, '\\' | '"' | '$')) {
        return Cow::Borrowed(name);
    }
    let mut escaped = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if matches!(c, '\\' | '"' | '$') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

/// Exit code to propagate for a finished child process.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
