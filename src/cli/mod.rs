//! The guardex command-line interface.
//!
//! Every handler returns the process exit code; errors are rendered with
//! miette and exit with status 1.

use clap::Parser;
use std::path::Path;
use std::{env, fs, process};

use crate::build;
use crate::cli::args::{Command, GuardexArgs};
use crate::config::Config;
use crate::engine::ExpansionPipeline;
use crate::errors::{print_error, ErrorKind, GuardError};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = GuardexArgs::parse();
    match dispatch(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            print_error(e);
            process::exit(1);
        }
    }
}

fn dispatch(args: GuardexArgs) -> Result<i32, GuardError> {
    let config = Config::load(args.config.as_deref())?;
    match args.command {
        Command::Expand { file, diff, output } => handle_expand(&config, &file, diff, output.as_deref()),
        Command::Check { file } => handle_check(&config, &file),
        Command::Gen { out, src } => handle_gen(&config, &src, &out),
        Command::Ast { file, json } => handle_ast(&config, &file, json),
        Command::Build { dry_run, args } => handle_build(&config, dry_run, &args),
        Command::External(args) => build::passthrough(&config.build.tool, &args),
    }
}

fn handle_expand(config: &Config, file: &Path, diff: bool, target: Option<&Path>) -> Result<i32, GuardError> {
    let pipeline = ExpansionPipeline::new(config.expand.clone());
    let source = pipeline.read_file(file)?;
    let expanded = pipeline.expand_source(&source)?;
    output::print_warnings(&expanded.warnings);

    if diff {
        output::print_expansion_diff(&source.content, &expanded.text);
    } else if let Some(target) = target {
        fs::write(target, &expanded.text).map_err(|e| GuardError::io(target, e))?;
        output::print_status(
            "Expanded",
            &format!("{} guard(s) into {}", expanded.expanded, target.display()),
        );
    } else {
        print!("{}", expanded.text);
    }
    Ok(0)
}

fn handle_check(config: &Config, file: &Path) -> Result<i32, GuardError> {
    let expanded = ExpansionPipeline::new(config.expand.clone()).expand_file(file)?;
    output::print_warnings(&expanded.warnings);
    if expanded.has_residue() {
        output::print_notice("Residue", &format!("{} still contains guard usages", file.display()));
        return Ok(1);
    }
    output::print_status(
        "Checked",
        &format!("{}: {} guard(s) expand cleanly", file.display(), expanded.expanded),
    );
    Ok(0)
}

fn handle_gen(config: &Config, src: &Path, out: &Path) -> Result<i32, GuardError> {
    let outcomes = ExpansionPipeline::new(config.expand.clone()).expand_tree(src, out)?;
    let mut expanded = 0;
    for outcome in &outcomes {
        output::print_warnings(&outcome.output.warnings);
        expanded += outcome.output.expanded;
    }
    output::print_status(
        "Generated",
        &format!(
            "{} file(s), {} guard(s) expanded, into {}",
            outcomes.len(),
            expanded,
            out.display()
        ),
    );
    Ok(0)
}

fn handle_ast(config: &Config, file: &Path, json: bool) -> Result<i32, GuardError> {
    let pipeline = ExpansionPipeline::new(config.expand.clone());
    let tree = pipeline.parse_source(&pipeline.read_file(file)?)?;
    if json {
        let text = serde_json::to_string_pretty(&tree).map_err(|e| {
            GuardError::environment(ErrorKind::InternalConsistency {
                message: format!("cannot serialize syntax tree: {e}"),
            })
        })?;
        println!("{text}");
    } else {
        println!("{tree:#?}");
    }
    Ok(0)
}

fn handle_build(config: &Config, dry_run: bool, args: &[String]) -> Result<i32, GuardError> {
    let root = env::current_dir().map_err(|e| GuardError::io(".", e))?;
    let report = build::run_build(config, &root, dry_run, args)?;
    for outcome in &report.files {
        output::print_warnings(&outcome.output.warnings);
    }
    if let Some(rendered) = &report.rendered {
        print!("{rendered}");
    }
    if let Some(kept) = &report.kept_workspace {
        output::print_notice("Kept", &format!("workspace at {}", kept.display()));
    }
    Ok(report.exit_code)
}
