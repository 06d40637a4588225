//! Command-line arguments and subcommands for guardex.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "guardex",
    version,
    about = "Expands guard(...) calls in Go sources into explicit error handling."
)]
pub struct GuardexArgs {
    /// Configuration file (defaults to ./guardex.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Expand one file and print the result.
    Expand {
        #[arg(required = true)]
        file: PathBuf,
        /// Show a line diff against the input instead of the full output
        #[arg(long)]
        diff: bool,
        /// Write the expanded file here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Expand in memory and report warnings; fails when a guard survives.
    Check {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Expand a whole source tree into another directory.
    Gen {
        /// Output directory
        #[arg(required = true)]
        out: PathBuf,
        /// Source root
        #[arg(long, default_value = ".")]
        src: PathBuf,
    },
    /// Show the syntax tree of a file.
    Ast {
        #[arg(required = true)]
        file: PathBuf,
        /// Emit JSON instead of the debug representation
        #[arg(long)]
        json: bool,
    },
    /// Build the current package from expanded sources.
    Build {
        /// Print the rewritten plan instead of running it
        #[arg(short = 'n')]
        dry_run: bool,
        /// Arguments passed on to `<tool> build -n`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Any other command is forwarded to the build tool.
    #[command(external_subcommand)]
    External(Vec<String>),
}
