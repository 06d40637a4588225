//! # Build orchestration
//!
//! Runs the real build tool against expanded sources without touching the
//! user's tree:
//!
//! 1. ask the tool for its dry-run plan (`<tool> build -n`),
//! 2. expand every package directory of the plan into a scratch workspace,
//! 3. point the plan's compile lines at the expanded copies,
//! 4. run the plan through the shell with `WORK` set to the workspace.
//!
//! [`plan`] is pure text processing; [`workspace`] and [`runner`] hold the
//! side effects.

pub mod plan;
pub mod runner;
pub mod workspace;

pub use plan::{escape_filename, exit_code, parse_plan, render_plan, rewrite_plan, source_files, BuildStep};
pub use runner::{dry_run, passthrough, run_build, run_plan, BuildReport};
pub use workspace::Workspace;
