pub use crate::errors::{GuardError, Warning, WarningKind};
pub use crate::engine::{ExpandOutput, ExpansionPipeline};

pub mod ast;
pub mod build;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod macros;
pub mod syntax;
pub mod validation;
