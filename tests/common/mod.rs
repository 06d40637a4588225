//! # guardex test helpers
//!
//! Shared by the integration tests: expand a source text with the default
//! configuration and pick results apart.

#![allow(dead_code)]

use guardex::config::ExpandConfig;
use guardex::errors::{GuardError, SourceContext};
use guardex::{ExpandOutput, ExpansionPipeline, Warning, WarningKind};

pub fn expand(text: &str) -> Result<ExpandOutput, GuardError> {
    expand_with(ExpandConfig::default(), text)
}

pub fn expand_with(config: ExpandConfig, text: &str) -> Result<ExpandOutput, GuardError> {
    ExpansionPipeline::new(config).expand_source(&SourceContext::from_file("test.go", text))
}

/// Expands and fails the test on any error.
pub fn expand_ok(text: &str) -> ExpandOutput {
    match expand(text) {
        Ok(output) => output,
        Err(e) => panic!("expansion failed: {e}\n--- input ---\n{text}"),
    }
}

pub fn count_kind(warnings: &[Warning], kind: WarningKind) -> usize {
    warnings.iter().filter(|w| w.kind == kind).count()
}

/// Number of lines equal to `line` once leading tabs are removed.
pub fn count_lines(text: &str, line: &str) -> usize {
    text.lines().filter(|l| l.trim_start_matches('\t') == line).count()
}

/// The indented body of the function named `name`, leading tabs removed.
pub fn function_body(text: &str, name: &str) -> Vec<String> {
    let header = format!("func {name}(");
    let mut lines = text.lines().skip_while(|l| !l.starts_with(&header));
    lines.next();
    lines
        .take_while(|l| *l != "}")
        .map(|l| l.trim_start_matches('\t').to_string())
        .collect()
}
