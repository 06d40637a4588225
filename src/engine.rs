//! # Expansion pipeline
//!
//! Glue between files on disk and the macro expander: read, parse, expand,
//! print, write. Every file is expanded independently, so whole trees are
//! processed in parallel.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::ast::SourceFile;
use crate::config::ExpandConfig;
use crate::discovery;
use crate::errors::{GuardError, SourceContext, Warning};
use crate::macros::{self, MacroContext};
use crate::syntax::{self, lexer};

/// Result of expanding one source text.
#[derive(Debug, Clone)]
pub struct ExpandOutput {
    /// The rewritten text, or the original text when nothing was expanded
    pub text: String,
    pub expanded: usize,
    pub warnings: Vec<Warning>,
}

impl ExpandOutput {
    pub fn changed(&self) -> bool {
        self.expanded > 0
    }

    /// Any guard survived expansion.
    pub fn has_residue(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.kind == crate::errors::WarningKind::ResidueDetected)
    }
}

/// Outcome for one file of a tree expansion.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Path relative to the source root
    pub relative: PathBuf,
    pub output: ExpandOutput,
}

#[derive(Debug, Clone, Default)]
pub struct ExpansionPipeline {
    pub config: ExpandConfig,
}

impl ExpansionPipeline {
    pub fn new(config: ExpandConfig) -> Self {
        Self { config }
    }

    pub fn read_file(&self, path: &Path) -> Result<SourceContext, GuardError> {
        let content = fs::read_to_string(path).map_err(|e| GuardError::io(path, e))?;
        Ok(SourceContext::from_file(path.display().to_string(), content))
    }

    pub fn parse_source(&self, source: &SourceContext) -> Result<SourceFile, GuardError> {
        syntax::parse(source)
    }

    /// Parses, expands and prints `source`.
    ///
    /// Files without guard statements come back byte-for-byte unchanged, which
    /// keeps their comments and layout.
    pub fn expand_source(&self, source: &SourceContext) -> Result<ExpandOutput, GuardError> {
        // files that never name the macro pass through without being parsed
        if !lexer::mentions_ident(&source.content, &self.config.guard_ident) {
            return Ok(ExpandOutput {
                text: source.content.clone(),
                expanded: 0,
                warnings: Vec::new(),
            });
        }
        let mut file = self.parse_source(source)?;
        let ctx = MacroContext::new(&self.config, source);
        let report = macros::expand(&mut file, &ctx)?;
        let text = if report.expanded > 0 {
            syntax::print_file(&file)
        } else {
            source.content.clone()
        };
        Ok(ExpandOutput {
            text,
            expanded: report.expanded,
            warnings: report.warnings,
        })
    }

    pub fn expand_file(&self, path: &Path) -> Result<ExpandOutput, GuardError> {
        let source = self.read_file(path)?;
        self.expand_source(&source)
    }

    /// Expands `files` (all under `src`) into `out`, mirroring their relative
    /// paths. Fails on the first file that cannot be expanded.
    pub fn expand_into(&self, src: &Path, files: &[PathBuf], out: &Path) -> Result<Vec<FileOutcome>, GuardError> {
        files
            .par_iter()
            .map(|path| {
                let relative = path
                    .strip_prefix(src)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.clone());
                let output = self.expand_file(path)?;
                let target = out.join(&relative);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| GuardError::io(parent, e))?;
                }
                fs::write(&target, &output.text).map_err(|e| GuardError::io(&target, e))?;
                Ok(FileOutcome { relative, output })
            })
            .collect()
    }

    /// Expands every source file under `src` into the same layout under `out`.
    pub fn expand_tree(&self, src: &Path, out: &Path) -> Result<Vec<FileOutcome>, GuardError> {
        let files = discovery::discover_sources(src, &self.config.extension)?;
        // The output may live inside the source tree.
        let out_prefix = out.canonicalize().ok();
        let files: Vec<PathBuf> = files
            .into_iter()
            .filter(|path| match (&out_prefix, path.canonicalize()) {
                (Some(prefix), Ok(path)) => !path.starts_with(prefix),
                _ => true,
            })
            .collect();
        self.expand_into(src, &files, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_files_keep_their_comments() {
        let text = "package main\n\n// keep me\nfunc main() {\n}\n";
        let source = SourceContext::from_file("main.go", text);
        let output = ExpansionPipeline::default().expand_source(&source).unwrap();
        assert_eq!(output.text, text);
        assert!(!output.changed());
    }

    #[test]
    fn guard_free_files_outside_the_grammar_pass_through() {
        let text = "package main\n\nfunc Map[T any](xs []T) []T {\n\treturn xs\n}\n";
        let source = SourceContext::from_file("generic.go", text);
        let output = ExpansionPipeline::default().expand_source(&source).unwrap();
        assert_eq!(output.text, text);
        assert_eq!(output.expanded, 0);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn tree_expansion_mirrors_layout() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("cmd")).unwrap();
        fs::write(
            src.path().join("cmd/main.go"),
            "package main\n\nfunc main() {\n\tguard(run())\n}\n",
        )
        .unwrap();
        fs::write(src.path().join("lib.go"), "package main\n").unwrap();

        let outcomes = ExpansionPipeline::default()
            .expand_tree(src.path(), out.path())
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        let main = fs::read_to_string(out.path().join("cmd/main.go")).unwrap();
        assert!(main.contains("err = run()"));
        assert!(main.contains("log.Fatal(err)"));
        assert_eq!(
            fs::read_to_string(out.path().join("lib.go")).unwrap(),
            "package main\n"
        );
    }
}
