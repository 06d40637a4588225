//! Scratch directory holding the expanded shadow copy of a build.

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::discovery;
use crate::engine::{ExpansionPipeline, FileOutcome};
use crate::errors::GuardError;

use super::BuildStep;

/// A temporary directory, removed when dropped unless kept.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    keep: bool,
}

impl Workspace {
    pub fn create(keep: bool) -> Result<Self, GuardError> {
        let dir = tempfile::Builder::new()
            .prefix("guardex-")
            .tempdir()
            .map_err(|e| GuardError::io(std::env::temp_dir(), e))?;
        Ok(Self { dir, keep })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the copy of `dir` lives, mirroring its location below `root`.
    pub fn target_for(&self, dir: &Path, root: &Path) -> PathBuf {
        let relative = dir.strip_prefix(root).unwrap_or(dir);
        let relative: PathBuf = relative
            .components()
            .filter(|component| matches!(component, Component::Normal(_)))
            .collect();
        self.path().join(relative)
    }

    /// Expands the package directory of every step into the workspace.
    pub fn populate(
        &self,
        pipeline: &ExpansionPipeline,
        root: &Path,
        steps: &[BuildStep],
    ) -> Result<Vec<FileOutcome>, GuardError> {
        let mut dirs: Vec<&str> = steps.iter().map(|step| step.dir.as_str()).collect();
        dirs.sort_unstable();
        dirs.dedup();

        let mut outcomes = Vec::new();
        for dir in dirs {
            let dir = Path::new(dir);
            let files = discovery::list_package_files(dir, &pipeline.config.extension)?;
            let target = self.target_for(dir, root);
            outcomes.extend(pipeline.expand_into(dir, &files, &target)?);
        }
        Ok(outcomes)
    }

    /// Removes the workspace, or hands back its path when it is kept.
    pub fn finish(self) -> Result<Option<PathBuf>, GuardError> {
        if self.keep {
            return Ok(Some(self.dir.keep()));
        }
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| GuardError::io(path, e))?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn populate_mirrors_package_directories() {
        let root = tempfile::tempdir().unwrap();
        let pkg = root.path().join("cmd");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("main.go"), "package main\n\nfunc main() {\n\tguard(run())\n}\n").unwrap();

        let workspace = Workspace::create(false).unwrap();
        let steps = vec![BuildStep {
            dir: pkg.display().to_string(),
            commands: vec!["compile ./main.go".to_string()],
        }];
        let outcomes = workspace
            .populate(&ExpansionPipeline::default(), root.path(), &steps)
            .unwrap();
        assert_eq!(outcomes.len(), 1);

        let copy = workspace.path().join("cmd/main.go");
        assert!(fs::read_to_string(&copy).unwrap().contains("log.Fatal(err)"));

        let path = workspace.path().to_path_buf();
        assert_eq!(workspace.finish().unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn kept_workspace_survives_finish() {
        let workspace = Workspace::create(true).unwrap();
        let path = workspace.path().to_path_buf();
        assert_eq!(workspace.finish().unwrap(), Some(path.clone()));
        assert!(path.is_dir());
        fs::remove_dir_all(&path).unwrap();
    }
}
