//! Configuration for guardex, loaded from YAML.
//!
//! Every field has a default, so an absent or partial `guardex.yaml` is fine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::GuardError;

/// Name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "guardex.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub expand: ExpandConfig,
    pub build: BuildConfig,
}

/// Names the expander recognizes and synthesizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpandConfig {
    /// Identifier of the guard macro
    pub guard_ident: String,
    /// Name of the synthesized failure-capture variable
    pub capture_var: String,
    /// Result type that marks the failure slot
    pub error_type: String,
    pub fatal_token: String,
    pub return_token: String,
    /// Process-terminating log call used by the abort action
    pub fatal_func: String,
    /// Non-terminating log call used before a propagating return
    pub print_func: String,
    /// Import path that provides the log calls
    pub log_import: String,
    /// Prefix of synthesized zero-value locals (`ret0`, `ret1`, ...)
    pub zero_prefix: String,
    /// Extension of source files picked up by tree expansion
    pub extension: String,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            guard_ident: "guard".into(),
            capture_var: "err".into(),
            error_type: "error".into(),
            fatal_token: "FATAL".into(),
            return_token: "RETURN".into(),
            fatal_func: "log.Fatal".into(),
            print_func: "log.Print".into(),
            log_import: "log".into(),
            zero_prefix: "ret".into(),
            extension: "go".into(),
        }
    }
}

impl ExpandConfig {
    /// Package name under which `log_import` is referenced.
    pub fn log_package(&self) -> &str {
        self.log_import
            .rsplit('/')
            .next()
            .unwrap_or(self.log_import.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// The build tool invoked for plans and passthrough commands
    pub tool: String,
    /// Leave the scratch workspace on disk after a build
    pub keep_workspace: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tool: "go".into(),
            keep_workspace: false,
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Self, GuardError> {
        let config: Config = serde_yaml::from_str(text)
            .map_err(|e| GuardError::config(format!("cannot parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else `guardex.yaml` when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, GuardError> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let text = std::fs::read_to_string(path).map_err(|e| GuardError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> Result<(), GuardError> {
        let names = [
            ("expand.guard_ident", &self.expand.guard_ident),
            ("expand.capture_var", &self.expand.capture_var),
            ("expand.error_type", &self.expand.error_type),
            ("expand.fatal_token", &self.expand.fatal_token),
            ("expand.return_token", &self.expand.return_token),
            ("expand.zero_prefix", &self.expand.zero_prefix),
        ];
        for (field, value) in names {
            if !is_identifier(value) {
                return Err(GuardError::config(format!(
                    "{field} must be an identifier, got '{value}'"
                )));
            }
        }
        if self.expand.fatal_token == self.expand.return_token {
            return Err(GuardError::config(
                "expand.fatal_token and expand.return_token must differ",
            ));
        }
        for (field, value) in [
            ("expand.fatal_func", &self.expand.fatal_func),
            ("expand.print_func", &self.expand.print_func),
        ] {
            if !value.split('.').all(is_identifier) || value.split('.').count() > 2 {
                return Err(GuardError::config(format!(
                    "{field} must be `name` or `package.name`, got '{value}'"
                )));
            }
        }
        if self.build.tool.trim().is_empty() {
            return Err(GuardError::config("build.tool must not be empty"));
        }
        Ok(())
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml_str("expand:\n  guard_ident: try\n").unwrap();
        assert_eq!(config.expand.guard_ident, "try");
        assert_eq!(config.expand.capture_var, "err");
        assert_eq!(config.build.tool, "go");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::from_yaml_str("expand:\n  guard: try\n").is_err());
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        assert!(Config::from_yaml_str("expand:\n  capture_var: \"1err\"\n").is_err());
        assert!(Config::from_yaml_str("expand:\n  fatal_func: \"a.b.c\"\n").is_err());
    }

    #[test]
    fn log_package_is_last_path_segment() {
        let mut config = ExpandConfig::default();
        assert_eq!(config.log_package(), "log");
        config.log_import = "github.com/sirupsen/logrus".into();
        assert_eq!(config.log_package(), "logrus");
    }
}
