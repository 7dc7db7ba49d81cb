//! Validator options.

use crate::core::declaration::DEFAULT_GROUP;
use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Validation options.
///
/// Options can be built in code with the `with_*` methods or loaded from a
/// TOML document:
///
/// ```toml
/// groups = ["Default", "Strict"]
/// catch_panics = true
/// strict_resolution = false
/// parallel = true
/// max_threads = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Groups whose declarations run.
    pub groups: Vec<String>,
    /// Convert a panicking callback into a `ValidationFault` instead of unwinding.
    pub catch_panics: bool,
    /// Abort the run on the first declaration that fails to resolve.
    pub strict_resolution: bool,
    /// Validate independent objects of a batch in parallel.
    pub parallel: bool,
    /// Maximum number of parallel threads (0 = use rayon's global pool).
    pub max_threads: usize,
    /// Reuse resolutions across runs.
    pub cache_resolutions: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            groups: vec![DEFAULT_GROUP.to_string()],
            catch_panics: true,
            strict_resolution: false,
            parallel: true,
            max_threads: 0,
            cache_resolutions: true,
        }
    }
}

impl ValidatorOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(source)?;
        options.check()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.groups.is_empty() {
            return Err(ConfigError::Invalid("at least one group is required".to_string()));
        }
        if let Some(blank) = self.groups.iter().find(|g| g.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank group name {:?}", blank)));
        }
        Ok(())
    }

    /// Set the groups to validate.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Enable/disable panic catching.
    pub fn with_catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    /// Enable/disable strict resolution.
    pub fn with_strict_resolution(mut self, strict: bool) -> Self {
        self.strict_resolution = strict;
        self
    }

    /// Enable/disable parallel batch validation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set maximum threads.
    pub fn with_max_threads(mut self, max: usize) -> Self {
        self.max_threads = max;
        self
    }

    /// Enable/disable the resolution cache.
    pub fn with_cache_resolutions(mut self, cache: bool) -> Self {
        self.cache_resolutions = cache;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = ValidatorOptions::default();
        assert_eq!(options.groups, vec!["Default".to_string()]);
        assert!(options.catch_panics);
        assert!(!options.strict_resolution);
        assert!(options.cache_resolutions);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options = ValidatorOptions::from_toml_str("strict_resolution = true\nmax_threads = 2\n").unwrap();
        assert!(options.strict_resolution);
        assert_eq!(options.max_threads, 2);
        assert_eq!(options.groups, vec!["Default".to_string()]);
    }

    #[test]
    fn test_empty_groups_rejected() {
        let result = ValidatorOptions::from_toml_str("groups = []");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = ValidatorOptions::from_toml_str("groups = [\" \"]");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_toml() {
        let result = ValidatorOptions::from_toml_str("parallel = \"yes\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "groups = [\"Default\", \"Strict\"]").unwrap();
        writeln!(file, "catch_panics = false").unwrap();

        let options = ValidatorOptions::from_file(file.path()).unwrap();
        assert_eq!(options.groups, vec!["Default".to_string(), "Strict".to_string()]);
        assert!(!options.catch_panics);
    }

    #[test]
    fn test_missing_file() {
        let result = ValidatorOptions::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_builder() {
        let options = ValidatorOptions::new()
            .with_groups(["Strict"])
            .with_parallel(false)
            .with_cache_resolutions(false);
        assert_eq!(options.groups, vec!["Strict".to_string()]);
        assert!(!options.parallel);
        assert!(!options.cache_resolutions);
    }
}
