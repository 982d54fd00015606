use crate::error::{Error, Result};
use crate::output::RenderMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub structure: StructureConfig,
    pub filter: FilterConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

/// Tree traversal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Glob patterns matched against directory names; matching directories are not descended
    pub ignore_dirs: Vec<String>,
    /// Parse files on the rayon pool
    pub parallel: bool,
}

/// File filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Extensions (without the dot) that count as source files
    pub source_extensions: Vec<String>,
    /// Path segment prefixes that mark a test file
    pub test_markers: Vec<String>,
    /// Instance id prefixes of projects whose tests are part of the product
    pub test_framework_prefixes: Vec<String>,
}

/// Structure cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Byte budget for cached structures
    pub max_bytes: usize,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: RenderMode,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: vec![
                ".git".to_string(),
                ".hg".to_string(),
                ".svn".to_string(),
                "__pycache__".to_string(),
                "node_modules".to_string(),
                "build".to_string(),
                "dist".to_string(),
                ".tox".to_string(),
                ".venv".to_string(),
                "venv".to_string(),
                "*.egg-info".to_string(),
            ],
            parallel: true,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            source_extensions: vec!["py".to_string()],
            test_markers: vec!["test".to_string()],
            test_framework_prefixes: vec!["pytest".to_string()],
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 256 * 1024 * 1024,
        }
    }
}

impl FilterConfig {
    /// Whether an instance belongs to a project whose test files must be kept
    pub fn is_test_framework_instance(&self, instance_id: &str) -> bool {
        self.test_framework_prefixes
            .iter()
            .any(|prefix| instance_id.starts_with(prefix.as_str()))
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("ignoring config {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, mode: Option<RenderMode>, ignore: Vec<String>, sequential: bool) {
        if let Some(mode) = mode {
            self.output.mode = mode;
        }

        if !ignore.is_empty() {
            self.structure.ignore_dirs.extend(ignore);
        }

        if sequential {
            self.structure.parallel = false;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.filter.source_extensions.is_empty() {
            return Err(Error::config_validation(
                "at least one source extension required",
            ));
        }

        if self.filter.test_markers.is_empty() || self.filter.test_markers.iter().any(|m| m.is_empty()) {
            return Err(Error::config_validation("test markers must be non-empty"));
        }

        if self.cache.max_bytes == 0 {
            return Err(Error::config_validation("cache max_bytes must be at least 1"));
        }

        for pattern in &self.structure.ignore_dirs {
            glob::Pattern::new(pattern)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.structure.parallel);
        assert!(config.structure.ignore_dirs.contains(&".git".to_string()));
        assert_eq!(config.filter.source_extensions, vec!["py".to_string()]);
        assert_eq!(config.output.mode, RenderMode::FunctionsWithSignature);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[structure]
parallel = false

[filter]
source_extensions = ["py", "pyi"]

[cache]
max_bytes = 1024

[output]
mode = "files_only"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(!config.structure.parallel);
        assert_eq!(config.filter.source_extensions.len(), 2);
        assert_eq!(config.filter.test_markers, vec!["test".to_string()]);
        assert_eq!(config.cache.max_bytes, 1024);
        assert_eq!(config.output.mode, RenderMode::FilesOnly);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/surveyor.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/surveyor.toml"));
        assert!(config.structure.parallel);
    }

    #[test]
    fn test_validation_empty_extensions() {
        let mut config = Config::default();
        config.filter.source_extensions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_marker() {
        let mut config = Config::default();
        config.filter.test_markers.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_cache() {
        let mut config = Config::default();
        config.cache.max_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_ignore_pattern() {
        let mut config = Config::default();
        config.structure.ignore_dirs.push("[unclosed".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_cli() {
        let mut config = Config::default();
        let initial = config.structure.ignore_dirs.len();
        config.merge_cli(Some(RenderMode::FilesOnly), vec!["docs".to_string()], true);
        assert_eq!(config.output.mode, RenderMode::FilesOnly);
        assert_eq!(config.structure.ignore_dirs.len(), initial + 1);
        assert!(!config.structure.parallel);
    }

    #[test]
    fn test_merge_cli_keeps_defaults() {
        let mut config = Config::default();
        config.merge_cli(None, vec![], false);
        assert_eq!(config.output.mode, RenderMode::FunctionsWithSignature);
        assert!(config.structure.parallel);
    }

    #[test]
    fn test_test_framework_instance() {
        let filter = FilterConfig::default();
        assert!(filter.is_test_framework_instance("pytest-dev__pytest-5103"));
        assert!(!filter.is_test_framework_instance("django__django-11099"));
    }

    #[test]
    fn test_render_mode_parsing() {
        let toml_str = r#"mode = "functions_no_signature""#;
        let output: OutputConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(output.mode, RenderMode::FunctionsNoSignature);
    }
}
