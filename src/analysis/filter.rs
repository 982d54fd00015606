// File filters applied to a built structure
//
// Both filters only remove entries and never reorder the rest, so applying
// one twice gives the same result as applying it once.

use crate::analysis::graph::DependencyGraph;
use crate::analysis::structure::RepoStructure;
use crate::config::FilterConfig;
use crate::parser::FileEntry;
use tracing::debug;

/// A collection of file entries that can be filtered in place
pub trait FileSet {
    /// Keep the entries matching the predicate; returns how many were removed
    fn retain_files<F: FnMut(&FileEntry) -> bool>(&mut self, keep: F) -> usize;
}

impl FileSet for RepoStructure {
    fn retain_files<F: FnMut(&FileEntry) -> bool>(&mut self, keep: F) -> usize {
        self.retain(keep)
    }
}

impl FileSet for DependencyGraph {
    fn retain_files<F: FnMut(&FileEntry) -> bool>(&mut self, keep: F) -> usize {
        DependencyGraph::retain_files(self, keep)
    }
}

/// Path-based source and test predicates
#[derive(Debug, Clone)]
pub struct FileFilter {
    source_extensions: Vec<String>,
    test_markers: Vec<String>,
}

impl FileFilter {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            source_extensions: config
                .source_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            test_markers: config.test_markers.iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// Whether the path has a recognized source extension
    pub fn is_source(&self, path: &str) -> bool {
        let name = file_name(path);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_lowercase();
                self.source_extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }

    /// Whether the path follows a test naming convention.
    ///
    /// A directory or file name starting with a marker (`tests/`,
    /// `test_models.py`) or a file stem ending in `_<marker>` or
    /// `_<marker>s` (`models_test.py`) counts.
    pub fn is_test_file(&self, path: &str) -> bool {
        let lowered = path.to_lowercase();
        let mut segments: Vec<&str> = lowered.split('/').filter(|s| !s.is_empty()).collect();
        let Some(name) = segments.pop() else {
            return false;
        };
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);

        self.test_markers.iter().any(|marker| {
            segments.iter().any(|dir| dir.starts_with(marker.as_str()))
                || stem.starts_with(marker.as_str())
                || stem.ends_with(&format!("_{}", marker))
                || stem.ends_with(&format!("_{}s", marker))
        })
    }

    /// Remove every entry without a source extension
    pub fn filter_non_source<S: FileSet>(&self, set: &mut S) -> usize {
        let removed = set.retain_files(|f| self.is_source(&f.path));
        debug!(removed, "Filtered non-source files");
        removed
    }

    /// Remove test files unless the project is test-framework-aware
    pub fn filter_test_files<S: FileSet>(&self, set: &mut S, test_framework_aware: bool) -> usize {
        if test_framework_aware {
            return 0;
        }
        let removed = set.retain_files(|f| !self.is_test_file(&f.path));
        debug!(removed, "Filtered test files");
        removed
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(paths: &[&str]) -> RepoStructure {
        let mut structure = RepoStructure::default();
        for path in paths {
            structure.insert(FileEntry::new(*path, ""));
        }
        structure
    }

    fn paths(structure: &RepoStructure) -> Vec<&str> {
        structure.paths().collect()
    }

    #[test]
    fn test_is_source() {
        let filter = FileFilter::default();
        assert!(filter.is_source("pkg/mod.py"));
        assert!(filter.is_source("setup.PY"));
        assert!(!filter.is_source("README.md"));
        assert!(!filter.is_source("Makefile"));
        assert!(!filter.is_source(".py"));
        assert!(!filter.is_source("pkg/mod.pyc"));
    }

    #[test]
    fn test_is_test_file() {
        let filter = FileFilter::default();
        assert!(filter.is_test_file("tests/test_models.py"));
        assert!(filter.is_test_file("pkg/testing/utils.py"));
        assert!(filter.is_test_file("pkg/test_models.py"));
        assert!(filter.is_test_file("pkg/models_test.py"));
        assert!(filter.is_test_file("pkg/models_tests.py"));
        assert!(!filter.is_test_file("pkg/models.py"));
        assert!(!filter.is_test_file("pkg/contest.py"));
        assert!(!filter.is_test_file("attestation/sign.py"));
    }

    #[test]
    fn test_custom_markers() {
        let config = FilterConfig {
            test_markers: vec!["spec".to_string()],
            ..FilterConfig::default()
        };
        let filter = FileFilter::from_config(&config);
        assert!(filter.is_test_file("spec/models.py"));
        assert!(!filter.is_test_file("tests/models.py"));
    }

    #[test]
    fn test_filter_non_source_keeps_order() {
        let filter = FileFilter::default();
        let mut s = structure(&["a.py", "README.md", "b/c.py", "b/data.json", "d.py"]);
        assert_eq!(filter.filter_non_source(&mut s), 2);
        assert_eq!(paths(&s), vec!["a.py", "b/c.py", "d.py"]);
    }

    #[test]
    fn test_filters_are_idempotent() {
        let filter = FileFilter::default();
        let mut s = structure(&["a.py", "tests/test_a.py", "notes.txt", "b_test.py"]);

        filter.filter_non_source(&mut s);
        let once = s.clone();
        assert_eq!(filter.filter_non_source(&mut s), 0);
        assert_eq!(s, once);

        filter.filter_test_files(&mut s, false);
        let once = s.clone();
        assert_eq!(filter.filter_test_files(&mut s, false), 0);
        assert_eq!(s, once);
        assert_eq!(paths(&s), vec!["a.py"]);
    }

    #[test]
    fn test_framework_aware_keeps_tests() {
        let filter = FileFilter::default();
        let mut s = structure(&["a.py", "tests/test_a.py"]);
        assert_eq!(filter.filter_test_files(&mut s, true), 0);
        assert_eq!(s.len(), 2);
    }
}
