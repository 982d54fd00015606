// Analysis pipeline: build, filter and resolve a repository structure

pub mod builder;
pub mod cache;
pub mod filter;
pub mod graph;
pub mod imports;
pub mod resolver;
pub mod structure;
pub mod symbols;

pub use builder::*;
pub use cache::*;
pub use filter::*;
pub use graph::*;
pub use imports::*;
pub use resolver::*;
pub use structure::*;
pub use symbols::*;

use crate::config::Config;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Output of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    /// Structure only
    Structure(RepoStructure),
    /// Structure with resolved dependency edges
    Graph(DependencyGraph),
}

impl Analysis {
    pub fn structure(&self) -> &RepoStructure {
        match self {
            Analysis::Structure(structure) => structure,
            Analysis::Graph(graph) => graph.structure(),
        }
    }

    pub fn graph(&self) -> Option<&DependencyGraph> {
        match self {
            Analysis::Structure(_) => None,
            Analysis::Graph(graph) => Some(graph),
        }
    }
}

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Commit the tree is checked out at; enables structure caching
    pub commit: Option<String>,
    /// Keep test files (projects whose tests are the product)
    pub test_framework_aware: bool,
    /// Resolve dependency edges
    pub with_graph: bool,
}

/// Main entry point that orchestrates the pipeline
pub struct Surveyor {
    config: Config,
    builder: StructureBuilder,
    filter: FileFilter,
    cache: StructureCache,
}

impl Surveyor {
    /// Create a surveyor with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let builder = StructureBuilder::new(&config.structure)?;
        let filter = FileFilter::from_config(&config.filter);
        let cache = StructureCache::from_config(&config.cache);

        Ok(Self {
            config,
            builder,
            filter,
            cache,
        })
    }

    /// Show progress while building
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.builder = self.builder.with_verbose(verbose);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    pub fn cache(&self) -> &StructureCache {
        &self.cache
    }

    /// Build the unfiltered structure, reusing a cached one for a known commit
    pub fn build_structure(&mut self, root: &Path, commit: Option<&str>) -> Result<Arc<RepoStructure>> {
        let Some(commit) = commit else {
            return self.builder.build(root, None).map(Arc::new);
        };

        let repo = root
            .canonicalize()
            .unwrap_or_else(|_| root.to_path_buf())
            .to_string_lossy()
            .into_owned();
        let key = CacheKey::for_commit(&repo, commit);
        let builder = &self.builder;
        self.cache.get_or_build(key, || builder.build(root, Some(commit)))
    }

    /// Run the whole pipeline: build, drop non-source and test files, then
    /// optionally resolve over what is left
    pub fn analyze(&mut self, root: &Path, options: &AnalysisOptions) -> Result<Analysis> {
        let mut structure = (*self.build_structure(root, options.commit.as_deref())?).clone();
        self.filter.filter_non_source(&mut structure);
        self.filter.filter_test_files(&mut structure, options.test_framework_aware);

        let analysis = if options.with_graph {
            Analysis::Graph(DependencyGraph::build(structure))
        } else {
            Analysis::Structure(structure)
        };

        info!(files = analysis.structure().len(), "Analysis complete");
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();

        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(
            src.join("main.py"),
            r#"
"""Main module."""
from .utils import helper

def main():
    """Entry point."""
    helper()
"#,
        )
        .unwrap();
        fs::write(
            src.join("utils.py"),
            r#"
"""Utility functions."""

def helper():
    """A helper function."""
    pass
"#,
        )
        .unwrap();
        fs::write(src.join("__init__.py"), "").unwrap();
        fs::write(dir.path().join("README.md"), "# project\n").unwrap();

        let tests = dir.path().join("tests");
        fs::create_dir_all(&tests).unwrap();
        fs::write(
            tests.join("test_utils.py"),
            "from src.utils import helper\n\ndef test_helper():\n    helper()\n",
        )
        .unwrap();

        dir
    }

    fn surveyor() -> Surveyor {
        Surveyor::new(Config::default()).unwrap()
    }

    #[test]
    fn test_surveyor_new() {
        assert!(Surveyor::new(Config::default()).is_ok());

        let mut config = Config::default();
        config.filter.source_extensions.clear();
        assert!(Surveyor::new(config).is_err());
    }

    #[test]
    fn test_analyze_structure_only() {
        let dir = create_test_project();
        let analysis = surveyor().analyze(dir.path(), &AnalysisOptions::default()).unwrap();

        assert!(analysis.graph().is_none());
        let paths: Vec<&str> = analysis.structure().paths().collect();
        assert_eq!(paths, vec!["src/__init__.py", "src/main.py", "src/utils.py"]);
    }

    #[test]
    fn test_analyze_with_graph() {
        let dir = create_test_project();
        let options = AnalysisOptions {
            with_graph: true,
            ..AnalysisOptions::default()
        };
        let analysis = surveyor().analyze(dir.path(), &options).unwrap();
        let graph = analysis.graph().unwrap();

        let main = SymbolId::new("src/main.py", "main");
        let calls: Vec<&DependencyEdge> = graph.edges_from_symbol(&main).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, SymbolId::new("src/utils.py", "helper"));
        assert_eq!(calls[0].kind, EdgeKind::Call);
        assert!(graph.check_integrity());
        assert!(!graph.structure().contains("tests/test_utils.py"));
    }

    #[test]
    fn test_test_framework_aware_keeps_tests() {
        let dir = create_test_project();
        let options = AnalysisOptions {
            test_framework_aware: true,
            ..AnalysisOptions::default()
        };
        let analysis = surveyor().analyze(dir.path(), &options).unwrap();
        assert!(analysis.structure().contains("tests/test_utils.py"));
    }

    #[test]
    fn test_structure_cached_per_commit() {
        let dir = create_test_project();
        let mut surveyor = surveyor();

        let first = surveyor.build_structure(dir.path(), Some("abc")).unwrap();
        let second = surveyor.build_structure(dir.path(), Some("abc")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(surveyor.cache().hits(), 1);

        surveyor.build_structure(dir.path(), None).unwrap();
        assert_eq!(surveyor.cache().len(), 1);
    }

    #[test]
    fn test_test_files_never_win_tie_break() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("pkg/test_support.py"), "def helper(): pass\n").unwrap();
        fs::write(dir.path().join("lib/helpers.py"), "def helper(): pass\n").unwrap();
        fs::write(dir.path().join("pkg/main.py"), "def main():\n    helper()\n").unwrap();

        let options = AnalysisOptions {
            with_graph: true,
            ..AnalysisOptions::default()
        };
        let analysis = surveyor().analyze(dir.path(), &options).unwrap();
        let graph = analysis.graph().unwrap();

        let main = SymbolId::new("pkg/main.py", "main");
        let targets: Vec<String> = graph.edges_from_symbol(&main).map(|e| e.to.to_string()).collect();
        assert_eq!(targets, vec!["lib/helpers.py:helper"]);
    }

    #[test]
    fn test_analyze_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = surveyor()
            .analyze(&dir.path().join("missing"), &AnalysisOptions::default())
            .unwrap_err();
        assert!(err.is_repo_access());
    }
}
