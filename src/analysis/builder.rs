// Repository traversal and per-file parsing

use crate::analysis::structure::RepoStructure;
use crate::config::StructureConfig;
use crate::error::{Error, Result};
use crate::parser::{FileEntry, PythonParser};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Walks a checked-out tree and parses every file into a [`RepoStructure`]
pub struct StructureBuilder {
    ignore: Vec<Pattern>,
    parallel: bool,
    verbose: bool,
}

impl StructureBuilder {
    /// Create a builder; fails if an ignore pattern is not a valid glob
    pub fn new(config: &StructureConfig) -> Result<Self> {
        let ignore = config
            .ignore_dirs
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            ignore,
            parallel: config.parallel,
            verbose: false,
        })
    }

    /// Show a progress bar while parsing
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the structure of the tree rooted at `root`.
    ///
    /// The tree is expected to be checked out at `commit_ref` already; the
    /// ref is only recorded. No file filter is applied here.
    pub fn build(&self, root: &Path, commit_ref: Option<&str>) -> Result<RepoStructure> {
        check_root(root)?;

        let files = self.discover(root);
        info!(root = %root.display(), files = files.len(), "Building repository structure");

        let progress = self.progress_bar(files.len());
        let entries: Vec<FileEntry> = if self.parallel {
            // Surface grammar setup errors once before fanning out
            PythonParser::new()?;
            files
                .par_iter()
                .map_init(
                    || PythonParser::new().ok(),
                    |parser, (rel, abs)| {
                        let entry = read_entry(parser.as_mut(), rel, abs);
                        progress.inc(1);
                        entry
                    },
                )
                .collect()
        } else {
            let mut parser = PythonParser::new()?;
            files
                .iter()
                .map(|(rel, abs)| {
                    let entry = read_entry(Some(&mut parser), rel, abs);
                    progress.inc(1);
                    entry
                })
                .collect()
        };
        progress.finish_and_clear();

        let mut structure = RepoStructure::new(commit_ref.map(str::to_string));
        for entry in entries {
            structure.insert(entry);
        }

        let stats = structure.stats();
        debug!(
            files = stats.files,
            unparseable = stats.unparseable,
            classes = stats.classes,
            functions = stats.functions,
            "Structure built"
        );
        Ok(structure)
    }

    /// Collect `(relative, absolute)` paths in traversal order
    fn discover(&self, root: &Path) -> Vec<(String, PathBuf)> {
        let walker = WalkDir::new(root)
            .sort_by(traversal_order)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_ignored_dir(e));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_path(root, entry.path()) {
                files.push((rel, entry.into_path()));
            }
        }
        files
    }

    fn is_ignored_dir(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.ignore.iter().any(|p| p.matches(&name))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.verbose {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Parsing");
        pb
    }
}

/// Fail with `RepoAccess` when the root is missing, not a directory, or unreadable
fn check_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|e| Error::repo_access(root, e.to_string()))?;
    if !metadata.is_dir() {
        return Err(Error::repo_access(root, "not a directory"));
    }
    std::fs::read_dir(root).map_err(|e| Error::repo_access(root, e.to_string()))?;
    Ok(())
}

/// Directories before files, then by name
fn traversal_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir.cmp(&a_dir).then_with(|| a.file_name().cmp(b.file_name()))
}

/// `/`-joined path relative to the root
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Read and parse one file; failures degrade to an unparseable entry
fn read_entry(parser: Option<&mut PythonParser>, rel: &str, abs: &Path) -> FileEntry {
    let bytes = match std::fs::read(abs) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file = %rel, "failed to read: {}", e);
            return FileEntry::unparseable(rel, "");
        }
    };

    match (String::from_utf8(bytes), parser) {
        (Ok(text), Some(parser)) => parser.parse(rel, &text),
        (Ok(text), None) => FileEntry::unparseable(rel, text),
        (Err(e), _) => {
            debug!(file = %rel, "not valid UTF-8");
            FileEntry::unparseable(rel, String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
