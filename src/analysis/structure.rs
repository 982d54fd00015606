// Repository structure: every file's structural model keyed by relative path

use crate::analysis::symbols::SymbolId;
use crate::parser::FileEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All file entries of one extraction run, in tree traversal order.
///
/// Files live in a flat arena; the path index gives O(1) lookup and
/// insertion order is the rendering order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StructureData", into = "StructureData")]
pub struct RepoStructure {
    /// Commit the tree was checked out at, when known
    pub commit: Option<String>,
    files: Vec<FileEntry>,
    index: HashMap<String, usize>,
}

#[derive(Clone, Serialize, Deserialize)]
struct StructureData {
    commit: Option<String>,
    files: Vec<FileEntry>,
}

impl From<StructureData> for RepoStructure {
    fn from(data: StructureData) -> Self {
        let mut structure = RepoStructure::new(data.commit);
        for file in data.files {
            structure.insert(file);
        }
        structure
    }
}

impl From<RepoStructure> for StructureData {
    fn from(structure: RepoStructure) -> Self {
        Self {
            commit: structure.commit,
            files: structure.files,
        }
    }
}

impl RepoStructure {
    /// Create an empty structure
    pub fn new(commit: Option<String>) -> Self {
        Self {
            commit,
            files: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a file; an existing entry for the same path is replaced in place
    pub fn insert(&mut self, file: FileEntry) -> Option<FileEntry> {
        match self.index.get(&file.path) {
            Some(&idx) => Some(std::mem::replace(&mut self.files[idx], file)),
            None => {
                self.index.insert(file.path.clone(), self.files.len());
                self.files.push(file);
                None
            }
        }
    }

    /// Get a file by relative path
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.index.get(path).map(|&idx| &self.files[idx])
    }

    /// Check if a path is present
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Remove a file, keeping the order of the rest
    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        let idx = self.index.remove(path)?;
        let removed = self.files.remove(idx);
        self.reindex();
        Some(removed)
    }

    /// Keep only the files matching the predicate, preserving order
    pub fn retain<F: FnMut(&FileEntry) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.files.len();
        self.files.retain(|f| keep(f));
        if self.files.len() != before {
            self.reindex();
        }
        before - self.files.len()
    }

    fn reindex(&mut self) {
        self.index = self
            .files
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.path.clone(), idx))
            .collect();
    }

    /// Iterate over files in traversal order
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter()
    }

    /// Iterate over paths in traversal order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check whether a symbol id names something defined in this structure
    pub fn contains_symbol(&self, symbol: &SymbolId) -> bool {
        match (self.get(&symbol.path), &symbol.qualified_name) {
            (Some(_), None) => true,
            (Some(file), Some(name)) => file.is_parseable && file.defines(name),
            (None, _) => false,
        }
    }

    /// Summary counts
    pub fn stats(&self) -> StructureStats {
        let parseable: Vec<&FileEntry> = self.files.iter().filter(|f| f.is_parseable).collect();
        StructureStats {
            files: self.files.len(),
            unparseable: self.files.len() - parseable.len(),
            classes: parseable.iter().map(|f| f.classes.len()).sum(),
            functions: parseable
                .iter()
                .map(|f| f.functions.len() + f.classes.iter().map(|c| c.methods.len()).sum::<usize>())
                .sum(),
        }
    }
}

/// Summary counts for a structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStats {
    pub files: usize,
    pub unparseable: usize,
    pub classes: usize,
    /// Top-level functions plus methods
    pub functions: usize,
}
