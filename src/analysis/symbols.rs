// Flat symbol table over a repository structure

use crate::analysis::structure::RepoStructure;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier of a symbol: file path plus qualified name.
///
/// A `None` qualified name stands for the module scope of the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId {
    pub path: String,
    pub qualified_name: Option<String>,
}

impl SymbolId {
    pub fn new(path: impl Into<String>, qualified_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            qualified_name: Some(qualified_name.into()),
        }
    }

    /// The module scope of a file
    pub fn module(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            qualified_name: None,
        }
    }

    pub fn scoped(path: impl Into<String>, scope: Option<&str>) -> Self {
        Self {
            path: path.into(),
            qualified_name: scope.map(str::to_string),
        }
    }

    /// Qualified name, or the path for module scopes
    pub fn display_name(&self) -> &str {
        self.qualified_name.as_deref().unwrap_or(&self.path)
    }

    /// Directory part of the path, empty for the repository root
    pub fn directory(&self) -> &str {
        directory_of(&self.path)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualified_name {
            Some(name) => write!(f, "{}:{}", self.path, name),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Directory part of a `/`-separated relative path
pub fn directory_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Kind of definition a symbol refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Class,
    Function,
    Method,
}

impl SymbolKind {
    /// Classes and module-level functions can be imported by name
    pub fn is_top_level(&self) -> bool {
        !matches!(self, SymbolKind::Method)
    }
}

/// A definition site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub id: SymbolId,
    pub kind: SymbolKind,
}

/// Qualified name to definition sites, across the whole repository
#[derive(Debug, Default)]
pub struct SymbolTable {
    by_name: HashMap<String, Vec<SymbolEntry>>,
}

impl SymbolTable {
    /// Build the table from every parseable file
    pub fn build(structure: &RepoStructure) -> Self {
        let mut table = Self::default();

        for file in structure.files().filter(|f| f.is_parseable) {
            for class in &file.classes {
                table.add(&file.path, &class.name, SymbolKind::Class);
                for method in &class.methods {
                    table.add(&file.path, &method.qualified_name(), SymbolKind::Method);
                }
            }
            for func in &file.functions {
                table.add(&file.path, &func.name, SymbolKind::Function);
            }
        }

        table
    }

    fn add(&mut self, path: &str, qualified_name: &str, kind: SymbolKind) {
        let entries = self.by_name.entry(qualified_name.to_string()).or_default();
        let id = SymbolId::new(path, qualified_name);
        // Redefinitions in one file collapse to a single site
        if !entries.iter().any(|e| e.id == id) {
            entries.push(SymbolEntry { id, kind });
        }
    }

    /// Every definition site of a qualified name, in traversal order
    pub fn lookup(&self, qualified_name: &str) -> &[SymbolEntry] {
        self.by_name
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Definition sites of a qualified name restricted to some kinds
    pub fn lookup_where<F>(&self, qualified_name: &str, accept: F) -> Vec<SymbolId>
    where
        F: Fn(SymbolKind) -> bool,
    {
        self.lookup(qualified_name)
            .iter()
            .filter(|e| accept(e.kind))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Number of distinct qualified names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
