// Dependency graph: the structure plus symbol-level edges per file

use crate::analysis::resolver::{DependencyResolver, ResolutionStats};
use crate::analysis::structure::RepoStructure;
use crate::analysis::symbols::SymbolId;
use crate::parser::FileEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Kind of edge in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Symbol A calls symbol B
    Call,
    /// Class A inherits from class B
    Inherit,
    /// File A imports symbol B
    Import,
}

impl EdgeKind {
    /// Verb used when listing edges under a symbol
    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::Call => "calls",
            EdgeKind::Inherit => "inherits",
            EdgeKind::Import => "imports",
        }
    }
}

/// A directed edge between two symbols
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: SymbolId,
    pub to: SymbolId,
    pub kind: EdgeKind,
}

impl DependencyEdge {
    pub fn new(from: SymbolId, to: SymbolId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }
}

/// Repository structure with outbound edges grouped by source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    structure: RepoStructure,
    edges: BTreeMap<String, Vec<DependencyEdge>>,
    stats: BTreeMap<String, ResolutionStats>,
}

impl DependencyGraph {
    /// Resolve every file of a structure
    pub fn build(structure: RepoStructure) -> Self {
        let mut graph = Self {
            structure,
            edges: BTreeMap::new(),
            stats: BTreeMap::new(),
        };
        graph.resolve_all();

        let stats = graph.stats();
        info!(
            edges = graph.edge_count(),
            resolved = stats.resolved,
            ambiguous = stats.ambiguous,
            unresolved = stats.unresolved,
            "Dependency resolution complete"
        );
        graph
    }

    fn resolve_all(&mut self) {
        let resolver = DependencyResolver::new(&self.structure);
        let mut edges = BTreeMap::new();
        let mut stats = BTreeMap::new();
        for file in self.structure.files() {
            let resolution = resolver.resolve_file(file);
            edges.insert(file.path.clone(), resolution.edges);
            stats.insert(file.path.clone(), resolution.stats);
        }
        self.edges = edges;
        self.stats = stats;
    }

    fn resolve_one(&mut self, path: &str) {
        let resolution = {
            let resolver = DependencyResolver::new(&self.structure);
            match self.structure.get(path) {
                Some(file) => resolver.resolve_file(file),
                None => return,
            }
        };
        self.edges.insert(path.to_string(), resolution.edges);
        self.stats.insert(path.to_string(), resolution.stats);
    }

    /// Replace one file's entry and recompute the edges it invalidates.
    ///
    /// Returns the number of files re-resolved: zero for an identical entry,
    /// one when only the file's own references changed, every file when the
    /// set of defined symbols (or of paths) changed.
    pub fn update_file(&mut self, entry: FileEntry) -> usize {
        let previous = self.structure.get(&entry.path);
        if previous == Some(&entry) {
            return 0;
        }

        let symbols_changed = previous.map(defined_symbols) != Some(defined_symbols(&entry));
        let path = entry.path.clone();
        self.structure.insert(entry);

        if symbols_changed {
            debug!(file = %path, "Symbol set changed, re-resolving all files");
            self.resolve_all();
            self.structure.len()
        } else {
            debug!(file = %path, "Re-resolving file");
            self.resolve_one(&path);
            1
        }
    }

    /// Keep only matching files, dropping every edge that touches a removed file
    pub fn retain_files<F: FnMut(&FileEntry) -> bool>(&mut self, keep: F) -> usize {
        let removed = self.structure.retain(keep);
        if removed == 0 {
            return 0;
        }

        let structure = &self.structure;
        self.edges.retain(|path, _| structure.contains(path));
        self.stats.retain(|path, _| structure.contains(path));
        for edges in self.edges.values_mut() {
            edges.retain(|e| structure.contains(&e.to.path));
        }
        removed
    }

    pub fn structure(&self) -> &RepoStructure {
        &self.structure
    }

    pub fn into_structure(self) -> RepoStructure {
        self.structure
    }

    /// Outbound edges of a file, in source order
    pub fn edges_from_file(&self, path: &str) -> &[DependencyEdge] {
        self.edges.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outbound edges of one symbol
    pub fn edges_from_symbol<'a>(&'a self, symbol: &'a SymbolId) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges_from_file(&symbol.path)
            .iter()
            .filter(move |e| &e.from == symbol)
    }

    /// Inbound edges of one symbol
    pub fn incoming(&self, symbol: &SymbolId) -> Vec<&DependencyEdge> {
        self.all_edges().filter(|e| &e.to == symbol).collect()
    }

    /// Every edge, files in structure order
    pub fn all_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.structure
            .paths()
            .flat_map(move |path| self.edges_from_file(path).iter())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Binding outcome counts over all files
    pub fn stats(&self) -> ResolutionStats {
        let mut total = ResolutionStats::default();
        for stats in self.stats.values() {
            total += *stats;
        }
        total
    }

    /// Edges whose endpoints are not defined in the structure
    pub fn dangling_edges(&self) -> Vec<&DependencyEdge> {
        self.all_edges()
            .filter(|e| !self.structure.contains_symbol(&e.from) || !self.structure.contains_symbol(&e.to))
            .collect()
    }

    /// Check referential integrity of every edge
    pub fn check_integrity(&self) -> bool {
        self.dangling_edges().is_empty()
    }
}

/// Qualified names defined by an entry; unparseable files define nothing
fn defined_symbols(entry: &FileEntry) -> HashSet<String> {
    if !entry.is_parseable {
        return HashSet::new();
    }
    entry.qualified_names().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PythonParser;

    fn parse(path: &str, text: &str) -> FileEntry {
        PythonParser::new().unwrap().parse(path, text)
    }

    fn graph(files: &[(&str, &str)]) -> DependencyGraph {
        let mut structure = RepoStructure::default();
        for (path, text) in files {
            structure.insert(parse(path, text));
        }
        DependencyGraph::build(structure)
    }

    #[test]
    fn test_edge_kind_labels() {
        assert_eq!(EdgeKind::Call.label(), "calls");
        assert_eq!(EdgeKind::Inherit.label(), "inherits");
        assert_eq!(EdgeKind::Import.label(), "imports");
    }

    #[test]
    fn test_build_groups_edges_by_file() {
        let g = graph(&[
            ("a.py", "def foo(): pass\n"),
            ("b.py", "def bar():\n    foo()\n"),
        ]);
        assert!(g.edges_from_file("a.py").is_empty());
        assert_eq!(g.edges_from_file("b.py").len(), 1);
        assert_eq!(g.edge_count(), 1);

        let bar = SymbolId::new("b.py", "bar");
        assert_eq!(g.edges_from_symbol(&bar).count(), 1);
        assert_eq!(g.incoming(&SymbolId::new("a.py", "foo")).len(), 1);
        assert!(g.check_integrity());
    }

    #[test]
    fn test_update_identical_is_noop() {
        let mut g = graph(&[("a.py", "def foo(): pass\n")]);
        let same = parse("a.py", "def foo(): pass\n");
        assert_eq!(g.update_file(same), 0);
    }

    #[test]
    fn test_update_body_only_reresolves_one_file() {
        let mut g = graph(&[
            ("a.py", "def foo(): pass\n"),
            ("b.py", "def bar():\n    pass\n"),
        ]);
        assert_eq!(g.edge_count(), 0);

        let changed = parse("b.py", "def bar():\n    foo()\n");
        assert_eq!(g.update_file(changed), 1);
        assert_eq!(g.edges_from_file("b.py").len(), 1);
    }

    #[test]
    fn test_update_symbols_reresolves_all() {
        let mut g = graph(&[
            ("a.py", "def foo(): pass\n"),
            ("b.py", "def bar():\n    foo()\n"),
        ]);
        // foo disappears, so b.py's edge must go too
        let renamed = parse("a.py", "def baz(): pass\n");
        assert_eq!(g.update_file(renamed), 2);
        assert_eq!(g.edge_count(), 0);
        assert!(g.check_integrity());
    }

    #[test]
    fn test_retain_prunes_edges() {
        let mut g = graph(&[
            ("lib.py", "def helper(): pass\n"),
            ("test_lib.py", "def test_helper():\n    helper()\n"),
            ("app.py", "def main():\n    helper()\n"),
        ]);
        assert_eq!(g.edge_count(), 2);

        let removed = g.retain_files(|f| f.path != "lib.py");
        assert_eq!(removed, 1);
        assert_eq!(g.edge_count(), 0);
        assert!(g.check_integrity());
        assert_eq!(g.structure().len(), 2);
    }

    #[test]
    fn test_stats_and_serde() {
        let g = graph(&[
            ("a.py", "import os\n\ndef foo():\n    os.getcwd()\n"),
            ("b.py", "def bar():\n    foo()\n"),
        ]);
        let stats = g.stats();
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 1);

        let json = serde_json::to_string(&g).unwrap();
        let restored: DependencyGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, g);
    }
}
