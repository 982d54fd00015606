// Textual projections of a repository structure for prompt embedding

use crate::analysis::{DependencyEdge, DependencyGraph, EdgeKind, RepoStructure, SymbolId};
use crate::parser::{ClassEntry, FileEntry, FunctionEntry};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const INDENT: &str = "    ";

/// Which projection to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RenderMode {
    /// One path per line
    FilesOnly,
    /// Classes and functions per file, without parameters
    FunctionsNoSignature,
    /// Classes and functions per file, with parameters
    #[default]
    FunctionsWithSignature,
    /// Every file with numbered lines
    FullText,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::FilesOnly => "files_only",
            RenderMode::FunctionsNoSignature => "functions_no_signature",
            RenderMode::FunctionsWithSignature => "functions_with_signature",
            RenderMode::FullText => "full_text",
        }
    }

    /// Whether a run in this mode resolves edges; `functions_with_signature`
    /// always does, `functions_no_signature` only when asked
    pub fn wants_graph(&self, dependencies: bool) -> bool {
        match self {
            RenderMode::FunctionsWithSignature => true,
            RenderMode::FunctionsNoSignature => dependencies,
            RenderMode::FilesOnly | RenderMode::FullText => false,
        }
    }
}

/// Render a structure in the given mode.
///
/// Output depends only on the arguments. Unparseable files appear in
/// `files_only` and `full_text` but not in the function listings. When a
/// graph is supplied, each symbol is followed by its outbound edges grouped
/// by kind, rendered as target qualified names.
pub fn render(structure: &RepoStructure, graph: Option<&DependencyGraph>, mode: RenderMode) -> String {
    match mode {
        RenderMode::FilesOnly => structure.paths().collect::<Vec<_>>().join("\n"),
        RenderMode::FullText => render_full_text(structure),
        RenderMode::FunctionsNoSignature => render_functions(structure, graph, false),
        RenderMode::FunctionsWithSignature => render_functions(structure, graph, true),
    }
}

fn render_full_text(structure: &RepoStructure) -> String {
    let blocks: Vec<String> = structure
        .files()
        .map(|file| {
            let mut lines = vec![file.path.clone()];
            lines.extend(
                file.text
                    .lines()
                    .enumerate()
                    .map(|(i, line)| format!("{} {}", i + 1, line)),
            );
            lines.join("\n")
        })
        .collect();
    blocks.join("\n\n")
}

fn render_functions(structure: &RepoStructure, graph: Option<&DependencyGraph>, signatures: bool) -> String {
    let blocks: Vec<String> = structure
        .files()
        .filter(|f| f.is_parseable)
        .map(|file| {
            let writer = FileWriter {
                file,
                graph,
                signatures,
                lines: Vec::new(),
            };
            writer.write()
        })
        .collect();
    blocks.join("\n\n")
}

/// Items of a file in declaration order
enum Item<'a> {
    Class(&'a ClassEntry),
    Function(&'a FunctionEntry),
}

impl Item<'_> {
    fn start_line(&self) -> usize {
        match self {
            Item::Class(c) => c.span.start_line,
            Item::Function(f) => f.span.start_line,
        }
    }
}

struct FileWriter<'a> {
    file: &'a FileEntry,
    graph: Option<&'a DependencyGraph>,
    signatures: bool,
    lines: Vec<String>,
}

impl<'a> FileWriter<'a> {
    fn write(mut self) -> String {
        self.lines.push(self.file.path.clone());
        self.edges(&SymbolId::module(self.file.path.as_str()), 1);

        let file = self.file;
        let mut items: Vec<Item<'a>> = file
            .classes
            .iter()
            .map(Item::Class)
            .chain(file.functions.iter().map(Item::Function))
            .collect();
        items.sort_by_key(Item::start_line);

        for item in items {
            match item {
                Item::Class(class) => {
                    self.lines.push(format!("{}class: {}", INDENT, class.name));
                    self.edges(&SymbolId::new(file.path.as_str(), class.name.as_str()), 2);
                    for method in &class.methods {
                        self.function(method);
                    }
                }
                Item::Function(function) => self.function(function),
            }
        }

        self.lines.join("\n")
    }

    fn function(&mut self, function: &FunctionEntry) {
        let qualified = function.qualified_name();
        let params = if self.signatures {
            function.parameter_list()
        } else {
            String::new()
        };
        self.lines.push(format!("{}function: {}{}", INDENT, qualified, params));
        self.edges(&SymbolId::new(self.file.path.as_str(), qualified), 2);
    }

    /// One line per edge kind: `calls: a, B.m`.
    ///
    /// Targets sharing a name across files are qualified with their path,
    /// so ambiguous bindings stay visible.
    fn edges(&mut self, symbol: &SymbolId, depth: usize) {
        let Some(graph) = self.graph else {
            return;
        };
        let edges: Vec<&DependencyEdge> = graph.edges_from_symbol(symbol).collect();
        if edges.is_empty() {
            return;
        }

        let indent = INDENT.repeat(depth);
        for kind in [EdgeKind::Call, EdgeKind::Inherit, EdgeKind::Import] {
            let of_kind: Vec<&SymbolId> = edges.iter().filter(|e| e.kind == kind).map(|e| &e.to).collect();

            let mut paths_by_name: HashMap<&str, HashSet<&str>> = HashMap::new();
            for to in &of_kind {
                paths_by_name
                    .entry(to.display_name())
                    .or_default()
                    .insert(to.path.as_str());
            }

            let mut seen = HashSet::new();
            let targets: Vec<String> = of_kind
                .iter()
                .map(|to| {
                    let name = to.display_name();
                    if paths_by_name.get(name).map_or(0, HashSet::len) > 1 {
                        to.to_string()
                    } else {
                        name.to_string()
                    }
                })
                .filter(|name| seen.insert(name.clone()))
                .collect();
            if !targets.is_empty() {
                self.lines
                    .push(format!("{}{}: {}", indent, kind.label(), targets.join(", ")));
            }
        }
    }
}
