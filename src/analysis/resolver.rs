// Binding of references to symbol definitions across the repository
//
// Resolution is purely syntactic: names are matched against a flat symbol
// table, narrowed by imports and by directory proximity. No type inference.

use crate::analysis::graph::{DependencyEdge, EdgeKind};
use crate::analysis::imports::{ImportType, ModuleIndex};
use crate::analysis::structure::RepoStructure;
use crate::analysis::symbols::{directory_of, SymbolId, SymbolKind, SymbolTable};
use crate::parser::{FileEntry, Import, ImportKind, Reference, ReferenceKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::AddAssign;
use tracing::debug;

/// Outcome of binding one reference
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Exactly one definition matched
    Resolved(DependencyEdge),
    /// Several definitions survived the tie-break; all are kept
    Ambiguous(Vec<DependencyEdge>),
    /// Nothing in the repository matched (usually a library call)
    Unresolved,
}

impl Binding {
    fn from_edges(mut edges: Vec<DependencyEdge>) -> Self {
        match edges.len() {
            0 => Binding::Unresolved,
            1 => edges.pop().map_or(Binding::Unresolved, Binding::Resolved),
            _ => Binding::Ambiguous(edges),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Binding::Resolved(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Binding::Ambiguous(_))
    }

    /// Every edge carried by the binding
    pub fn into_edges(self) -> Vec<DependencyEdge> {
        match self {
            Binding::Resolved(edge) => vec![edge],
            Binding::Ambiguous(edges) => edges,
            Binding::Unresolved => Vec::new(),
        }
    }
}

/// Counts of binding outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub resolved: usize,
    pub ambiguous: usize,
    pub unresolved: usize,
}

impl ResolutionStats {
    pub fn record(&mut self, binding: &Binding) {
        match binding {
            Binding::Resolved(_) => self.resolved += 1,
            Binding::Ambiguous(_) => self.ambiguous += 1,
            Binding::Unresolved => self.unresolved += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.resolved + self.ambiguous + self.unresolved
    }
}

impl AddAssign for ResolutionStats {
    fn add_assign(&mut self, other: Self) {
        self.resolved += other.resolved;
        self.ambiguous += other.ambiguous;
        self.unresolved += other.unresolved;
    }
}

/// Edges and binding counts for one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileResolution {
    pub edges: Vec<DependencyEdge>,
    pub stats: ResolutionStats,
}

/// A name brought into a file by `from m import name [as alias]`
#[derive(Debug, Clone)]
struct ImportedSymbol {
    name: String,
    /// File the import statement resolved to
    hint: Option<String>,
    external: bool,
}

/// A module bound to a name by `import m [as alias]` or `from pkg import mod`
#[derive(Debug, Clone)]
struct ModuleAlias {
    /// Absolute dotted module name
    module: String,
    external: bool,
}

/// Names visible at module level of one file
#[derive(Debug, Default)]
struct FileScope {
    symbols: HashMap<String, ImportedSymbol>,
    modules: HashMap<String, ModuleAlias>,
}

/// Resolves references of every file against one structure snapshot
pub struct DependencyResolver<'a> {
    structure: &'a RepoStructure,
    table: SymbolTable,
    modules: ModuleIndex,
}

impl<'a> DependencyResolver<'a> {
    /// Build the symbol table and module index once for the whole structure
    pub fn new(structure: &'a RepoStructure) -> Self {
        let table = SymbolTable::build(structure);
        let modules = ModuleIndex::build(structure);
        debug!(symbols = table.len(), files = structure.len(), "Symbol table built");
        Self {
            structure,
            table,
            modules,
        }
    }

    /// Resolve every import and reference of one file
    pub fn resolve_file(&self, file: &FileEntry) -> FileResolution {
        let mut resolution = FileResolution::default();
        if !file.is_parseable {
            return resolution;
        }

        let mut seen = HashSet::new();
        let mut push = |binding: Binding, resolution: &mut FileResolution| {
            resolution.stats.record(&binding);
            for edge in binding.into_edges() {
                if seen.insert(edge.clone()) {
                    resolution.edges.push(edge);
                }
            }
        };

        let mut scope = FileScope::default();
        for import in &file.imports {
            for binding in self.bind_import(file, import, &mut scope) {
                push(binding, &mut resolution);
            }
        }
        for reference in &file.references {
            let binding = self.bind_reference(file, &scope, reference);
            if let Binding::Ambiguous(edges) = &binding {
                debug!(
                    file = %file.path,
                    target = %reference.target,
                    candidates = edges.len(),
                    "Ambiguous binding"
                );
            }
            push(binding, &mut resolution);
        }

        resolution
    }

    /// Bind the names of one import statement, registering them in the scope
    fn bind_import(&self, file: &FileEntry, import: &Import, scope: &mut FileScope) -> Vec<Binding> {
        let resolved = self.modules.resolve(import, &file.path);
        let external = resolved.import_type == ImportType::External;

        if import.kind == ImportKind::Direct {
            // `import a.b` binds `a`; `import a.b as m` binds `m` to `a.b`
            for name in &import.names {
                let (used, module) = match &name.alias {
                    Some(alias) => (alias.clone(), import.module.clone()),
                    None => {
                        let top = import.module.split('.').next().unwrap_or(&import.module);
                        (top.to_string(), top.to_string())
                    }
                };
                scope.modules.insert(used, ModuleAlias { module, external });
            }
            return Vec::new();
        }

        let from = SymbolId::module(file.path.as_str());
        let mut bindings = Vec::new();

        for name in &import.names {
            if external {
                scope.symbols.insert(
                    name.used_name().to_string(),
                    ImportedSymbol {
                        name: name.name.clone(),
                        hint: None,
                        external: true,
                    },
                );
                continue;
            }

            if name.name == "*" {
                bindings.extend(self.bind_wildcard(&from, resolved.resolved_path.as_deref(), scope));
                continue;
            }

            let hint = resolved.resolved_path.as_deref();
            let defined_in_hint = hint
                .and_then(|p| self.structure.get(p))
                .map_or(false, |f| f.is_parseable && f.defines(&name.name));

            if !defined_in_hint {
                if self.modules.resolve_submodule(import, &name.name, &file.path).is_some() {
                    let module = join_module(&resolved.resolved_module, &name.name);
                    scope.modules.insert(
                        name.used_name().to_string(),
                        ModuleAlias {
                            module,
                            external: false,
                        },
                    );
                    continue;
                }
            }

            scope.symbols.insert(
                name.used_name().to_string(),
                ImportedSymbol {
                    name: name.name.clone(),
                    hint: hint.map(str::to_string),
                    external: false,
                },
            );

            let candidates = self.table.lookup_where(&name.name, |k| k.is_top_level());
            let targets = match hint {
                Some(hint) if defined_in_hint => candidates
                    .into_iter()
                    .filter(|c| c.path == hint)
                    .collect(),
                _ => self.select(&file.path, candidates, hint),
            };
            bindings.push(self.edges(&from, targets, EdgeKind::Import));
        }

        bindings
    }

    /// `from m import *`: one edge per top-level symbol of the resolved file
    fn bind_wildcard(&self, from: &SymbolId, path: Option<&str>, scope: &mut FileScope) -> Vec<Binding> {
        let Some(target) = path.and_then(|p| self.structure.get(p)) else {
            return vec![Binding::Unresolved];
        };
        if !target.is_parseable {
            return vec![Binding::Unresolved];
        }

        let names = target
            .classes
            .iter()
            .map(|c| c.name.as_str())
            .chain(target.functions.iter().map(|f| f.name.as_str()));

        let mut bindings = Vec::new();
        for name in names {
            scope.symbols.insert(
                name.to_string(),
                ImportedSymbol {
                    name: name.to_string(),
                    hint: Some(target.path.clone()),
                    external: false,
                },
            );
            let to = SymbolId::new(target.path.as_str(), name);
            bindings.push(self.edges(from, vec![to], EdgeKind::Import));
        }
        bindings
    }

    /// Bind a call or inherit reference
    fn bind_reference(&self, file: &FileEntry, scope: &FileScope, reference: &Reference) -> Binding {
        let from = SymbolId::scoped(file.path.as_str(), reference.scope.as_deref());
        let segments = reference.segments();
        let Some((&attr, receivers)) = segments.split_last() else {
            return Binding::Unresolved;
        };

        let (kind, accept): (EdgeKind, fn(SymbolKind) -> bool) = match reference.kind {
            ReferenceKind::Call => (EdgeKind::Call, is_callable),
            ReferenceKind::Inherit => (EdgeKind::Inherit, is_class),
        };

        let targets = match receivers {
            // `name()` or `class C(Name)`
            [] => match scope.symbols.get(attr) {
                Some(imported) if imported.external => Vec::new(),
                Some(imported) => {
                    let candidates = self.table.lookup_where(&imported.name, accept);
                    self.select(&file.path, candidates, imported.hint.as_deref())
                }
                None if scope.modules.contains_key(attr) => Vec::new(),
                None => self.select(&file.path, self.table.lookup_where(attr, accept), None),
            },
            // `self.m()` / `cls.m()`
            ["self" | "cls"] if reference.kind == ReferenceKind::Call => {
                self.bind_self_call(file, scope, reference.scope.as_deref(), attr)
            }
            [receiver, rest @ ..] if scope.modules.contains_key(*receiver) => {
                match scope.modules.get(*receiver) {
                    Some(alias) if !alias.external => {
                        self.bind_module_attr(file, &alias.module, rest, attr, accept)
                    }
                    _ => Vec::new(),
                }
            }
            _ => self.bind_attr(file, scope, receivers, attr, accept),
        };

        self.edges(&from, targets, kind)
    }

    /// `self.attr` inside class `C`: `C.attr`, then `B.attr` for each direct base `B`
    fn bind_self_call(
        &self,
        file: &FileEntry,
        scope: &FileScope,
        enclosing: Option<&str>,
        attr: &str,
    ) -> Vec<SymbolId> {
        let Some(class) = enclosing
            .and_then(|s| s.split('.').next())
            .and_then(|name| file.class(name))
        else {
            return Vec::new();
        };

        let own = format!("{}.{}", class.name, attr);
        if file.defines(&own) {
            return vec![SymbolId::new(file.path.as_str(), own)];
        }

        for base in &class.bases {
            let base_name = base.rsplit('.').next().unwrap_or(base);
            let (name, hint) = match scope.symbols.get(base_name) {
                Some(imported) if imported.external => continue,
                Some(imported) => (imported.name.as_str(), imported.hint.as_deref()),
                None => (base_name, None),
            };
            let candidates = self
                .table
                .lookup_where(&format!("{}.{}", name, attr), |k| k == SymbolKind::Method);
            let targets = self.select(&file.path, candidates, hint);
            if !targets.is_empty() {
                return targets;
            }
        }

        Vec::new()
    }

    /// `module.attr`, `module.sub.attr` or `module.Class.attr`
    fn bind_module_attr(
        &self,
        file: &FileEntry,
        module: &str,
        rest: &[&str],
        attr: &str,
        accept: fn(SymbolKind) -> bool,
    ) -> Vec<SymbolId> {
        let mut chain = vec![module];
        chain.extend_from_slice(rest);

        if let Some(path) = self.modules.module_path(&chain.join(".")) {
            let candidates = self.table.lookup_where(attr, accept);
            return self.select(&file.path, candidates, Some(path));
        }

        if let Some((&class, outer)) = chain.split_last() {
            if let Some(path) = self.modules.module_path(&outer.join(".")) {
                let candidates = self
                    .table
                    .lookup_where(&format!("{}.{}", class, attr), |k| k == SymbolKind::Method);
                return self.select(&file.path, candidates, Some(path));
            }
        }

        self.select(&file.path, self.table.lookup_where(attr, accept), None)
    }

    /// `Name.attr` as a qualified method, else `attr` as a top-level name
    fn bind_attr(
        &self,
        file: &FileEntry,
        scope: &FileScope,
        receivers: &[&str],
        attr: &str,
        accept: fn(SymbolKind) -> bool,
    ) -> Vec<SymbolId> {
        if let Some(&owner) = receivers.last() {
            let (owner, hint) = match (receivers.len(), scope.symbols.get(owner)) {
                (1, Some(imported)) if imported.external => return Vec::new(),
                (1, Some(imported)) => (imported.name.as_str(), imported.hint.as_deref()),
                _ => (owner, None),
            };
            let qualified = format!("{}.{}", owner, attr);
            let candidates = self.table.lookup_where(&qualified, |k| k == SymbolKind::Method);
            if !candidates.is_empty() {
                return self.select(&file.path, candidates, hint);
            }
        }

        self.select(&file.path, self.table.lookup_where(attr, accept), None)
    }

    /// Tie-break among same-named definitions:
    /// same file, then the file an import named, then the nearest enclosing
    /// directory, otherwise every match
    fn select(&self, from_path: &str, candidates: Vec<SymbolId>, hint: Option<&str>) -> Vec<SymbolId> {
        if candidates.len() <= 1 {
            return candidates;
        }

        let same_file: Vec<SymbolId> = candidates.iter().filter(|c| c.path == from_path).cloned().collect();
        if !same_file.is_empty() {
            return same_file;
        }

        if let Some(hint) = hint {
            let hinted: Vec<SymbolId> = candidates.iter().filter(|c| c.path == hint).cloned().collect();
            if !hinted.is_empty() {
                return hinted;
            }
        }

        let from_dir = directory_of(from_path);
        let depth = |c: &SymbolId| ancestor_depth(c.directory(), from_dir);
        match candidates.iter().filter_map(depth).max() {
            Some(best) => candidates
                .into_iter()
                .filter(|c| depth(c) == Some(best))
                .collect(),
            None => candidates,
        }
    }

    fn edges(&self, from: &SymbolId, targets: Vec<SymbolId>, kind: EdgeKind) -> Binding {
        let edges = targets
            .into_iter()
            .filter(|to| to != from)
            .map(|to| DependencyEdge::new(from.clone(), to, kind))
            .collect();
        Binding::from_edges(edges)
    }
}

fn is_callable(kind: SymbolKind) -> bool {
    kind.is_top_level()
}

fn is_class(kind: SymbolKind) -> bool {
    kind == SymbolKind::Class
}

/// Depth of `dir` when it is `from_dir` or one of its ancestors
fn ancestor_depth(dir: &str, from_dir: &str) -> Option<usize> {
    if dir.is_empty() {
        return Some(0);
    }
    let is_ancestor = from_dir == dir
        || from_dir
            .strip_prefix(dir)
            .map_or(false, |rest| rest.starts_with('/'));
    is_ancestor.then(|| dir.split('/').count())
}

fn join_module(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}
