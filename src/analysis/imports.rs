// Import resolution for Python modules
//
// Maps import statements onto files of the structure being indexed:
// - Local (the module is a file or package in the repository)
// - External (standard library or third-party; never followed)

use crate::analysis::structure::RepoStructure;
use crate::analysis::symbols::directory_of;
use crate::parser::{Import, ImportKind, PythonParser};
use std::collections::{HashMap, HashSet};

/// Directories commonly holding the importable packages of a project
const SOURCE_ROOTS: &[&str] = &["src", "lib"];

/// Classification of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportType {
    /// Module within the repository
    Local,
    /// Standard library or third-party package
    External,
}

/// Result of resolving an import
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImport {
    /// Classification
    pub import_type: ImportType,
    /// Repository file holding the module, when found
    pub resolved_path: Option<String>,
    /// Absolute dotted module name after resolving relative levels
    pub resolved_module: String,
}

/// Index of the importable modules of one repository
#[derive(Debug, Default)]
pub struct ModuleIndex {
    /// Dotted module name to file path
    modules: HashMap<String, String>,
    /// First segment of every local module name
    top_level: HashSet<String>,
    /// Every indexed file path
    paths: HashSet<String>,
}

impl ModuleIndex {
    /// Index every Python file of the structure
    pub fn build(structure: &RepoStructure) -> Self {
        let mut index = Self::default();

        for path in structure.paths().filter(|p| PythonParser::supports(p)) {
            index.paths.insert(path.to_string());

            let module = path_to_module_name(path);
            index.register(&module, path);

            // `src/pkg/mod.py` is imported as `pkg.mod`
            if let Some((root, rest)) = module.split_once('.') {
                if SOURCE_ROOTS.contains(&root) {
                    index.register(rest, path);
                }
            }
        }

        index
    }

    fn register(&mut self, module: &str, path: &str) {
        if module.is_empty() {
            return;
        }
        if let Some(top) = module.split('.').next() {
            self.top_level.insert(top.to_string());
        }
        // First file in traversal order wins
        self.modules
            .entry(module.to_string())
            .or_insert_with(|| path.to_string());
    }

    /// File path of a dotted module name
    pub fn module_path(&self, module: &str) -> Option<&str> {
        self.modules.get(module).map(String::as_str)
    }

    /// Check if a module's top-level package belongs to the repository
    pub fn is_local(&self, module: &str) -> bool {
        let top_level = module.split('.').next().unwrap_or(module);
        self.top_level.contains(top_level)
    }

    /// Resolve an import made from `current_file`
    pub fn resolve(&self, import: &Import, current_file: &str) -> ResolvedImport {
        if let ImportKind::Relative { level } = import.kind {
            return self.resolve_relative(&import.module, current_file, level);
        }

        let module = &import.module;
        if !self.is_local(module) {
            return ResolvedImport {
                import_type: ImportType::External,
                resolved_path: None,
                resolved_module: module.clone(),
            };
        }

        ResolvedImport {
            import_type: ImportType::Local,
            resolved_path: self.module_path(module).map(str::to_string),
            resolved_module: module.clone(),
        }
    }

    /// Resolve `from <import> import <name>` where `name` may be a submodule
    pub fn resolve_submodule(&self, import: &Import, name: &str, current_file: &str) -> Option<String> {
        let base = self.resolve(import, current_file);
        if base.import_type == ImportType::External {
            return None;
        }
        if let ImportKind::Relative { level } = import.kind {
            let module = join_module(&import.module, name);
            return self.resolve_relative(&module, current_file, level).resolved_path;
        }
        self.module_path(&join_module(&base.resolved_module, name))
            .map(str::to_string)
    }

    /// Resolve a relative import (e.g., from ..utils import helper)
    fn resolve_relative(&self, module: &str, current_file: &str, level: usize) -> ResolvedImport {
        // level=1 means the current package, level=2 its parent, etc.
        let mut base: Vec<&str> = directory_of(current_file)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        for _ in 1..level {
            base.pop();
        }

        let mut target = base.clone();
        target.extend(module.split('.').filter(|s| !s.is_empty()));
        let target = target.join("/");

        let resolved_path = self.find_module_file(&target);
        ResolvedImport {
            import_type: ImportType::Local,
            resolved_path,
            resolved_module: target.replace('/', "."),
        }
    }

    /// Find the file for a `/`-separated module path
    fn find_module_file(&self, module_path: &str) -> Option<String> {
        let py_file = format!("{}.py", module_path);
        if self.paths.contains(&py_file) {
            return Some(py_file);
        }

        let init_file = if module_path.is_empty() {
            "__init__.py".to_string()
        } else {
            format!("{}/__init__.py", module_path)
        };
        self.paths.contains(&init_file).then_some(init_file)
    }
}

fn join_module(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

/// Convert a relative file path to a dotted module name
pub fn path_to_module_name(path: &str) -> String {
    let without_ext = path
        .strip_suffix(".pyi")
        .or_else(|| path.strip_suffix(".py"))
        .unwrap_or(path);

    let mut parts: Vec<&str> = without_ext.split('/').filter(|s| !s.is_empty()).collect();
    if parts.last() == Some(&"__init__") {
        parts.pop();
    }
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{FileEntry, ImportedName};

    fn index(paths: &[&str]) -> ModuleIndex {
        let mut structure = RepoStructure::default();
        for path in paths {
            structure.insert(FileEntry::new(*path, ""));
        }
        ModuleIndex::build(&structure)
    }

    fn project() -> ModuleIndex {
        index(&[
            "pkg/__init__.py",
            "pkg/main.py",
            "pkg/utils/__init__.py",
            "pkg/utils/helpers.py",
            "src/lib_pkg/core.py",
            "README.md",
        ])
    }

    #[test]
    fn test_path_to_module_name() {
        assert_eq!(path_to_module_name("pkg/main.py"), "pkg.main");
        assert_eq!(path_to_module_name("pkg/__init__.py"), "pkg");
        assert_eq!(path_to_module_name("utils.py"), "utils");
        assert_eq!(path_to_module_name("stubs/api.pyi"), "stubs.api");
        assert_eq!(path_to_module_name("__init__.py"), "");
    }

    #[test]
    fn test_module_path() {
        let index = project();
        assert_eq!(index.module_path("pkg.main"), Some("pkg/main.py"));
        assert_eq!(index.module_path("pkg.utils"), Some("pkg/utils/__init__.py"));
        assert_eq!(index.module_path("lib_pkg.core"), Some("src/lib_pkg/core.py"));
        assert_eq!(index.module_path("README"), None);
    }

    #[test]
    fn test_local_detection() {
        let index = project();
        assert!(index.is_local("pkg"));
        assert!(index.is_local("pkg.anything"));
        assert!(index.is_local("lib_pkg.core"));
        assert!(!index.is_local("os"));
        assert!(!index.is_local("numpy.linalg"));
    }

    #[test]
    fn test_resolve_absolute() {
        let index = project();
        let import = Import::from_import("pkg.utils.helpers", vec![ImportedName::new("f")], 1);
        let resolved = index.resolve(&import, "pkg/main.py");
        assert_eq!(resolved.import_type, ImportType::Local);
        assert_eq!(resolved.resolved_path.as_deref(), Some("pkg/utils/helpers.py"));
    }

    #[test]
    fn test_resolve_external() {
        let index = project();
        let import = Import::simple("os.path", 1);
        let resolved = index.resolve(&import, "pkg/main.py");
        assert_eq!(resolved.import_type, ImportType::External);
        assert!(resolved.resolved_path.is_none());
    }

    #[test]
    fn test_resolve_relative() {
        let index = project();
        // from .utils import helpers (from pkg/main.py)
        let import = Import::relative("utils", vec![ImportedName::new("helpers")], 1, 1);
        let resolved = index.resolve(&import, "pkg/main.py");
        assert_eq!(resolved.import_type, ImportType::Local);
        assert_eq!(resolved.resolved_path.as_deref(), Some("pkg/utils/__init__.py"));
        assert_eq!(resolved.resolved_module, "pkg.utils");

        // from .. import main (from pkg/utils/helpers.py)
        let import = Import::relative("", vec![ImportedName::new("main")], 2, 1);
        let resolved = index.resolve(&import, "pkg/utils/helpers.py");
        assert_eq!(resolved.resolved_path.as_deref(), Some("pkg/__init__.py"));
    }

    #[test]
    fn test_resolve_submodule() {
        let index = project();
        let import = Import::from_import("pkg.utils", vec![ImportedName::new("helpers")], 1);
        assert_eq!(
            index.resolve_submodule(&import, "helpers", "pkg/main.py").as_deref(),
            Some("pkg/utils/helpers.py")
        );

        let relative = Import::relative("", vec![ImportedName::new("main")], 1, 1);
        assert_eq!(
            index.resolve_submodule(&relative, "main", "pkg/__init__.py").as_deref(),
            Some("pkg/main.py")
        );

        let external = Import::from_import("os", vec![ImportedName::new("path")], 1);
        assert!(index.resolve_submodule(&external, "path", "pkg/main.py").is_none());
    }
}
