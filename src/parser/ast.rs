// Structural model of a parsed source file
//
// These types are the per-file inventory produced by the parser. They are
// plain owned data so a whole repository can be cached and serialized.

use serde::{Deserialize, Serialize};

/// A 1-indexed, inclusive line range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceSpan {
    /// Create a span; an end before the start collapses to a single line
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line: end_line.max(start_line),
        }
    }

    /// Check if another span lies entirely within this one
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start_line <= other.start_line && other.end_line <= self.end_line
    }

    /// Check if a line falls inside the span
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Number of lines covered
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// A parsed source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// Module-level classes in source order
    pub classes: Vec<ClassEntry>,
    /// Module-level functions in source order
    pub functions: Vec<FunctionEntry>,
    /// Module-level variable names in source order
    pub variables: Vec<String>,
    /// Import statements anywhere in the file
    pub imports: Vec<Import>,
    /// Call and base-class references, attributed to their enclosing symbol
    pub references: Vec<Reference>,
    /// Raw source text
    pub text: String,
    /// False when the file has a syntax error or is not a supported source format
    pub is_parseable: bool,
}

impl FileEntry {
    /// Create an empty, parseable entry
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            classes: Vec::new(),
            functions: Vec::new(),
            variables: Vec::new(),
            imports: Vec::new(),
            references: Vec::new(),
            text: text.into(),
            is_parseable: true,
        }
    }

    /// Create an entry that keeps only the raw text
    pub fn unparseable(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            is_parseable: false,
            ..Self::new(path, text)
        }
    }

    /// Number of lines in the raw text
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    /// Check if file defines no classes, functions or variables
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty() && self.variables.is_empty()
    }

    /// Find a module-level class by name
    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Qualified names of every class, function and method, in source order
    pub fn qualified_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for class in &self.classes {
            names.push(class.name.clone());
            names.extend(class.methods.iter().map(FunctionEntry::qualified_name));
        }
        names.extend(self.functions.iter().map(FunctionEntry::qualified_name));
        names
    }

    /// Check whether a qualified name is defined in this file
    pub fn defines(&self, qualified_name: &str) -> bool {
        match qualified_name.split_once('.') {
            Some((class, method)) => self
                .class(class)
                .is_some_and(|c| c.methods.iter().any(|m| m.name == method)),
            None => {
                self.classes.iter().any(|c| c.name == qualified_name)
                    || self.functions.iter().any(|f| f.name == qualified_name)
            }
        }
    }
}

/// An import statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Import {
    /// The module being imported (empty for `from . import x`)
    pub module: String,
    /// Specific names imported (for `from x import y`)
    pub names: Vec<ImportedName>,
    /// Import kind
    pub kind: ImportKind,
    /// Line number
    pub line: usize,
}

impl Import {
    /// Create a simple `import x` style import
    pub fn simple(module: &str, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names: vec![ImportedName::new(module)],
            kind: ImportKind::Direct,
            line,
        }
    }

    /// Create a `from x import y` style import
    pub fn from_import(module: &str, names: Vec<ImportedName>, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::From,
            line,
        }
    }

    /// Create a relative import
    pub fn relative(module: &str, names: Vec<ImportedName>, level: usize, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::Relative { level },
            line,
        }
    }

    /// Check for `from x import *`
    pub fn is_wildcard(&self) -> bool {
        self.names.iter().any(|n| n.name == "*")
    }
}

/// A single imported name with optional alias
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportedName {
    /// Original name
    pub name: String,
    /// Alias (from `as` clause)
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    /// Get the name as used in code (alias if present, otherwise original)
    pub fn used_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Kind of import statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImportKind {
    /// `import x` or `import x as y`
    Direct,
    /// `from x import y`
    From,
    /// `from . import y` or `from ..x import y`
    Relative { level: usize },
}

impl ImportKind {
    pub fn is_relative(&self) -> bool {
        matches!(self, ImportKind::Relative { .. })
    }
}

/// A module-level class definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassEntry {
    /// Class name
    pub name: String,
    /// Lines covered, decorators included
    pub span: SourceSpan,
    /// Base classes as written
    pub bases: Vec<String>,
    /// Methods in declaration order
    pub methods: Vec<FunctionEntry>,
}

impl ClassEntry {
    pub fn new(name: &str, span: SourceSpan) -> Self {
        Self {
            name: name.to_string(),
            span,
            bases: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Find a method by name
    pub fn method(&self, name: &str) -> Option<&FunctionEntry> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A function or method definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionEntry {
    /// Function name
    pub name: String,
    /// Parameter names in order, implicit `self`/`cls` excluded
    pub signature: Vec<String>,
    /// Lines covered, decorators included
    pub span: SourceSpan,
    /// Name of the owning class for methods
    pub enclosing_class: Option<String>,
    /// Decorators applied, without `@` and arguments
    pub decorators: Vec<String>,
    /// Whether this is an async function
    pub is_async: bool,
}

impl FunctionEntry {
    pub fn new(name: &str, span: SourceSpan) -> Self {
        Self {
            name: name.to_string(),
            signature: Vec::new(),
            span,
            enclosing_class: None,
            decorators: Vec::new(),
            is_async: false,
        }
    }

    /// `Class.method` for methods, the bare name otherwise
    pub fn qualified_name(&self) -> String {
        match &self.enclosing_class {
            Some(class) => format!("{}.{}", class, self.name),
            None => self.name.clone(),
        }
    }

    /// Check if this is a method
    pub fn is_method(&self) -> bool {
        self.enclosing_class.is_some()
    }

    /// Check if this is a staticmethod
    pub fn is_staticmethod(&self) -> bool {
        self.decorators.iter().any(|d| d == "staticmethod")
    }

    /// Parameter list as it appears in rendered output
    pub fn parameter_list(&self) -> String {
        format!("({})", self.signature.join(", "))
    }
}

/// What a reference expression asserts about its target
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A call expression
    Call,
    /// A base class in a class header
    Inherit,
}

/// A reference found in source, not yet bound to any definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Target as written, e.g. `helper`, `self.save`, `models.Base`
    pub target: String,
    /// Qualified name of the enclosing symbol; `None` for module scope
    pub scope: Option<String>,
    /// Line number
    pub line: usize,
}

impl Reference {
    pub fn call(target: &str, scope: Option<String>, line: usize) -> Self {
        Self {
            kind: ReferenceKind::Call,
            target: target.to_string(),
            scope,
            line,
        }
    }

    pub fn inherit(target: &str, scope: Option<String>, line: usize) -> Self {
        Self {
            kind: ReferenceKind::Inherit,
            target: target.to_string(),
            scope,
            line,
        }
    }

    /// Target split into its dotted segments
    pub fn segments(&self) -> Vec<&str> {
        self.target.split('.').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> FileEntry {
        let mut file = FileEntry::new("pkg/models.py", "class User:\n    def save(self): pass\n\ndef load(): pass\n");
        let mut class = ClassEntry::new("User", SourceSpan::new(1, 2));
        let mut save = FunctionEntry::new("save", SourceSpan::new(2, 2));
        save.enclosing_class = Some("User".to_string());
        class.methods.push(save);
        file.classes.push(class);
        file.functions.push(FunctionEntry::new("load", SourceSpan::new(4, 4)));
        file
    }

    #[test]
    fn test_span_new_clamps() {
        let span = SourceSpan::new(5, 3);
        assert_eq!(span.start_line, 5);
        assert_eq!(span.end_line, 5);
        assert_eq!(span.line_count(), 1);
    }

    #[test]
    fn test_span_contains() {
        let outer = SourceSpan::new(1, 10);
        assert!(outer.contains(&SourceSpan::new(2, 5)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&SourceSpan::new(8, 11)));
        assert!(outer.contains_line(10));
        assert!(!outer.contains_line(11));
    }

    #[test]
    fn test_file_entry_new() {
        let file = FileEntry::new("a.py", "");
        assert!(file.is_parseable);
        assert!(file.is_empty());
        assert_eq!(file.line_count(), 0);
    }

    #[test]
    fn test_file_entry_unparseable() {
        let file = FileEntry::unparseable("README.md", "# Title\n");
        assert!(!file.is_parseable);
        assert_eq!(file.text, "# Title\n");
        assert!(file.classes.is_empty());
    }

    #[test]
    fn test_qualified_names() {
        let file = sample_file();
        assert_eq!(file.qualified_names(), vec!["User", "User.save", "load"]);
    }

    #[test]
    fn test_defines() {
        let file = sample_file();
        assert!(file.defines("User"));
        assert!(file.defines("User.save"));
        assert!(file.defines("load"));
        assert!(!file.defines("save"));
        assert!(!file.defines("User.delete"));
        assert!(!file.defines("Other.save"));
    }

    #[test]
    fn test_function_qualified_name() {
        let mut func = FunctionEntry::new("run", SourceSpan::new(1, 1));
        assert_eq!(func.qualified_name(), "run");
        assert!(!func.is_method());

        func.enclosing_class = Some("Task".to_string());
        assert_eq!(func.qualified_name(), "Task.run");
        assert!(func.is_method());
    }

    #[test]
    fn test_parameter_list() {
        let mut func = FunctionEntry::new("greet", SourceSpan::new(1, 1));
        assert_eq!(func.parameter_list(), "()");

        func.signature = vec!["name".to_string(), "*args".to_string()];
        assert_eq!(func.parameter_list(), "(name, *args)");
    }

    #[test]
    fn test_import_wildcard() {
        let imp = Import::from_import("os", vec![ImportedName::new("*")], 1);
        assert!(imp.is_wildcard());
        assert!(!Import::simple("os", 1).is_wildcard());
    }

    #[test]
    fn test_import_relative() {
        let imp = Import::relative("utils", vec![ImportedName::new("helper")], 2, 1);
        assert!(imp.kind.is_relative());
        if let ImportKind::Relative { level } = imp.kind {
            assert_eq!(level, 2);
        }
    }

    #[test]
    fn test_imported_name_used_name() {
        assert_eq!(ImportedName::new("foo").used_name(), "foo");
        assert_eq!(ImportedName::with_alias("foo", "bar").used_name(), "bar");
    }

    #[test]
    fn test_reference_segments() {
        let reference = Reference::call("self.store.save", Some("User.save".to_string()), 3);
        assert_eq!(reference.segments(), vec!["self", "store", "save"]);
        assert_eq!(reference.kind, ReferenceKind::Call);
    }

    #[test]
    fn test_serialization() {
        let file = sample_file();
        let json = serde_json::to_string(&file).expect("serialize");
        let parsed: FileEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, file);
    }
}
