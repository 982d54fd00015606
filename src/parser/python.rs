// Python parser using tree-sitter

use crate::error::{Error, Result};
use crate::parser::ast::*;
use tree_sitter::{Node, Parser};

/// Extensions the Python grammar understands
pub const PYTHON_EXTENSIONS: &[&str] = &["py", "pyi"];

/// Parser for Python source files
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Check whether a path has a Python source extension
    pub fn supports(path: &str) -> bool {
        path.rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.ends_with('/') && PYTHON_EXTENSIONS.contains(&ext))
    }

    /// Parse one file's text into its structural model.
    ///
    /// Never fails: unsupported formats and syntax errors produce an entry
    /// with `is_parseable == false` that keeps only the raw text.
    pub fn parse(&mut self, path: &str, text: &str) -> FileEntry {
        if !Self::supports(path) {
            return FileEntry::unparseable(path, text);
        }

        let tree = match self.parser.parse(text, None) {
            Some(tree) => tree,
            None => {
                tracing::debug!("tree-sitter gave up on {}", path);
                return FileEntry::unparseable(path, text);
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!("syntax error in {}", path);
            return FileEntry::unparseable(path, text);
        }

        let source = text.as_bytes();
        let mut file = FileEntry::new(path, text);

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "class_definition" => {
                    add_class(&mut file, &child, &child, source);
                }
                "function_definition" => {
                    add_function(&mut file, &child, &child, source);
                }
                "decorated_definition" => match child.child_by_field_name("definition") {
                    Some(def) if def.kind() == "class_definition" => {
                        add_class(&mut file, &def, &child, source);
                    }
                    Some(def) if def.kind() == "function_definition" => {
                        add_function(&mut file, &def, &child, source);
                    }
                    _ => collect_calls(&child, source, None, &mut file.references),
                },
                "expression_statement" => {
                    collect_variables(&child, source, &mut file.variables);
                    collect_calls(&child, source, None, &mut file.references);
                }
                _ => collect_calls(&child, source, None, &mut file.references),
            }
        }

        collect_imports(&root, source, &mut file.imports);

        file
    }
}

fn add_class(file: &mut FileEntry, def: &Node, outer: &Node, source: &[u8]) {
    if let Some((class, references)) = parse_class(def, outer, source) {
        file.classes.push(class);
        file.references.extend(references);
    }
}

fn add_function(file: &mut FileEntry, def: &Node, outer: &Node, source: &[u8]) {
    if let Some(func) = parse_function(def, outer, source, None) {
        collect_calls(outer, source, Some(&func.name), &mut file.references);
        file.functions.push(func);
    }
}

/// Span of a definition, starting at its first decorator when decorated
fn span_of(outer: &Node) -> SourceSpan {
    SourceSpan::new(outer.start_position().row + 1, outer.end_position().row + 1)
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source).ok()
}

/// Parse a class definition with its methods and the references in its body
fn parse_class(def: &Node, outer: &Node, source: &[u8]) -> Option<(ClassEntry, Vec<Reference>)> {
    let name = node_text(&def.child_by_field_name("name")?, source)?;
    let mut class = ClassEntry::new(name, span_of(outer));
    let mut references = Vec::new();
    let scope = Some(name);

    // Decorator calls belong to the class
    if outer.kind() == "decorated_definition" {
        let mut cursor = outer.walk();
        for child in outer.children(&mut cursor) {
            if child.kind() == "decorator" {
                collect_calls(&child, source, scope, &mut references);
            }
        }
    }

    if let Some(superclasses) = def.child_by_field_name("superclasses") {
        let line = superclasses.start_position().row + 1;
        for base in extract_bases(&superclasses, source) {
            references.push(Reference::inherit(&base, scope.map(str::to_string), line));
            class.bases.push(base);
        }
        collect_calls(&superclasses, source, scope, &mut references);
    }

    if let Some(body) = def.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            let method_def = match child.kind() {
                "function_definition" => Some(child),
                "decorated_definition" => child
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition"),
                _ => None,
            };

            match method_def.and_then(|d| parse_function(&d, &child, source, Some(name))) {
                Some(method) => {
                    let qualified = method.qualified_name();
                    collect_calls(&child, source, Some(&qualified), &mut references);
                    class.methods.push(method);
                }
                None => collect_calls(&child, source, scope, &mut references),
            }
        }
    }

    Some((class, references))
}

/// Extract base classes from the superclass argument list
fn extract_bases(node: &Node, source: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" | "attribute" => {
                if let Some(text) = node_text(&child, source).and_then(dotted_path) {
                    bases.push(text);
                }
            }
            "subscript" => {
                // Generic[T] and friends: the subscripted value is the base
                if let Some(text) = child
                    .child_by_field_name("value")
                    .and_then(|v| node_text(&v, source))
                    .and_then(dotted_path)
                {
                    bases.push(text);
                }
            }
            _ => {}
        }
    }

    bases
}

/// Parse a function definition; `outer` is the decorated wrapper when present
fn parse_function(
    def: &Node,
    outer: &Node,
    source: &[u8],
    enclosing_class: Option<&str>,
) -> Option<FunctionEntry> {
    let name = node_text(&def.child_by_field_name("name")?, source)?;
    let mut func = FunctionEntry::new(name, span_of(outer));
    func.enclosing_class = enclosing_class.map(str::to_string);
    func.is_async = has_async_keyword(def);

    if outer.kind() == "decorated_definition" {
        func.decorators = extract_decorators(outer, source);
    }

    if let Some(params) = def.child_by_field_name("parameters") {
        func.signature = parse_parameters(&params, source);
    }

    // The implicit receiver is not part of the signature
    if func.is_method()
        && !func.is_staticmethod()
        && func.signature.first().is_some_and(|p| !p.starts_with('*'))
    {
        func.signature.remove(0);
    }

    Some(func)
}

/// Check if a function_definition node has an async keyword
fn has_async_keyword(node: &Node) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == "async");
    found
}

/// Extract decorators from a decorated definition
fn extract_decorators(node: &Node, source: &[u8]) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(text) = node_text(&child, source) {
                // Remove @ prefix and any arguments
                let dec = text.trim_start_matches('@');
                let dec = match dec.find('(') {
                    Some(idx) => &dec[..idx],
                    None => dec,
                };
                decorators.push(dec.trim().to_string());
            }
        }
    }

    decorators
}

/// Parameter names in order; splats keep their star prefix
fn parse_parameters(node: &Node, source: &[u8]) -> Vec<String> {
    let mut params = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        let name = match child.kind() {
            "identifier" => node_text(&child, source).map(str::to_string),
            "default_parameter" | "typed_default_parameter" => child
                .child_by_field_name("name")
                .and_then(|n| node_text(&n, source))
                .map(str::to_string),
            "typed_parameter" => first_parameter_name(&child, source),
            "list_splat_pattern" | "dictionary_splat_pattern" => splat_name(&child, source),
            _ => None,
        };

        if let Some(name) = name {
            params.push(name);
        }
    }

    params
}

/// Name inside a typed parameter, which may itself wrap a splat
fn first_parameter_name(node: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(|child| match child.kind() {
        "identifier" => node_text(&child, source).map(str::to_string),
        "list_splat_pattern" | "dictionary_splat_pattern" => splat_name(&child, source),
        _ => None,
    });
    found
}

fn splat_name(node: &Node, source: &[u8]) -> Option<String> {
    let prefix = if node.kind() == "list_splat_pattern" { "*" } else { "**" };
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|c| c.kind() == "identifier")
        .and_then(|ident| node_text(&ident, source))
        .map(|name| format!("{}{}", prefix, name));
    found
}

/// Record the names assigned by a module-level expression statement
fn collect_variables(node: &Node, source: &[u8], variables: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "assignment" {
            collect_assignment_targets(&child, source, variables);
        }
    }
}

fn collect_assignment_targets(assignment: &Node, source: &[u8], variables: &mut Vec<String>) {
    if let Some(left) = assignment.child_by_field_name("left") {
        collect_target_names(&left, source, variables);
    }
    // a = b = 1
    if let Some(right) = assignment.child_by_field_name("right") {
        if right.kind() == "assignment" {
            collect_assignment_targets(&right, source, variables);
        }
    }
}

fn collect_target_names(node: &Node, source: &[u8], variables: &mut Vec<String>) {
    match node.kind() {
        "identifier" => {
            if let Some(name) = node_text(node, source) {
                if !variables.iter().any(|v| v == name) {
                    variables.push(name.to_string());
                }
            }
        }
        "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_target_names(&child, source, variables);
            }
        }
        _ => {}
    }
}

/// Collect every call expression under `node`, attributed to `scope`
fn collect_calls(node: &Node, source: &[u8], scope: Option<&str>, references: &mut Vec<Reference>) {
    if node.kind() == "call" {
        if let Some(target) = node
            .child_by_field_name("function")
            .filter(|f| matches!(f.kind(), "identifier" | "attribute"))
            .and_then(|f| node_text(&f, source))
            .and_then(dotted_path)
        {
            let line = node.start_position().row + 1;
            references.push(Reference::call(&target, scope.map(str::to_string), line));
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls(&child, source, scope, references);
    }
}

/// Normalize `a . b` to `a.b`; reject anything that is not a plain dotted path
fn dotted_path(text: &str) -> Option<String> {
    let path: String = text.chars().filter(|c| !c.is_whitespace() && *c != '\\').collect();
    let valid = !path.is_empty()
        && path
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
    valid.then_some(path)
}

/// Collect import statements anywhere in the tree
fn collect_imports(node: &Node, source: &[u8], imports: &mut Vec<Import>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_statement" => imports.extend(parse_import(&child, source)),
            "import_from_statement" => {
                if let Some(import) = parse_import_from(&child, source) {
                    imports.push(import);
                }
            }
            _ => collect_imports(&child, source, imports),
        }
    }
}

/// Parse an import statement: `import x`, `import x as y`, `import x, y`
fn parse_import(node: &Node, source: &[u8]) -> Vec<Import> {
    let line = node.start_position().row + 1;
    let mut imports = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                if let Some(module) = node_text(&child, source) {
                    imports.push(Import::simple(module, line));
                }
            }
            "aliased_import" => {
                let name = child.child_by_field_name("name").and_then(|n| node_text(&n, source));
                let alias = child.child_by_field_name("alias").and_then(|a| node_text(&a, source));
                if let (Some(name), Some(alias)) = (name, alias) {
                    imports.push(Import {
                        module: name.to_string(),
                        names: vec![ImportedName::with_alias(name, alias)],
                        kind: ImportKind::Direct,
                        line,
                    });
                }
            }
            _ => {}
        }
    }

    imports
}

/// Parse an import-from statement: `from x import y`
fn parse_import_from(node: &Node, source: &[u8]) -> Option<Import> {
    let line = node.start_position().row + 1;
    let mut module = String::new();
    let mut names = Vec::new();
    let mut relative_level = 0;
    let mut seen_import_keyword = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "relative_import" => {
                // Handle relative imports like `from ..utils import x`
                let mut inner_cursor = child.walk();
                for inner in child.children(&mut inner_cursor) {
                    match inner.kind() {
                        "import_prefix" => {
                            relative_level = node_text(&inner, source)?
                                .chars()
                                .filter(|c| *c == '.')
                                .count();
                        }
                        "dotted_name" => {
                            module = node_text(&inner, source)?.to_string();
                        }
                        _ => {}
                    }
                }
            }
            "dotted_name" => {
                let text = node_text(&child, source)?;
                if !seen_import_keyword {
                    module = text.to_string();
                } else {
                    names.push(ImportedName::new(text));
                }
            }
            "import" => {
                seen_import_keyword = true;
            }
            "wildcard_import" => {
                names.push(ImportedName::new("*"));
            }
            "aliased_import" => {
                let name = child.child_by_field_name("name").and_then(|n| node_text(&n, source));
                let alias = child.child_by_field_name("alias").and_then(|a| node_text(&a, source));
                match (name, alias) {
                    (Some(name), Some(alias)) => names.push(ImportedName::with_alias(name, alias)),
                    (Some(name), None) => names.push(ImportedName::new(name)),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    let import = if relative_level > 0 {
        Import::relative(&module, names, relative_level, line)
    } else {
        Import::from_import(&module, names, line)
    };
    Some(import)
}
