//! Surveyor - Repository structure extraction for bug localization
//!
//! Parses a checked-out Python repository into a per-file inventory of
//! classes and functions, resolves symbol-level dependency edges between
//! files, and renders compact textual projections for language-model
//! prompts.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;

// Re-export main types
pub use analysis::{
    Analysis, AnalysisOptions, Binding, DependencyEdge, DependencyGraph, EdgeKind, FileFilter, RepoStructure,
    StructureBuilder, Surveyor, SymbolId,
};
pub use config::Config;
pub use error::{Error, Result};
pub use output::{render, RenderMode};
pub use parser::{ClassEntry, FileEntry, FunctionEntry, PythonParser, SourceSpan};
