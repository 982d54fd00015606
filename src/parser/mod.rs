// Parser module for extracting the structural model from source files

pub mod ast;
mod python;

pub use ast::*;
pub use python::{PythonParser, PYTHON_EXTENSIONS};
