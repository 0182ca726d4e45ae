use std::path::PathBuf;

use statements::Statement;

pub mod common;
pub mod expressions;
pub mod functions;
pub mod statements;

/// A single parsed source file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompilationUnit {
    pub file_path: PathBuf,
    pub statements: Vec<Statement>,
}
