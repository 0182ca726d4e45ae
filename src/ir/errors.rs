use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("pop from an empty block stack")]
    EmptyStack,
    #[error("a program can only be created when no block is open")]
    ProgramInsideBlock,
    #[error("{node} requires a readable condition, found {found}")]
    NotReadable { node: &'static str, found: String },
    #[error("for requires an iterable, found {found}")]
    NotIterable { found: String },
    #[error("loop variable {found} of iterable {iterable} is not writable")]
    NotWritable { iterable: String, found: String },
    #[error("unsupported operand for {node}: {found}")]
    InvalidOperand { node: &'static str, found: String },
}
