use std::fmt;

use thiserror::Error;

use crate::{
    ir::IrError, lowering::LoweringError, rewrite::RewriteError,
    rewrite::provenance::GeneratedCodeError,
};

#[derive(Debug, Error)]
pub enum FaultKind {
    #[error("name {0:?} is not defined")]
    UndefinedName(String),
    #[error("module {0:?} not found")]
    ModuleNotFound(String),
    #[error("{owner} has no attribute {name:?}")]
    MissingAttribute { owner: String, name: String },
    #[error("type error: {0}")]
    Type(String),
    #[error("value error: {0}")]
    Value(String),
    #[error("index {index} out of range for length {len}")]
    Index { index: i64, len: usize },
    #[error("division by zero")]
    ZeroDivision,
    #[error("integer overflow")]
    Overflow,
    #[error("maximum call depth of {0} exceeded")]
    RecursionLimit(usize),
    #[error("{0}")]
    Raised(String),
    #[error(transparent)]
    Ir(#[from] IrError),
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
}

/// One frame of a fault's traceback: a file and the line being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A runtime failure of a script.
///
/// The traceback is outermost frame first. Faults raised inside generated
/// code carry a [`GeneratedCodeError`] as their source.
#[derive(Debug)]
pub struct Fault {
    pub kind: FaultKind,
    pub traceback: Vec<TraceEntry>,
    pub cause: Option<Box<GeneratedCodeError>>,
}

impl Fault {
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            traceback: Vec::new(),
            cause: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Type(message.into()))
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Value(message.into()))
    }

    /// The innermost frame, where the fault was raised.
    pub fn innermost(&self) -> Option<&TraceEntry> {
        self.traceback.last()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<FaultKind> for Fault {
    fn from(kind: FaultKind) -> Self {
        Self::new(kind)
    }
}

impl From<IrError> for Fault {
    fn from(err: IrError) -> Self {
        Self::new(err.into())
    }
}

impl From<RewriteError> for Fault {
    fn from(err: RewriteError) -> Self {
        Self::new(err.into())
    }
}

impl From<LoweringError> for Fault {
    fn from(err: LoweringError) -> Self {
        Self::new(err.into())
    }
}
