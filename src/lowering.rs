//! Turning a captured block into something a backend runs.

use std::{collections::HashSet, fmt};

use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::{
    ir::{Block, Statement},
    runtime::Value,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoweringError {
    #[error("can't lower {kind} statement:\n{rendered}")]
    UnsupportedStatement { kind: &'static str, rendered: String },
    #[error("unsupported operator {op:?} in {rendered:?}")]
    UnsupportedOperator { op: String, rendered: String },
}

/// Consumes a finished block.
pub trait Lowering {
    type Output;

    fn lower(&mut self, block: &Block) -> Result<Self::Output, LoweringError>;
}

/// One instruction of a flat listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredOp {
    pub op: String,
    pub targets: Vec<Value>,
}

impl fmt::Display for LoweredOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.targets.is_empty() {
            f.write_str(&self.op)
        } else {
            write!(f, "{} {}", self.op, self.targets.iter().join(", "))
        }
    }
}

/// Flattens straight line code into a list of operations.
///
/// Nested plain blocks are inlined. Control flow, assignments and deletions
/// have no flat form and are rejected, as is any operator outside `supported`.
#[derive(Debug, Clone, Default)]
pub struct OpListing {
    supported: Option<HashSet<String>>,
}

impl OpListing {
    /// `None` accepts every operator.
    pub fn new(supported: Option<HashSet<String>>) -> Self {
        Self { supported }
    }

    fn visit(&self, block: &Block, out: &mut Vec<LoweredOp>) -> Result<(), LoweringError> {
        for statement in block.statements() {
            match &statement {
                Statement::Instruction(instruction) => {
                    let op = instruction.op().name();
                    if let Some(supported) = &self.supported {
                        if !supported.contains(op) {
                            return Err(LoweringError::UnsupportedOperator {
                                op: op.to_string(),
                                rendered: statement.to_string(),
                            });
                        }
                    }
                    out.push(LoweredOp {
                        op: op.to_string(),
                        targets: instruction.targets().to_vec(),
                    });
                }
                Statement::Block(inner) => self.visit(inner, out)?,
                other => {
                    return Err(LoweringError::UnsupportedStatement {
                        kind: other.kind_name(),
                        rendered: other.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Lowering for OpListing {
    type Output = Vec<LoweredOp>;

    fn lower(&mut self, block: &Block) -> Result<Vec<LoweredOp>, LoweringError> {
        let mut out = Vec::new();
        self.visit(block, &mut out)?;
        debug!(ops = out.len(), "lowered block");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{Lowering, LoweringError, OpListing};
    use crate::{
        ir::{Block, If, Op, Program, Register, Statement},
        runtime::Value,
    };

    fn program() -> Program {
        let program = Program::new().unwrap();
        {
            let _guard = program.enter();
            Op::new("H").call(vec![0.into()]);
            let inner = Block::new();
            let _inner = inner.enter();
            Op::new("CX").call(vec![0.into(), 1.into()]);
        }
        program
    }

    #[test]
    fn flattens_nested_blocks() {
        let ops = OpListing::default().lower(&program()).unwrap();
        let rendered: Vec<String> = ops.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["H 0", "CX 0, 1"]);
    }

    #[test]
    fn rejects_unsupported_operator() {
        let mut listing = OpListing::new(Some(["H".to_string()].into_iter().collect()));
        let err = listing.lower(&program()).unwrap_err();
        assert_eq!(
            err,
            LoweringError::UnsupportedOperator {
                op: "CX".into(),
                rendered: "CX 0, 1".into()
            }
        );
    }

    #[test]
    fn rejects_control_flow() {
        let block = Block::of([Statement::If(
            If::new(Value::Register(Register::new("m"))).unwrap(),
        )]);
        let err = OpListing::default().lower(&block).unwrap_err();
        assert!(matches!(err, LoweringError::UnsupportedStatement { kind: "if", .. }));
        assert!(err.to_string().contains("if R(m):"));
    }
}
