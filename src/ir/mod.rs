//! The captured intermediate representation.
//!
//! Statements build themselves into whichever block is innermost on the
//! current thread's block stack, so running ordinary code inside an open
//! block records what it does.

pub mod block;
pub mod errors;
pub mod operands;
pub mod protocols;
pub mod stack;
pub mod statements;

pub use block::{Block, BlockGuard, Program};
pub use errors::IrError;
pub use operands::{Iterable, Register};
pub use statements::{Assign, Delete, For, If, Instruction, Op, Statement, While};
