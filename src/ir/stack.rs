//! The per-thread stack of open blocks.
//!
//! Every statement constructed while a block is open is appended to the
//! innermost one. Threads never observe each other's stacks.

use std::cell::RefCell;

use tracing::trace;

use super::{Statement, block::Block, errors::IrError};

thread_local! {
    static BLOCK_STACK: RefCell<Vec<Block>> = const { RefCell::new(Vec::new()) };
}

/// The innermost open block, if any.
pub fn current_block() -> Option<Block> {
    BLOCK_STACK.with(|stack| stack.borrow().last().cloned())
}

pub fn push_block(block: Block) {
    BLOCK_STACK.with(|stack| stack.borrow_mut().push(block));
    trace!(depth = depth(), "pushed block");
}

pub fn pop_block() -> Result<Block, IrError> {
    let block = BLOCK_STACK.with(|stack| stack.borrow_mut().pop().ok_or(IrError::EmptyStack))?;
    trace!(depth = depth(), "popped block");
    Ok(block)
}

/// Number of blocks currently open on this thread.
pub fn depth() -> usize {
    BLOCK_STACK.with(|stack| stack.borrow().len())
}

/// Appends a freshly built statement to the innermost open block.
pub(crate) fn register(statement: &Statement) {
    if let Some(block) = current_block() {
        block.append(statement.clone());
    }
}
