use std::{
    cell::RefCell,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    rc::Rc,
};

use itertools::Itertools;
use tracing::warn;

use super::{
    Statement,
    errors::IrError,
    stack::{current_block, pop_block, push_block, register},
};

/// An append-only, ordered sequence of statements.
///
/// Blocks are shared handles: cloning one gives another handle to the same
/// statements. Equality and hashing are structural over the statements.
#[derive(Clone)]
pub struct Block {
    inner: Rc<BlockInner>,
}

struct BlockInner {
    statements: RefCell<Vec<Statement>>,
    is_program: bool,
}

impl Block {
    /// Creates an empty block and appends it to the innermost open block.
    pub fn new() -> Self {
        let block = Self::detached(false);
        register(&Statement::Block(block.clone()));
        block
    }

    /// Creates a block owned by a parent statement. It is never registered
    /// on its own, its parent is.
    pub(crate) fn detached(is_program: bool) -> Self {
        Self {
            inner: Rc::new(BlockInner {
                statements: RefCell::new(Vec::new()),
                is_program,
            }),
        }
    }

    pub fn of(statements: impl IntoIterator<Item = Statement>) -> Self {
        let block = Self::new();
        block.extend(statements);
        block
    }

    pub fn append(&self, statement: Statement) {
        self.inner.statements.borrow_mut().push(statement);
    }

    pub fn extend(&self, statements: impl IntoIterator<Item = Statement>) {
        self.inner.statements.borrow_mut().extend(statements);
    }

    pub fn len(&self) -> usize {
        self.inner.statements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.statements.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Statement> {
        self.inner.statements.borrow().get(index).cloned()
    }

    /// A snapshot of the statements, in append order.
    pub fn statements(&self) -> Vec<Statement> {
        self.inner.statements.borrow().clone()
    }

    pub fn is_program(&self) -> bool {
        self.inner.is_program
    }

    /// Whether both handles point at the same block.
    pub fn same(&self, other: &Block) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Opens this block: statements built until the guard is dropped are
    /// appended to it.
    pub fn enter(&self) -> BlockGuard {
        push_block(self.clone());
        BlockGuard {
            block: self.clone(),
        }
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes its block when dropped, on every exit path.
#[must_use = "the block is closed as soon as the guard is dropped"]
pub struct BlockGuard {
    block: Block,
}

impl BlockGuard {
    pub fn block(&self) -> &Block {
        &self.block
    }
}

impl Drop for BlockGuard {
    fn drop(&mut self) {
        match pop_block() {
            Ok(popped) if popped.same(&self.block) => {}
            Ok(_) => warn!("closed a block that was not the innermost open one"),
            Err(e) => warn!("failed to close block: {e}"),
        }
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.same(other) || *self.inner.statements.borrow() == *other.inner.statements.borrow()
    }
}

impl Eq for Block {}

impl Hash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.statements.borrow().hash(state);
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.is_program() { "Program" } else { "Block" };
        f.debug_tuple(name)
            .field(&*self.inner.statements.borrow())
            .finish()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self
            .inner
            .statements
            .borrow()
            .iter()
            .map(|s| s.to_string())
            .join("\n");
        if self.is_program() {
            f.write_str(&body)
        } else {
            f.write_str(&indent(&body))
        }
    }
}

/// Prefixes every non-empty line with two spaces.
pub(crate) fn indent(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {line}")
            }
        })
        .join("\n")
}

/// The root block of a capture.
///
/// A program is never appended to another block, so it can only be created
/// when no block is open.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Program(Block);

impl Program {
    pub fn new() -> Result<Self, IrError> {
        if current_block().is_some() {
            return Err(IrError::ProgramInsideBlock);
        }
        Ok(Self(Block::detached(true)))
    }

    pub fn of(statements: impl IntoIterator<Item = Statement>) -> Result<Self, IrError> {
        let program = Self::new()?;
        program.extend(statements);
        Ok(program)
    }

    pub fn into_block(self) -> Block {
        self.0
    }
}

impl Deref for Program {
    type Target = Block;

    fn deref(&self) -> &Block {
        &self.0
    }
}

impl From<Program> for Block {
    fn from(program: Program) -> Self {
        program.0
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
