use std::{fmt, rc::Rc};

use itertools::Itertools;

use super::{
    block::Block,
    errors::IrError,
    protocols::{self, SupportsReadableTargets},
    stack::register,
};
use crate::runtime::Value;

/// A node of the captured IR.
///
/// Constructing any of these through its `new` function appends it to the
/// innermost open block. Blocks owned by a parent statement are not
/// registered on their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Statement {
    Instruction(Rc<Instruction>),
    If(Rc<If>),
    For(Rc<For>),
    While(Rc<While>),
    Assign(Rc<Assign>),
    Delete(Rc<Delete>),
    Block(Block),
}

impl Statement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Instruction(_) => "instruction",
            Statement::If(_) => "if",
            Statement::For(_) => "for",
            Statement::While(_) => "while",
            Statement::Assign(_) => "assign",
            Statement::Delete(_) => "delete",
            Statement::Block(block) if block.is_program() => "program",
            Statement::Block(_) => "block",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Instruction(s) => fmt::Display::fmt(s, f),
            Statement::If(s) => fmt::Display::fmt(s, f),
            Statement::For(s) => fmt::Display::fmt(s, f),
            Statement::While(s) => fmt::Display::fmt(s, f),
            Statement::Assign(s) => fmt::Display::fmt(s, f),
            Statement::Delete(s) => fmt::Display::fmt(s, f),
            Statement::Block(s) => fmt::Display::fmt(s, f),
        }
    }
}

/// A named operation. Calling it with targets yields an instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Op {
    name: Rc<str>,
}

impl Op {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, targets: Vec<Value>) -> Rc<Instruction> {
        Instruction::new(self.clone(), targets)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    op: Op,
    targets: Vec<Value>,
}

impl Instruction {
    pub fn new(op: Op, targets: Vec<Value>) -> Rc<Self> {
        let instruction = Rc::new(Self { op, targets });
        register(&Statement::Instruction(instruction.clone()));
        instruction
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn targets(&self) -> &[Value] {
        &self.targets
    }
}

impl SupportsReadableTargets for Instruction {
    fn readable_targets(&self) -> Option<Vec<Value>> {
        Some(
            self.targets
                .iter()
                .filter(|target| protocols::is_readable(target))
                .cloned()
                .collect(),
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.targets.is_empty() {
            write!(f, "{}", self.op)
        } else {
            write!(f, "{} {}", self.op, self.targets.iter().join(", "))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct If {
    condition: Value,
    if_block: Block,
    else_block: Block,
}

impl If {
    pub fn new(condition: Value) -> Result<Rc<Self>, IrError> {
        if !protocols::is_readable(&condition) {
            return Err(IrError::NotReadable {
                node: "if",
                found: condition.repr(),
            });
        }
        let statement = Rc::new(Self {
            condition,
            if_block: Block::detached(false),
            else_block: Block::detached(false),
        });
        register(&Statement::If(statement.clone()));
        Ok(statement)
    }

    pub fn condition(&self) -> &Value {
        &self.condition
    }

    pub fn if_block(&self) -> &Block {
        &self.if_block
    }

    pub fn else_block(&self) -> &Block {
        &self.else_block
    }
}

impl fmt::Display for If {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {}:\n{}", self.condition, self.if_block)?;
        if !self.else_block.is_empty() {
            write!(f, "\nelse:\n{}", self.else_block)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct For {
    iterable: Value,
    loop_block: Block,
    else_block: Block,
}

impl For {
    pub fn new(iterable: Value) -> Result<Rc<Self>, IrError> {
        if !protocols::is_iterable(&iterable) {
            return Err(IrError::NotIterable {
                found: iterable.repr(),
            });
        }
        let statement = Rc::new(Self {
            iterable,
            loop_block: Block::detached(false),
            else_block: Block::detached(false),
        });
        register(&Statement::For(statement.clone()));
        Ok(statement)
    }

    pub fn iterable(&self) -> &Value {
        &self.iterable
    }

    pub fn loop_vars(&self) -> Vec<Value> {
        protocols::loop_vars(&self.iterable)
    }

    pub fn loop_block(&self) -> &Block {
        &self.loop_block
    }

    pub fn else_block(&self) -> &Block {
        &self.else_block
    }
}

impl fmt::Display for For {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "for {} in {}:\n{}",
            self.loop_vars().iter().join(", "),
            self.iterable,
            self.loop_block
        )?;
        if !self.else_block.is_empty() {
            write!(f, "\nelse:\n{}", self.else_block)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct While {
    condition: Value,
    loop_block: Block,
    else_block: Block,
}

impl While {
    pub fn new(condition: Value) -> Result<Rc<Self>, IrError> {
        if !protocols::is_readable(&condition) {
            return Err(IrError::NotReadable {
                node: "while",
                found: condition.repr(),
            });
        }
        let statement = Rc::new(Self {
            condition,
            loop_block: Block::detached(false),
            else_block: Block::detached(false),
        });
        register(&Statement::While(statement.clone()));
        Ok(statement)
    }

    pub fn condition(&self) -> &Value {
        &self.condition
    }

    pub fn loop_block(&self) -> &Block {
        &self.loop_block
    }

    pub fn else_block(&self) -> &Block {
        &self.else_block
    }
}

impl fmt::Display for While {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "while {}:\n{}", self.condition, self.loop_block)?;
        if !self.else_block.is_empty() {
            write!(f, "\nelse:\n{}", self.else_block)?;
        }
        Ok(())
    }
}

/// A capturable assignment of a value to named targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Assign {
    names: Vec<String>,
    value: Value,
}

impl Assign {
    pub fn new(names: Vec<String>, value: Value) -> Rc<Self> {
        let statement = Rc::new(Self { names, value });
        register(&Statement::Assign(statement.clone()));
        statement
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.names.iter().join(", "), self.value)
    }
}

/// A capturable deletion of named variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Delete {
    names: Vec<String>,
}

impl Delete {
    pub fn new(names: Vec<String>) -> Rc<Self> {
        let statement = Rc::new(Self { names });
        register(&Statement::Delete(statement.clone()));
        statement
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "del {}", self.names.iter().join(", "))
    }
}
