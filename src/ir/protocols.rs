//! Capability protocols.
//!
//! A value is readable, writable, iterable or deletable only when its type
//! opts in. Host values such as ints or strings never do, which is what lets
//! rewritten code tell native control flow from symbolic control flow.

use crate::runtime::Value;

use super::Statement;

pub trait SupportsReadable {
    fn is_readable(&self) -> bool {
        false
    }
}

pub trait SupportsWritable {
    fn is_writable(&self) -> bool {
        false
    }
}

pub trait SupportsIterable {
    fn is_iterable(&self) -> bool {
        false
    }

    /// The variables bound on each symbolic iteration.
    fn loop_vars(&self) -> Vec<Value> {
        Vec::new()
    }
}

pub trait SupportsDeletable {
    fn is_deletable(&self) -> bool {
        false
    }
}

/// Values that know which of their parts may be read after assignment.
pub trait SupportsReadableTargets {
    fn readable_targets(&self) -> Option<Vec<Value>> {
        None
    }
}

impl SupportsReadable for Value {
    fn is_readable(&self) -> bool {
        match self {
            Value::Register(register) => register.is_readable(),
            Value::Iterable(iterable) => iterable.is_readable(),
            _ => false,
        }
    }
}

impl SupportsWritable for Value {
    fn is_writable(&self) -> bool {
        match self {
            Value::Register(register) => register.is_writable(),
            _ => false,
        }
    }
}

impl SupportsIterable for Value {
    fn is_iterable(&self) -> bool {
        match self {
            Value::Iterable(iterable) => iterable.is_iterable(),
            Value::Register(register) => register.is_iterable(),
            _ => false,
        }
    }

    fn loop_vars(&self) -> Vec<Value> {
        match self {
            Value::Iterable(iterable) => iterable.loop_vars(),
            _ => Vec::new(),
        }
    }
}

impl SupportsDeletable for Value {
    fn is_deletable(&self) -> bool {
        match self {
            Value::Register(register) => register.is_deletable(),
            _ => false,
        }
    }
}

impl SupportsReadableTargets for Value {
    fn readable_targets(&self) -> Option<Vec<Value>> {
        match self {
            Value::Statement(Statement::Instruction(instruction)) => {
                instruction.readable_targets()
            }
            Value::Register(register) => register.readable_targets(),
            _ => None,
        }
    }
}

pub fn is_readable(value: &Value) -> bool {
    value.is_readable()
}

pub fn is_writable(value: &Value) -> bool {
    value.is_writable()
}

pub fn is_iterable(value: &Value) -> bool {
    value.is_iterable()
}

pub fn is_deletable(value: &Value) -> bool {
    value.is_deletable()
}

pub fn loop_vars(value: &Value) -> Vec<Value> {
    value.loop_vars()
}

/// The parts of `value` that may be read back after assigning it.
///
/// Values that declare their readable targets report them; otherwise a
/// readable value is its own single target and anything else has none.
pub fn readable_targets(value: &Value) -> Vec<Value> {
    if let Some(targets) = value.readable_targets() {
        return targets;
    }
    if is_readable(value) {
        vec![value.clone()]
    } else {
        Vec::new()
    }
}
