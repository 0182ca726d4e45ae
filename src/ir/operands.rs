use std::{fmt, rc::Rc};

use educe::Educe;

use super::{
    errors::IrError,
    protocols::{
        self, SupportsDeletable, SupportsIterable, SupportsReadable, SupportsReadableTargets,
        SupportsWritable,
    },
};
use crate::runtime::Value;

/// A named symbolic storage location.
///
/// Two registers are the same register when their names match, whatever
/// their capabilities.
#[derive(Debug, Clone, Eq, Educe)]
#[educe(PartialEq, Hash)]
pub struct Register {
    name: Rc<str>,
    #[educe(PartialEq(ignore), Hash(ignore))]
    readable: bool,
    #[educe(PartialEq(ignore), Hash(ignore))]
    writable: bool,
    #[educe(PartialEq(ignore), Hash(ignore))]
    deletable: bool,
}

impl Register {
    /// A readable, writable and deletable register.
    pub fn new(name: &str) -> Self {
        Self::with_capabilities(name, true, true, true)
    }

    pub fn with_capabilities(name: &str, readable: bool, writable: bool, deletable: bool) -> Self {
        Self {
            name: name.into(),
            readable,
            writable,
            deletable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SupportsReadable for Register {
    fn is_readable(&self) -> bool {
        self.readable
    }
}

impl SupportsWritable for Register {
    fn is_writable(&self) -> bool {
        self.writable
    }
}

impl SupportsDeletable for Register {
    fn is_deletable(&self) -> bool {
        self.deletable
    }
}

impl SupportsIterable for Register {}

impl SupportsReadableTargets for Register {}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R({})", self.name)
    }
}

/// A symbolic iterable: a name plus the writable loop variables it binds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iterable {
    name: Rc<str>,
    loop_vars: Vec<Value>,
}

impl Iterable {
    pub fn new(name: &str, loop_vars: Vec<Value>) -> Result<Self, IrError> {
        if let Some(var) = loop_vars.iter().find(|var| !protocols::is_writable(var)) {
            return Err(IrError::NotWritable {
                iterable: name.to_string(),
                found: var.repr(),
            });
        }
        Ok(Self {
            name: name.into(),
            loop_vars,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SupportsIterable for Iterable {
    fn is_iterable(&self) -> bool {
        true
    }

    fn loop_vars(&self) -> Vec<Value> {
        self.loop_vars.clone()
    }
}

impl SupportsReadable for Iterable {}

impl fmt::Display for Iterable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
