use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use super::value::Value;

/// A variable namespace. Function scopes chain to the scope the function
/// was defined in, ending at the module globals.
#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn global() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::default(),
            parent: Some(parent.clone()),
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Removes a local binding.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.vars.borrow_mut().remove(name)
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    pub fn is_global(&self) -> bool {
        self.parent.is_none()
    }

    /// The outermost scope of the chain.
    pub fn globals(self: &Rc<Self>) -> Rc<Scope> {
        match &self.parent {
            Some(parent) => parent.globals(),
            None => self.clone(),
        }
    }

    /// Names bound directly in this scope.
    pub fn names(&self) -> Vec<String> {
        self.vars.borrow().keys().cloned().collect()
    }

    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.vars
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Names bound in this scope or any enclosing function scope, excluding
    /// the globals.
    pub fn enclosing_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        let mut scope = Some(self);
        while let Some(current) = scope {
            if current.is_global() {
                break;
            }
            names.extend(current.vars.borrow().keys().cloned());
            scope = current.parent.as_deref();
        }
        names
    }
}
