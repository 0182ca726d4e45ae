use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
    sync::Arc,
};

use itertools::Itertools;

use super::{error::Fault, interpreter::Interpreter, scope::Scope, unit::Unit};
use crate::{
    ast::functions::FunctionDef,
    ir::{Iterable, Op, Register, Statement},
    rewrite::{BuildConfig, BuiltFunction},
};

/// A runtime value of a captive script.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Tuple(Rc<[Value]>),
    Function(Function),
    Module(Rc<NativeModule>),
    Config(Rc<BuildConfig>),
    Op(Op),
    Register(Register),
    Iterable(Rc<Iterable>),
    Statement(Statement),
}

#[derive(Clone)]
pub enum Function {
    Closure(Rc<Closure>),
    Native(Rc<NativeFunction>),
    Built(Rc<BuiltFunction>),
}

/// A function defined by script code, with the scope it closes over and the
/// unit its body was parsed from.
pub struct Closure {
    pub def: Arc<FunctionDef>,
    pub env: Rc<Scope>,
    pub unit: Rc<Unit>,
}

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Fault>>;

pub struct NativeFunction {
    /// Name of the module this function is exposed from, if any.
    pub module: Option<String>,
    pub name: String,
    pub func: NativeFn,
}

/// A module implemented by the host, importable from scripts.
pub struct NativeModule {
    pub name: String,
    pub members: HashMap<String, Value>,
}

impl NativeModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: HashMap::new(),
        }
    }

    pub fn function(
        mut self,
        name: &str,
        func: impl Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Fault> + 'static,
    ) -> Self {
        let value = Value::native(Some(&self.name), name, func);
        self.members.insert(name.to_string(), value);
        self
    }

    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.members.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Closure(closure) => &closure.def.name.name,
            Function::Native(native) => &native.name,
            Function::Built(built) => built.name(),
        }
    }

    pub fn doc(&self) -> Option<String> {
        match self {
            Function::Closure(closure) => closure.def.doc_string.as_ref().map(|d| d.text()),
            Function::Native(_) => None,
            Function::Built(built) => built.doc(),
        }
    }

    /// Parameter names, when the function was defined by script code.
    pub fn params(&self) -> Option<Vec<String>> {
        match self {
            Function::Closure(closure) => Some(
                closure
                    .def
                    .params
                    .iter()
                    .map(|p| p.name.clone())
                    .collect(),
            ),
            Function::Native(_) => None,
            Function::Built(built) => Some(built.params()),
        }
    }

    fn address(&self) -> usize {
        match self {
            Function::Closure(f) => Rc::as_ptr(f) as *const () as usize,
            Function::Native(f) => Rc::as_ptr(f) as *const () as usize,
            Function::Built(f) => Rc::as_ptr(f) as *const () as usize,
        }
    }
}

impl Value {
    pub fn native(
        module: Option<&str>,
        name: &str,
        func: impl Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Fault> + 'static,
    ) -> Self {
        Value::Function(Function::Native(Rc::new(NativeFunction {
            module: module.map(str::to_string),
            name: name.to_string(),
            func: Rc::new(func),
        })))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::Function(_) => "function",
            Value::Module(_) => "module",
            Value::Config(_) => "config",
            Value::Op(_) => "op",
            Value::Register(_) => "register",
            Value::Iterable(_) => "iterable",
            Value::Statement(statement) => statement.kind_name(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Statement(Statement::Block(block)) => !block.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&crate::ir::Block> {
        match self {
            Value::Statement(Statement::Block(block)) => Some(block),
            _ => None,
        }
    }

    /// Like `Display`, but quotes strings.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", &**s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => f.write_str(s),
            Value::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0].repr()),
            Value::Tuple(items) => write!(f, "({})", items.iter().map(Value::repr).join(", ")),
            Value::Function(function) => write!(f, "<fn {}>", function.name()),
            Value::Module(module) => write!(f, "<module {}>", module.name),
            Value::Config(_) => f.write_str("<build config>"),
            Value::Op(op) => fmt::Display::fmt(op, f),
            Value::Register(register) => fmt::Display::fmt(register, f),
            Value::Iterable(iterable) => fmt::Display::fmt(iterable, f),
            Value::Statement(statement) => fmt::Display::fmt(statement, f),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Statement(statement) => fmt::Debug::fmt(statement, f),
            Value::Config(config) => fmt::Debug::fmt(config, f),
            other => f.write_str(&other.repr()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.address() == b.address(),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Config(a), Value::Config(b)) => a == b,
            (Value::Op(a), Value::Op(b)) => a == b,
            (Value::Register(a), Value::Register(b)) => a == b,
            (Value::Iterable(a), Value::Iterable(b)) => a == b,
            (Value::Statement(a), Value::Statement(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Tuple(items) => items.hash(state),
            Value::Function(function) => function.address().hash(state),
            Value::Module(module) => module.name.hash(state),
            Value::Config(config) => config.hash(state),
            Value::Op(op) => op.hash(state),
            Value::Register(register) => register.hash(state),
            Value::Iterable(iterable) => iterable.hash(state),
            Value::Statement(statement) => statement.hash(state),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Statement> for Value {
    fn from(value: Statement) -> Self {
        Value::Statement(value)
    }
}

impl From<Register> for Value {
    fn from(value: Register) -> Self {
        Value::Register(value)
    }
}

impl From<Op> for Value {
    fn from(value: Op) -> Self {
        Value::Op(value)
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::ir::Register;

    #[test]
    fn display_and_repr() {
        assert_eq!(Value::None.to_string(), "none");
        assert_eq!(Value::from("a").to_string(), "a");
        assert_eq!(Value::from("a").repr(), "\"a\"");
        assert_eq!(
            Value::tuple(vec![Value::from("a"), Value::Int(1)]).to_string(),
            "(\"a\", 1)"
        );
        assert_eq!(Value::tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(Value::from(Register::new("q")).to_string(), "R(q)");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::tuple(vec![]).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(Register::new("q")).is_truthy());
    }

    #[test]
    fn native_functions_compare_by_identity() {
        let f = Value::native(None, "f", |_, _| Ok(Value::None));
        let g = Value::native(None, "f", |_, _| Ok(Value::None));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }
}
