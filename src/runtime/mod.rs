//! Executes captive scripts.

pub mod builtins;
pub mod capture;
pub mod error;
pub mod interpreter;
pub mod scope;
pub mod unit;
pub mod value;

pub use error::{Fault, FaultKind, TraceEntry};
pub use interpreter::{Env, Interpreter};
pub use scope::Scope;
pub use unit::{LineMap, Unit};
pub use value::{Closure, Function, NativeModule, Value};
