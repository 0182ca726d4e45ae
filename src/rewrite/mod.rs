//! The capture rewrite.
//!
//! `build` wraps a script function. Each call of the wrapper rewrites the
//! function so every `if`, `for`, `while`, assignment and `del` checks at run
//! time whether its value is symbolic, emits the rewritten code as a new
//! unit, runs it, and returns the block the call captured.

use std::{io, rc::Rc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    ast::statements::Statement,
    runtime::{Closure, Env, Fault, FaultKind, Function, Interpreter, Scope, Unit, Value},
};
use decorators::{Aliases, DecoratorSpec};
use namer::Namer;
use symbols::Symbols;
use transform::BuildTransformer;

pub mod decorators;
pub mod emit;
pub mod namer;
pub mod provenance;
pub mod symbols;
pub mod transform;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error(
        "function {function:?} combines a build decorator with other decorators; \
         no other decorators can be used with it"
    )]
    ChainedDecorator { function: String },
    #[error("unsupported assignment target {target}")]
    UnsupportedTarget { target: String },
    #[error("only script functions can be built, found '{found}'")]
    NotRewritable { found: String },
    #[error("unknown capture switch {0:?}, expected one of: if, for, while, assign, delete")]
    UnknownSwitch(String),
    #[error("failed to write generated code: {0}")]
    Io(#[from] io::Error),
}

/// Which constructs the rewrite captures, and which extra decorators it
/// strips.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(rename = "if")]
    pub support_if: bool,
    #[serde(rename = "for")]
    pub support_for: bool,
    #[serde(rename = "while")]
    pub support_while: bool,
    #[serde(rename = "assign")]
    pub support_assign: bool,
    #[serde(rename = "delete")]
    pub support_delete: bool,
    #[serde(rename = "decorators")]
    pub additional_decorator_specs: Vec<DecoratorSpec>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            support_if: true,
            support_for: true,
            support_while: true,
            support_assign: true,
            support_delete: true,
            additional_decorator_specs: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Disables capturing of one construct.
    pub fn without(mut self, switch: &str) -> Result<Self, RewriteError> {
        match switch {
            "if" => self.support_if = false,
            "for" => self.support_for = false,
            "while" => self.support_while = false,
            "assign" => self.support_assign = false,
            "delete" => self.support_delete = false,
            other => return Err(RewriteError::UnknownSwitch(other.to_string())),
        }
        Ok(self)
    }

    pub fn with_decorator(mut self, spec: DecoratorSpec) -> Self {
        self.additional_decorator_specs.push(spec);
        self
    }

    /// The built-in trigger decorators followed by the additional ones.
    pub fn decorator_specs(&self) -> Vec<DecoratorSpec> {
        let mut specs = decorators::default_specs();
        specs.extend(self.additional_decorator_specs.iter().cloned());
        specs
    }
}

/// A script function wrapped by `build`. Calling it runs the rewritten
/// function.
pub struct BuiltFunction {
    pub target: Rc<Closure>,
    pub config: BuildConfig,
}

impl BuiltFunction {
    pub fn name(&self) -> &str {
        &self.target.def.name.name
    }

    pub fn doc(&self) -> Option<String> {
        self.target.def.doc_string.as_ref().map(|doc| doc.text())
    }

    pub fn params(&self) -> Vec<String> {
        self.target
            .def
            .params
            .iter()
            .map(|param| param.name.clone())
            .collect()
    }
}

/// Wraps a script function.
///
/// Building an already built function wraps the same script function again,
/// with the new configuration.
pub fn build(function: &Value, config: BuildConfig) -> Result<Value, RewriteError> {
    let target = match function {
        Value::Function(Function::Closure(closure)) => closure.clone(),
        Value::Function(Function::Built(built)) => built.target.clone(),
        other => {
            return Err(RewriteError::NotRewritable {
                found: other.type_name().to_string(),
            });
        }
    };
    debug!(function = target.def.name.name, "build");
    Ok(Value::Function(Function::Built(Rc::new(BuiltFunction {
        target,
        config,
    }))))
}

/// The rewritten function, emitted into its own unit.
pub struct CompiledFunction {
    pub unit: Rc<Unit>,
    pub statements: Vec<Statement>,
    /// Name of the function that returns the rewritten function.
    pub outer: String,
}

/// Rewrites and emits a script function.
#[instrument(level = "debug", skip_all, fields(function = %target.def.name.name))]
pub fn compile(target: &Closure, config: &BuildConfig) -> Result<CompiledFunction, RewriteError> {
    let def = &target.def;
    let globals = target.env.globals();

    let aliases = Aliases::collect(&config.decorator_specs(), &globals);
    let decorators = aliases.strip(&def.decorators, &def.name.name)?;

    let symbols = Symbols::of(def);
    let free_variables = symbols.free_variables(&target.env);
    let namer = Namer::new(globals.names().into_iter().chain(symbols.all.iter().cloned()));

    let wrapped = BuildTransformer::new(config, namer).wrap(def, decorators, &free_variables)?;
    let mut statements = wrapped.statements;
    let (source, line_map) = emit::emit(&mut statements);
    debug!(
        outer = wrapped.outer,
        lines = line_map.len(),
        "generated source:\n{source}"
    );

    let unit = Unit::generated(source, target.unit.clone(), line_map)?;
    Ok(CompiledFunction {
        unit,
        statements,
        outer: wrapped.outer,
    })
}

/// Runs a compiled unit and returns the rewritten function, closing over
/// the same scope as the original.
pub fn load(
    interpreter: &mut Interpreter,
    target: &Closure,
    compiled: &CompiledFunction,
) -> Result<Value, Fault> {
    let env = Env {
        scope: Scope::child(&target.env.globals()),
        unit: compiled.unit.clone(),
    };
    interpreter.exec_unit(&compiled.statements, &env)?;
    let outer = env
        .scope
        .get(&compiled.outer)
        .ok_or_else(|| FaultKind::UndefinedName(compiled.outer.clone()))?;

    Ok(match interpreter.call(&outer, vec![])? {
        Value::Function(Function::Closure(inner)) => {
            Value::Function(Function::Closure(Rc::new(Closure {
                def: inner.def.clone(),
                env: target.env.clone(),
                unit: inner.unit.clone(),
            })))
        }
        other => other,
    })
}

/// Calls a built function: rewrite, load, then run. Faults raised by the
/// generated code carry its provenance.
#[instrument(level = "debug", skip_all, fields(function = %built.name()))]
pub fn invoke(
    interpreter: &mut Interpreter,
    built: &Rc<BuiltFunction>,
    args: Vec<Value>,
) -> Result<Value, Fault> {
    let compiled = compile(&built.target, &built.config)?;
    interpreter.record_generated(&compiled.unit);

    let unit = compiled.unit.clone();
    let inner = load(interpreter, &built.target, &compiled)
        .map_err(|fault| provenance::attach(fault, &unit))?;
    interpreter
        .call(&inner, args)
        .map_err(|fault| provenance::attach(fault, &unit))
}

#[cfg(test)]
mod tests {
    use super::{BuildConfig, RewriteError, decorators::DecoratorSpec};

    #[test]
    fn without_disables_one_construct() {
        let config = BuildConfig::default().without("while").unwrap();
        assert!(!config.support_while);
        assert!(config.support_if && config.support_for);
        assert!(config.support_assign && config.support_delete);
        assert!(matches!(
            BuildConfig::default().without("loop"),
            Err(RewriteError::UnknownSwitch(_))
        ));
    }

    #[test]
    fn decorator_specs_include_defaults() {
        let config = BuildConfig::default().with_decorator(DecoratorSpec::new("tools", "wrap"));
        let specs = config.decorator_specs();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0], DecoratorSpec::new("captive", "build"));
        assert_eq!(specs[2], DecoratorSpec::new("tools", "wrap"));
    }

    #[test]
    fn config_from_toml() {
        let config: BuildConfig = toml::from_str(
            "if = false\n[[decorators]]\nmodule = \"tools\"\nmethod = \"wrap\"\n",
        )
        .unwrap();
        assert!(!config.support_if);
        assert!(config.support_for);
        assert_eq!(config.additional_decorator_specs.len(), 1);
    }
}
