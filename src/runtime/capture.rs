//! The `captive` module: IR constructors, capability checks, the build
//! decorators and the helpers rewritten code calls.

use std::rc::Rc;

use super::{
    builtins::expect_args,
    error::Fault,
    interpreter::Interpreter,
    value::{NativeModule, Value},
};
use crate::{
    ir::{
        self, Assign, Block, Delete, For, If, Iterable, Op, Program, Register, Statement, While,
        protocols,
    },
    lowering::{Lowering, OpListing},
    rewrite::{self, BuildConfig, decorators::DecoratorSpec},
};

pub const MODULE_NAME: &str = "captive";

pub fn module() -> NativeModule {
    NativeModule::new(MODULE_NAME)
        .function("build", |interpreter, args| {
            expect_args("build", &args, 1)?;
            Ok(rewrite::build(&args[0], interpreter.config().clone())?)
        })
        .function("build_with_config", build_with_config)
        .function("without", without)
        .function("with_decorator", with_decorator)
        .function("op", |_, args| {
            expect_args("op", &args, 1)?;
            Ok(Value::Op(Op::new(str_arg("op", &args[0])?)))
        })
        .function("register", register)
        .function("iterable", |_, args| {
            let Some((name, vars)) = args.split_first() else {
                return Err(Fault::type_error("iterable() requires a name"));
            };
            let iterable = Iterable::new(str_arg("iterable", name)?, vars.to_vec())?;
            Ok(Value::Iterable(Rc::new(iterable)))
        })
        .function("Block", |_, args| {
            let statements = args
                .iter()
                .map(|arg| statement_arg("Block", arg))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Statement::Block(Block::of(statements)).into())
        })
        .function("Program", |_, args| {
            expect_args("Program", &args, 0)?;
            Ok(Statement::Block(Program::new()?.into_block()).into())
        })
        .function("current_block", |_, args| {
            expect_args("current_block", &args, 0)?;
            Ok(ir::stack::current_block()
                .map(|block| Statement::Block(block).into())
                .unwrap_or(Value::None))
        })
        .function("is_readable", |_, args| {
            predicate("is_readable", &args, protocols::is_readable)
        })
        .function("is_writable", |_, args| {
            predicate("is_writable", &args, protocols::is_writable)
        })
        .function("is_iterable", |_, args| {
            predicate("is_iterable", &args, protocols::is_iterable)
        })
        .function("is_deletable", |_, args| {
            predicate("is_deletable", &args, protocols::is_deletable)
        })
        .function("readable_targets", |_, args| {
            expect_args("readable_targets", &args, 1)?;
            Ok(Value::tuple(protocols::readable_targets(&args[0])))
        })
        .function("loop_vars", |_, args| {
            expect_args("loop_vars", &args, 1)?;
            Ok(Value::tuple(protocols::loop_vars(&args[0])))
        })
        .function("If", |_, args| {
            expect_args("If", &args, 1)?;
            Ok(Statement::If(If::new(args[0].clone())?).into())
        })
        .function("For", |_, args| {
            expect_args("For", &args, 1)?;
            Ok(Statement::For(For::new(args[0].clone())?).into())
        })
        .function("While", |_, args| {
            expect_args("While", &args, 1)?;
            Ok(Statement::While(While::new(args[0].clone())?).into())
        })
        .function("Assign", |_, args| {
            expect_args("Assign", &args, 2)?;
            let names = names_arg("Assign", &args[0])?;
            Ok(Statement::Assign(Assign::new(names, args[1].clone())).into())
        })
        .function("Delete", |_, args| {
            expect_args("Delete", &args, 1)?;
            let names = names_arg("Delete", &args[0])?;
            Ok(Statement::Delete(Delete::new(names)).into())
        })
        .function("if_block", |_, args| child_block("if_block", &args))
        .function("else_block", |_, args| child_block("else_block", &args))
        .function("loop_block", |_, args| child_block("loop_block", &args))
        .function("capture_root", |_, args| {
            expect_args("capture_root", &args, 0)?;
            let root = match ir::stack::current_block() {
                Some(_) => Block::new(),
                None => Program::new()?.into_block(),
            };
            Ok(Statement::Block(root).into())
        })
        .function("symbolic_iteration", |_, args| {
            expect_args("symbolic_iteration", &args, 1)?;
            let mut vars = protocols::loop_vars(&args[0]);
            let item = if vars.len() == 1 {
                vars.remove(0)
            } else {
                Value::tuple(vars)
            };
            Ok(Value::tuple(vec![item]))
        })
        .function("deletable_names", |_, args| {
            expect_args("deletable_names", &args, 2)?;
            let (Value::Tuple(values), Value::Tuple(names)) = (&args[0], &args[1]) else {
                return Err(Fault::type_error("deletable_names() expects two tuples"));
            };
            Ok(Value::tuple(
                values
                    .iter()
                    .zip(names.iter())
                    .filter(|(value, _)| protocols::is_deletable(value))
                    .map(|(_, name)| name.clone())
                    .collect(),
            ))
        })
        .function("unwrap_single", |_, args| {
            expect_args("unwrap_single", &args, 1)?;
            match &args[0] {
                Value::Tuple(items) if items.len() == 1 => Ok(items[0].clone()),
                other => Ok(other.clone()),
            }
        })
        .function("lower", lower)
}

fn build_with_config(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    expect_args("build_with_config", &args, 1)?;
    let config = config_arg("build_with_config", &args[0])?;
    Ok(Value::native(
        None,
        "build_with_config",
        move |_, args: Vec<Value>| {
            expect_args("build_with_config", &args, 1)?;
            Ok(rewrite::build(&args[0], config.clone())?)
        },
    ))
}

/// `without("if", "while")`: the interpreter's configuration with the named
/// constructs left uncaptured.
fn without(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    let mut config = interpreter.config().clone();
    for arg in &args {
        config = config.without(str_arg("without", arg)?)?;
    }
    Ok(Value::Config(Rc::new(config)))
}

/// `with_decorator(config, module, method)`.
fn with_decorator(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    expect_args("with_decorator", &args, 3)?;
    let config = config_arg("with_decorator", &args[0])?;
    let spec = DecoratorSpec::new(
        str_arg("with_decorator", &args[1])?,
        str_arg("with_decorator", &args[2])?,
    );
    Ok(Value::Config(Rc::new(config.with_decorator(spec))))
}

/// `register(name)` or `register(name, readable, writable, deletable)`.
fn register(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    let register = match args.as_slice() {
        [name] => Register::new(str_arg("register", name)?),
        [name, readable, writable, deletable] => Register::with_capabilities(
            str_arg("register", name)?,
            readable.is_truthy(),
            writable.is_truthy(),
            deletable.is_truthy(),
        ),
        _ => {
            return Err(Fault::type_error(format!(
                "register() takes 1 or 4 arguments but {} were given",
                args.len()
            )));
        }
    };
    Ok(Value::Register(register))
}

/// `lower(block, ops...)`: the block's instructions as text, restricted to
/// the given operators when any are named.
fn lower(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    let Some((block, ops)) = args.split_first() else {
        return Err(Fault::type_error("lower() requires a block"));
    };
    let Some(block) = block.as_block() else {
        return Err(Fault::type_error(format!(
            "lower() expects a block, found '{}'",
            block.type_name()
        )));
    };
    let mut listing = if ops.is_empty() {
        OpListing::new(None)
    } else {
        let ops = ops
            .iter()
            .map(|op| match op {
                Value::Op(op) => Ok(op.name().to_string()),
                other => str_arg("lower", other).map(str::to_string),
            })
            .collect::<Result<_, _>>()?;
        OpListing::new(Some(ops))
    };
    let lowered = listing.lower(block)?;
    Ok(Value::tuple(
        lowered
            .iter()
            .map(|op| Value::from(op.to_string()))
            .collect(),
    ))
}

fn child_block(name: &str, args: &[Value]) -> Result<Value, Fault> {
    expect_args(name, args, 1)?;
    let Value::Statement(statement) = &args[0] else {
        if matches!(args[0], Value::None) {
            return Ok(Value::None);
        }
        return Err(Fault::type_error(format!(
            "{name}() expects a statement, found '{}'",
            args[0].type_name()
        )));
    };
    let block = match (name, statement) {
        ("if_block", Statement::If(s)) => s.if_block(),
        ("else_block", Statement::If(s)) => s.else_block(),
        ("else_block", Statement::For(s)) => s.else_block(),
        ("else_block", Statement::While(s)) => s.else_block(),
        ("loop_block", Statement::For(s)) => s.loop_block(),
        ("loop_block", Statement::While(s)) => s.loop_block(),
        _ => {
            return Err(Fault::type_error(format!(
                "'{}' statement has no {name}",
                statement.kind_name()
            )));
        }
    };
    Ok(Statement::Block(block.clone()).into())
}

fn predicate(name: &str, args: &[Value], check: fn(&Value) -> bool) -> Result<Value, Fault> {
    expect_args(name, args, 1)?;
    Ok(Value::Bool(check(&args[0])))
}

fn str_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, Fault> {
    value.as_str().ok_or_else(|| {
        Fault::type_error(format!(
            "{name}() expected a str, found '{}'",
            value.type_name()
        ))
    })
}

fn config_arg(name: &str, value: &Value) -> Result<BuildConfig, Fault> {
    match value {
        Value::Config(config) => Ok((**config).clone()),
        other => Err(Fault::type_error(format!(
            "{name}() expected a build config, found '{}'",
            other.type_name()
        ))),
    }
}

fn statement_arg(name: &str, value: &Value) -> Result<Statement, Fault> {
    match value {
        Value::Statement(statement) => Ok(statement.clone()),
        other => Err(Fault::type_error(format!(
            "{name}() expected a statement, found '{}'",
            other.type_name()
        ))),
    }
}

fn names_arg(name: &str, value: &Value) -> Result<Vec<String>, Fault> {
    match value {
        Value::Tuple(items) => items
            .iter()
            .map(|item| str_arg(name, item).map(str::to_string))
            .collect(),
        Value::Str(single) => Ok(vec![single.to_string()]),
        other => Err(Fault::type_error(format!(
            "{name}() expected a tuple of names, found '{}'",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::module;
    use crate::{
        ir::{Block, Register, Statement},
        runtime::{Interpreter, Value},
    };

    fn call(name: &str, args: Vec<Value>) -> Result<Value, crate::runtime::Fault> {
        let member = module().get(name).unwrap();
        Interpreter::new().call(&member, args)
    }

    #[test]
    fn symbolic_iteration_unwraps_single_variable() {
        let i = Value::Register(Register::new("i"));
        let j = Value::Register(Register::new("j"));
        let one = call("iterable", vec!["r".into(), i.clone()]).unwrap();
        assert_eq!(
            call("symbolic_iteration", vec![one]).unwrap(),
            Value::tuple(vec![i.clone()])
        );
        let two = call("iterable", vec!["r".into(), i.clone(), j.clone()]).unwrap();
        assert_eq!(
            call("symbolic_iteration", vec![two]).unwrap(),
            Value::tuple(vec![Value::tuple(vec![i, j])])
        );
    }

    #[test]
    fn deletable_names_filters() {
        let values = Value::tuple(vec![Value::Int(1), Value::Register(Register::new("q"))]);
        let names = Value::tuple(vec!["a".into(), "b".into()]);
        assert_eq!(
            call("deletable_names", vec![values, names]).unwrap(),
            Value::tuple(vec!["b".into()])
        );
    }

    #[test]
    fn capture_root_depends_on_open_block() {
        let root = call("capture_root", vec![]).unwrap();
        assert_eq!(root.type_name(), "program");
        let outer = Block::new();
        let _guard = outer.enter();
        let nested = call("capture_root", vec![]).unwrap();
        assert_eq!(nested.type_name(), "block");
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn child_blocks_of_none_are_none() {
        assert_eq!(call("if_block", vec![Value::None]).unwrap(), Value::None);
        let reg = Value::Register(Register::new("c"));
        let statement = call("If", vec![reg]).unwrap();
        let Value::Statement(Statement::Block(_)) = call("else_block", vec![statement.clone()]).unwrap() else {
            panic!("expected a block");
        };
        assert!(call("loop_block", vec![statement]).is_err());
    }

    #[test]
    fn register_arities() {
        assert!(call("register", vec!["a".into()]).is_ok());
        let restricted = call(
            "register",
            vec!["a".into(), true.into(), false.into(), false.into()],
        )
        .unwrap();
        assert_eq!(
            call("is_writable", vec![restricted]).unwrap(),
            Value::Bool(false)
        );
        assert!(call("register", vec!["a".into(), true.into()]).is_err());
    }
}
