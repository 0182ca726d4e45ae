//! Functions visible in every scope without an import.

use std::collections::HashMap;

use itertools::Itertools;

use super::{error::Fault, value::Value};
use crate::ir::Statement;

pub fn builtins() -> HashMap<String, Value> {
    [
        Value::native(None, "print", print),
        Value::native(None, "len", len),
        Value::native(None, "range", range),
        Value::native(None, "str", |_, args| {
            expect_args("str", &args, 1)?;
            Ok(Value::from(args[0].to_string()))
        }),
    ]
    .into_iter()
    .map(|value| {
        let name = match &value {
            Value::Function(function) => function.name().to_string(),
            _ => unreachable!("builtins are functions"),
        };
        (name, value)
    })
    .collect()
}

pub(crate) fn expect_args(name: &str, args: &[Value], count: usize) -> Result<(), Fault> {
    if args.len() != count {
        return Err(Fault::type_error(format!(
            "{name}() takes {count} arguments but {} were given",
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn int_arg(name: &str, value: &Value) -> Result<i64, Fault> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(Fault::type_error(format!(
            "{name}() expected an int, found '{}'",
            other.type_name()
        ))),
    }
}

fn print(interpreter: &mut super::Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    let line = args.iter().join(" ");
    interpreter.write_output(&line)?;
    Ok(Value::None)
}

fn len(_: &mut super::Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    expect_args("len", &args, 1)?;
    let len = match &args[0] {
        Value::Tuple(items) => items.len(),
        Value::Str(s) => s.chars().count(),
        Value::Statement(Statement::Block(block)) => block.len(),
        other => {
            return Err(Fault::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(len as i64))
}

fn range(_: &mut super::Interpreter, args: Vec<Value>) -> Result<Value, Fault> {
    let (start, stop, step) = match args.as_slice() {
        [stop] => (0, int_arg("range", stop)?, 1),
        [start, stop] => (int_arg("range", start)?, int_arg("range", stop)?, 1),
        [start, stop, step] => (
            int_arg("range", start)?,
            int_arg("range", stop)?,
            int_arg("range", step)?,
        ),
        _ => {
            return Err(Fault::type_error(format!(
                "range() takes 1 to 3 arguments but {} were given",
                args.len()
            )));
        }
    };
    if step == 0 {
        return Err(Fault::value_error("range() step must not be zero"));
    }
    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Int(current));
        current += step;
    }
    Ok(Value::tuple(items))
}
