use std::{collections::HashMap, io::Write, rc::Rc};

use tracing::{debug, instrument, trace};

use super::{
    builtins,
    capture,
    error::{Fault, FaultKind, TraceEntry},
    scope::Scope,
    unit::Unit,
    value::{Closure, Function, NativeModule, Value},
};
use crate::{
    ast::{
        CompilationUnit,
        expressions::{ArithOp, BinaryOp, CmpOp, Expression, LogicOp, UnaryOp, ValueExpr},
        statements::{Statement, StatementKind, Target},
    },
    ir,
    rewrite::{self, BuildConfig},
};

/// Script functions calling each other deeper than this fault instead of
/// overflowing the host stack.
pub const MAX_CALL_DEPTH: usize = 64;

/// Where statements execute: the variables they see and the unit they
/// were parsed from.
pub struct Env {
    pub scope: Rc<Scope>,
    pub unit: Rc<Unit>,
}

enum Flow {
    Next,
    Break,
    Continue,
    Return(Value),
}

/// A tree walking interpreter for captive scripts.
pub struct Interpreter {
    modules: HashMap<String, Rc<NativeModule>>,
    builtins: HashMap<String, Value>,
    frames: Vec<TraceEntry>,
    config: BuildConfig,
    out: Box<dyn Write>,
    keep_generated: bool,
    generated: Vec<(String, String)>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let mut interpreter = Self {
            modules: HashMap::new(),
            builtins: builtins::builtins(),
            frames: Vec::new(),
            config: BuildConfig::default(),
            out: Box::new(std::io::stdout()),
            keep_generated: false,
            generated: Vec::new(),
        };
        interpreter.register_module(capture::module());
        interpreter
    }

    /// The configuration `captive.build` uses.
    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    /// Where `print` writes to.
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Keep a copy of every generated unit's source.
    pub fn keep_generated(mut self, keep: bool) -> Self {
        self.keep_generated = keep;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// `(filename, source)` of each unit generated so far, when kept.
    pub fn generated_sources(&self) -> &[(String, String)] {
        &self.generated
    }

    pub(crate) fn record_generated(&mut self, unit: &Unit) {
        if self.keep_generated {
            self.generated
                .push((unit.filename().to_string(), unit.source().to_string()));
        }
    }

    pub fn register_module(&mut self, module: NativeModule) {
        self.modules.insert(module.name.clone(), Rc::new(module));
    }

    pub(crate) fn write_output(&mut self, text: &str) -> Result<(), Fault> {
        writeln!(self.out, "{text}")
            .map_err(|e| Fault::value_error(format!("failed to write output: {e}")))
    }

    /// Runs a parsed module top to bottom and returns its globals.
    #[instrument(level = "debug", skip_all, fields(file = %unit.filename()))]
    pub fn exec_module(
        &mut self,
        module: &CompilationUnit,
        unit: Rc<Unit>,
    ) -> Result<Rc<Scope>, Fault> {
        let globals = Scope::global();
        let env = Env {
            scope: globals.clone(),
            unit,
        };
        self.exec_unit(&module.statements, &env)?;
        Ok(globals)
    }

    /// Runs top level statements of a unit in the given environment.
    pub fn exec_unit(&mut self, statements: &[Statement], env: &Env) -> Result<(), Fault> {
        self.frames.push(TraceEntry {
            file: env.unit.filename().to_string(),
            line: 0,
        });
        let result = self.exec_block(statements, env);
        self.frames.pop();
        match result? {
            Flow::Next => Ok(()),
            Flow::Return(_) => Err(Fault::type_error("'return' outside function")),
            Flow::Break | Flow::Continue => Err(Fault::type_error("'break' outside loop")),
        }
    }

    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Fault> {
        match callee {
            Value::Function(Function::Closure(closure)) => self.call_closure(closure, args),
            Value::Function(Function::Native(native)) => {
                let func = native.func.clone();
                func(self, args)
            }
            Value::Function(Function::Built(built)) => rewrite::invoke(self, built, args),
            Value::Op(op) => Ok(Value::Statement(ir::Statement::Instruction(
                op.call(args),
            ))),
            other => Err(Fault::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: Vec<Value>) -> Result<Value, Fault> {
        let def = &closure.def;
        if args.len() != def.params.len() {
            return Err(Fault::type_error(format!(
                "{}() takes {} arguments but {} were given",
                def.name.name,
                def.params.len(),
                args.len()
            )));
        }
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(FaultKind::RecursionLimit(MAX_CALL_DEPTH).into());
        }

        let scope = Scope::child(&closure.env);
        for (param, arg) in def.params.iter().zip(args) {
            scope.set(&param.name, arg);
        }
        let env = Env {
            scope,
            unit: closure.unit.clone(),
        };

        trace!(function = def.name.name, "call");
        self.frames.push(TraceEntry {
            file: closure.unit.filename().to_string(),
            line: def.line,
        });
        let result = self.exec_block(&def.body, &env);
        self.frames.pop();

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Ok(Value::None),
            Flow::Break | Flow::Continue => Err(Fault::type_error("'break' outside loop")),
        }
    }

    fn exec_block(&mut self, statements: &[Statement], env: &Env) -> Result<Flow, Fault> {
        for statement in statements {
            match self.exec_stmt(statement, env)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn set_line(&mut self, line: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line = line;
        }
    }

    // The innermost statement to see a fault records the traceback.
    fn locate(&self, mut fault: Fault) -> Fault {
        if fault.traceback.is_empty() {
            fault.traceback = self.frames.clone();
        }
        fault
    }

    fn exec_stmt(&mut self, stmt: &Statement, env: &Env) -> Result<Flow, Fault> {
        self.set_line(stmt.line);
        self.exec_kind(stmt, env).map_err(|fault| self.locate(fault))
    }

    fn exec_kind(&mut self, stmt: &Statement, env: &Env) -> Result<Flow, Fault> {
        match &stmt.kind {
            StatementKind::Expr(expr) => {
                self.eval(expr, env)?;
            }
            StatementKind::Assign(assign) => {
                let value = self.eval(&assign.value, env)?;
                self.bind(&assign.target, value, &env.scope)?;
            }
            StatementKind::AugAssign(aug) => {
                let current = self.lookup(&aug.name.name, env)?;
                let rhs = self.eval(&aug.value, env)?;
                let value = arith(aug.op, &current, &rhs)?;
                env.scope.set(&aug.name.name, value);
            }
            StatementKind::Delete(delete) => {
                for target in &delete.targets {
                    if env.scope.remove(&target.name).is_none() {
                        return Err(FaultKind::UndefinedName(target.name.clone()).into());
                    }
                }
            }
            StatementKind::If(if_stmt) => {
                if self.eval(&if_stmt.cond, env)?.is_truthy() {
                    return self.exec_block(&if_stmt.then_block, env);
                } else if let Some(else_block) = &if_stmt.else_block {
                    return self.exec_block(else_block, env);
                }
            }
            StatementKind::For(for_stmt) => {
                let iterable = self.eval(&for_stmt.iter, env)?;
                for item in self.iterate(&iterable)? {
                    self.bind(&for_stmt.target, item, &env.scope)?;
                    match self.exec_block(&for_stmt.body, env)? {
                        Flow::Break => return Ok(Flow::Next),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Next | Flow::Continue => {}
                    }
                    self.set_line(stmt.line);
                }
                if let Some(else_block) = &for_stmt.else_block {
                    return self.exec_block(else_block, env);
                }
            }
            StatementKind::While(while_stmt) => loop {
                self.set_line(stmt.line);
                if !self.eval(&while_stmt.cond, env)?.is_truthy() {
                    if let Some(else_block) = &while_stmt.else_block {
                        return self.exec_block(else_block, env);
                    }
                    break;
                }
                match self.exec_block(&while_stmt.body, env)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Next | Flow::Continue => {}
                }
            },
            StatementKind::With(with) => {
                let context = self.eval(&with.context, env)?;
                let _guard = match &context {
                    Value::Statement(ir::Statement::Block(block)) => Some(block.enter()),
                    Value::None => None,
                    other => {
                        return Err(Fault::type_error(format!(
                            "'{}' object can't be used in a with statement",
                            other.type_name()
                        )));
                    }
                };
                if let Some(binding) = &with.binding {
                    env.scope.set(&binding.name, context.clone());
                }
                return self.exec_block(&with.body, env);
            }
            StatementKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, env)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StatementKind::Raise(value) => {
                let value = self.eval(value, env)?;
                return Err(FaultKind::Raised(value.to_string()).into());
            }
            StatementKind::Break => return Ok(Flow::Break),
            StatementKind::Continue => return Ok(Flow::Continue),
            StatementKind::Pass => {}
            StatementKind::FnDef(def) => {
                let decorators = def
                    .decorators
                    .iter()
                    .map(|decorator| self.eval(decorator, env))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut value = Value::Function(Function::Closure(Rc::new(Closure {
                    def: def.clone(),
                    env: env.scope.clone(),
                    unit: env.unit.clone(),
                })));
                for decorator in decorators.iter().rev() {
                    value = self.call(decorator, vec![value])?;
                }
                env.scope.set(&def.name.name, value);
            }
            StatementKind::Import(import) => {
                let module = self
                    .modules
                    .get(&import.module.name)
                    .cloned()
                    .ok_or_else(|| FaultKind::ModuleNotFound(import.module.name.clone()))?;
                debug!(module = import.module.name, "import");
                if import.items.is_empty() {
                    let name = import.alias.as_ref().unwrap_or(&import.module);
                    env.scope.set(&name.name, Value::Module(module.clone()));
                }
                for item in &import.items {
                    let value = module.get(&item.name.name).ok_or_else(|| {
                        FaultKind::MissingAttribute {
                            owner: format!("module {:?}", module.name),
                            name: item.name.name.clone(),
                        }
                    })?;
                    env.scope.set(&item.bound_name().name, value);
                }
            }
        }
        Ok(Flow::Next)
    }

    fn lookup(&self, name: &str, env: &Env) -> Result<Value, Fault> {
        env.scope
            .get(name)
            .or_else(|| self.builtins.get(name).cloned())
            .ok_or_else(|| FaultKind::UndefinedName(name.to_string()).into())
    }

    fn bind(&mut self, target: &Target, value: Value, scope: &Scope) -> Result<(), Fault> {
        match target {
            Target::Name(name) => {
                scope.set(&name.name, value);
                Ok(())
            }
            Target::Tuple(targets, _) => {
                let items = self.iterate(&value)?;
                if items.len() != targets.len() {
                    return Err(Fault::value_error(format!(
                        "expected {} values to unpack, got {}",
                        targets.len(),
                        items.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.bind(target, item, scope)?;
                }
                Ok(())
            }
        }
    }

    /// The items a native `for` loop visits.
    pub fn iterate(&self, value: &Value) -> Result<Vec<Value>, Fault> {
        match value {
            Value::Tuple(items) => Ok(items.to_vec()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            Value::Statement(ir::Statement::Block(block)) => Ok(block
                .statements()
                .into_iter()
                .map(Value::Statement)
                .collect()),
            other => Err(Fault::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    fn eval(&mut self, expr: &Expression, env: &Env) -> Result<Value, Fault> {
        match expr {
            Expression::Value(value, _) => Ok(match value {
                ValueExpr::ConstNone => Value::None,
                ValueExpr::ConstBool(b) => Value::Bool(*b),
                ValueExpr::ConstInt(i) => Value::Int(*i),
                ValueExpr::ConstStr(s) => Value::from(s.as_str()),
            }),
            Expression::Name(ident) => self.lookup(&ident.name, env),
            Expression::Tuple(items, _) | Expression::List(items, _) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::tuple(items))
            }
            Expression::Attribute(value, name, _) => {
                let value = self.eval(value, env)?;
                attribute(&value, &name.name)
            }
            Expression::Call(call) => {
                let callee = self.eval(&call.callee, env)?;
                let args = call
                    .args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&callee, args)
            }
            Expression::Index(value, index, _) => {
                let value = self.eval(value, env)?;
                let index = self.eval(index, env)?;
                subscript(&value, &index)
            }
            Expression::UnaryOp(op, value, _) => {
                let value = self.eval(value, env)?;
                match op {
                    UnaryOp::LogicalNot => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::ArithNeg => match value {
                        Value::Int(i) => i
                            .checked_neg()
                            .map(Value::Int)
                            .ok_or_else(|| FaultKind::Overflow.into()),
                        other => Err(Fault::type_error(format!(
                            "bad operand type for unary -: '{}'",
                            other.type_name()
                        ))),
                    },
                }
            }
            Expression::BinaryOp(lhs, op, rhs, _) => {
                let lhs = self.eval(lhs, env)?;
                match op {
                    BinaryOp::Logic(LogicOp::And) if !lhs.is_truthy() => Ok(lhs),
                    BinaryOp::Logic(LogicOp::Or) if lhs.is_truthy() => Ok(lhs),
                    BinaryOp::Logic(_) => self.eval(rhs, env),
                    BinaryOp::Arith(op) => {
                        let rhs = self.eval(rhs, env)?;
                        arith(*op, &lhs, &rhs)
                    }
                    BinaryOp::Compare(op) => {
                        let rhs = self.eval(rhs, env)?;
                        compare(*op, &lhs, &rhs)
                    }
                }
            }
        }
    }
}

fn attribute(value: &Value, name: &str) -> Result<Value, Fault> {
    let missing = || {
        Fault::from(FaultKind::MissingAttribute {
            owner: format!("'{}' object", value.type_name()),
            name: name.to_string(),
        })
    };
    match value {
        Value::Module(module) => module.get(name).ok_or_else(missing),
        Value::Function(function) => match name {
            "name" => Ok(Value::from(function.name())),
            "doc" => Ok(function.doc().map(Value::from).unwrap_or(Value::None)),
            _ => Err(missing()),
        },
        _ => Err(missing()),
    }
}

fn subscript(value: &Value, index: &Value) -> Result<Value, Fault> {
    let Value::Int(i) = index else {
        return Err(Fault::type_error(format!(
            "indices must be integers, not '{}'",
            index.type_name()
        )));
    };
    let items = match value {
        Value::Tuple(items) => items.to_vec(),
        Value::Str(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        Value::Statement(ir::Statement::Block(block)) => {
            block.statements().into_iter().map(Value::Statement).collect()
        }
        other => {
            return Err(Fault::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            )));
        }
    };
    let len = items.len();
    let position = if *i < 0 { *i + len as i64 } else { *i };
    usize::try_from(position)
        .ok()
        .and_then(|p| items.get(p).cloned())
        .ok_or_else(|| FaultKind::Index { index: *i, len }.into())
}

fn arith(op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                ArithOp::Add => a.checked_add(b),
                ArithOp::Sub => a.checked_sub(b),
                ArithOp::Mul => a.checked_mul(b),
                ArithOp::Div | ArithOp::Mod if b == 0 => {
                    return Err(FaultKind::ZeroDivision.into());
                }
                // Floor division and modulo, rounding towards negative infinity.
                ArithOp::Div => a.checked_div(b).map(|q| {
                    if a % b != 0 && ((a < 0) != (b < 0)) {
                        q - 1
                    } else {
                        q
                    }
                }),
                ArithOp::Mod => a.checked_rem(b).map(|r| {
                    if r != 0 && ((r < 0) != (b < 0)) {
                        r + b
                    } else {
                        r
                    }
                }),
            };
            result.map(Value::Int).ok_or_else(|| FaultKind::Overflow.into())
        }
        (Value::Str(a), Value::Str(b)) if op == ArithOp::Add => Ok(Value::from(format!("{a}{b}"))),
        (Value::Tuple(a), Value::Tuple(b)) if op == ArithOp::Add => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => Err(Fault::type_error(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    let ordering = match (op, lhs, rhs) {
        (CmpOp::Eq, _, _) => return Ok(Value::Bool(lhs == rhs)),
        (CmpOp::NotEq, _, _) => return Ok(Value::Bool(lhs != rhs)),
        (_, Value::Int(a), Value::Int(b)) => a.cmp(b),
        (_, Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => {
            return Err(Fault::type_error(format!(
                "'{}' not supported between '{}' and '{}'",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            )));
        }
    };
    Ok(Value::Bool(match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::LtEq => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::GtEq => ordering.is_ge(),
        CmpOp::Eq | CmpOp::NotEq => unreachable!("handled above"),
    }))
}
