use std::sync::Arc;

use itertools::Itertools;

use crate::{
    ast::{
        expressions::{ArithOp, BinaryOp, Expression, LogicOp, UnaryOp, ValueExpr},
        functions::FunctionDef,
        statements::{Statement, StatementKind, Target},
    },
    runtime::LineMap,
};

const INDENT: &str = "    ";

/// Renders statements back to source text.
///
/// Every statement's `line` is set to the line it is written on, and the
/// returned map sends each written line to the user-written line it stands
/// for.
pub fn emit(statements: &mut [Statement]) -> (String, LineMap) {
    let mut emitter = Emitter::default();
    for statement in statements {
        emitter.statement(statement);
    }
    (emitter.out, emitter.line_map)
}

struct Emitter {
    out: String,
    line: usize,
    depth: usize,
    line_map: LineMap,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            out: String::new(),
            line: 1,
            depth: 0,
            line_map: LineMap::new(),
        }
    }
}

impl Emitter {
    fn write_line(&mut self, origin: usize, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
        self.line_map.insert(self.line, origin);
        self.line += 1;
    }

    fn block(&mut self, statements: &mut [Statement]) {
        self.depth += 1;
        for statement in statements {
            self.statement(statement);
        }
        self.depth -= 1;
    }

    fn statement(&mut self, stmt: &mut Statement) {
        let origin = stmt.original_line();
        stmt.origin = Some(origin);
        stmt.line = self.line;

        match &mut stmt.kind {
            StatementKind::Expr(expr) => self.write_line(origin, &format!("{};", expression(expr))),
            StatementKind::Assign(assign) => {
                let text = format!("{} = {};", target(&assign.target), expression(&assign.value));
                self.write_line(origin, &text);
            }
            StatementKind::AugAssign(aug) => {
                let op = match aug.op {
                    ArithOp::Add => "+=",
                    ArithOp::Sub => "-=",
                    _ => "*=",
                };
                let text = format!("{} {op} {};", aug.name.name, expression(&aug.value));
                self.write_line(origin, &text);
            }
            StatementKind::Delete(delete) => {
                let text = format!("del {};", delete.targets.iter().map(|t| &t.name).join(", "));
                self.write_line(origin, &text);
            }
            StatementKind::If(if_stmt) => {
                self.write_line(origin, &format!("if {} {{", expression(&if_stmt.cond)));
                self.block(&mut if_stmt.then_block);
                if let Some(else_block) = &mut if_stmt.else_block {
                    self.write_line(origin, "} else {");
                    self.block(else_block);
                }
                self.write_line(origin, "}");
            }
            StatementKind::For(for_stmt) => {
                let header = format!(
                    "for {} in {} {{",
                    target(&for_stmt.target),
                    expression(&for_stmt.iter)
                );
                self.write_line(origin, &header);
                self.block(&mut for_stmt.body);
                if let Some(else_block) = &mut for_stmt.else_block {
                    self.write_line(origin, "} else {");
                    self.block(else_block);
                }
                self.write_line(origin, "}");
            }
            StatementKind::While(while_stmt) => {
                self.write_line(origin, &format!("while {} {{", expression(&while_stmt.cond)));
                self.block(&mut while_stmt.body);
                if let Some(else_block) = &mut while_stmt.else_block {
                    self.write_line(origin, "} else {");
                    self.block(else_block);
                }
                self.write_line(origin, "}");
            }
            StatementKind::With(with) => {
                let header = match &with.binding {
                    Some(binding) => {
                        format!("with {} as {} {{", expression(&with.context), binding.name)
                    }
                    None => format!("with {} {{", expression(&with.context)),
                };
                self.write_line(origin, &header);
                self.block(&mut with.body);
                self.write_line(origin, "}");
            }
            StatementKind::Return(Some(value)) => {
                self.write_line(origin, &format!("return {};", expression(value)));
            }
            StatementKind::Return(None) => self.write_line(origin, "return;"),
            StatementKind::Raise(value) => {
                self.write_line(origin, &format!("raise {};", expression(value)));
            }
            StatementKind::Break => self.write_line(origin, "break;"),
            StatementKind::Continue => self.write_line(origin, "continue;"),
            StatementKind::Pass => self.write_line(origin, "pass;"),
            StatementKind::FnDef(def) => self.function(Arc::make_mut(def)),
            StatementKind::Import(import) => {
                let mut text = if import.items.is_empty() {
                    format!("import {}", import.module.name)
                } else {
                    let items = import
                        .items
                        .iter()
                        .map(|item| match &item.alias {
                            Some(alias) if alias.name != item.name.name => {
                                format!("{} as {}", item.name.name, alias.name)
                            }
                            _ => item.name.name.clone(),
                        })
                        .join(", ");
                    format!("from {} import {items}", import.module.name)
                };
                if let Some(alias) = import.alias.as_ref().filter(|a| a.name != import.module.name) {
                    text.push_str(&format!(" as {}", alias.name));
                }
                text.push(';');
                self.write_line(origin, &text);
            }
        }
    }

    fn function(&mut self, def: &mut FunctionDef) {
        let origin = def.original_line();
        def.origin = Some(origin);
        def.line = self.line;
        if let Some(doc) = &def.doc_string {
            for line in &doc.contents {
                self.write_line(origin, &format!("///{line}"));
            }
        }
        for decorator in &def.decorators {
            self.write_line(origin, &format!("@{}", expression(decorator)));
        }
        let header = format!(
            "fn {}({}) {{",
            def.name.name,
            def.params.iter().map(|p| &p.name).join(", ")
        );
        self.write_line(origin, &header);
        self.block(&mut def.body);
        self.write_line(origin, "}");
    }
}

fn target(target: &Target) -> String {
    match target {
        Target::Name(name) => name.name.clone(),
        Target::Tuple(items, _) if items.len() >= 2 => items.iter().map(nested_target).join(", "),
        Target::Tuple(..) => nested_target(target),
    }
}

fn nested_target(target: &Target) -> String {
    match target {
        Target::Name(name) => name.name.clone(),
        Target::Tuple(items, _) if items.len() == 1 => format!("({},)", nested_target(&items[0])),
        Target::Tuple(items, _) => format!("({})", items.iter().map(nested_target).join(", ")),
    }
}

// Binding strength of each expression form, loosest first.
const OR: u8 = 1;
const AND: u8 = 2;
const NOT: u8 = 3;
const CMP: u8 = 4;
const ADD: u8 = 5;
const MUL: u8 = 6;
const UNARY: u8 = 7;
const POSTFIX: u8 = 8;
const ATOM: u8 = 9;

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::Value(ValueExpr::ConstInt(i), _) if *i < 0 => UNARY,
        Expression::Value(..) | Expression::Name(_) | Expression::Tuple(..) | Expression::List(..) => {
            ATOM
        }
        Expression::Attribute(..) | Expression::Call(_) | Expression::Index(..) => POSTFIX,
        Expression::UnaryOp(UnaryOp::ArithNeg, ..) => UNARY,
        Expression::UnaryOp(UnaryOp::LogicalNot, ..) => NOT,
        Expression::BinaryOp(_, op, _, _) => match op {
            BinaryOp::Logic(LogicOp::Or) => OR,
            BinaryOp::Logic(LogicOp::And) => AND,
            BinaryOp::Compare(_) => CMP,
            BinaryOp::Arith(ArithOp::Add | ArithOp::Sub) => ADD,
            BinaryOp::Arith(_) => MUL,
        },
    }
}

fn operand(expr: &Expression, min: u8) -> String {
    if precedence(expr) < min {
        format!("({})", expression(expr))
    } else {
        expression(expr)
    }
}

/// Source text of an expression, parenthesized only where needed.
pub fn expression(expr: &Expression) -> String {
    match expr {
        Expression::Value(value, _) => match value {
            ValueExpr::ConstNone => "none".to_string(),
            ValueExpr::ConstBool(b) => b.to_string(),
            ValueExpr::ConstInt(i) => i.to_string(),
            ValueExpr::ConstStr(s) => quote(s),
        },
        Expression::Name(name) => name.name.clone(),
        Expression::Tuple(items, _) if items.len() == 1 => format!("({},)", expression(&items[0])),
        Expression::Tuple(items, _) => format!("({})", items.iter().map(expression).join(", ")),
        Expression::List(items, _) => format!("[{}]", items.iter().map(expression).join(", ")),
        Expression::Attribute(value, attr, _) => format!("{}.{}", operand(value, POSTFIX), attr.name),
        Expression::Call(call) => format!(
            "{}({})",
            operand(&call.callee, POSTFIX),
            call.args.iter().map(expression).join(", ")
        ),
        Expression::Index(value, index, _) => {
            format!("{}[{}]", operand(value, POSTFIX), expression(index))
        }
        Expression::UnaryOp(UnaryOp::ArithNeg, value, _) => format!("-{}", operand(value, UNARY)),
        Expression::UnaryOp(UnaryOp::LogicalNot, value, _) => format!("not {}", operand(value, NOT)),
        Expression::BinaryOp(lhs, op, rhs, _) => {
            let strength = precedence(expr);
            let (left, right) = match op {
                BinaryOp::Compare(_) => (CMP + 1, CMP + 1),
                _ => (strength, strength + 1),
            };
            format!("{} {} {}", operand(lhs, left), op.symbol(), operand(rhs, right))
        }
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
