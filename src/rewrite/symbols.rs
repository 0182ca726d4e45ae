use std::collections::{BTreeSet, HashSet};

use crate::{
    ast::{
        expressions::Expression,
        functions::FunctionDef,
        statements::{Statement, StatementKind},
    },
    runtime::Scope,
};

/// Names a function definition reads and binds, nested definitions
/// included.
#[derive(Debug, Default)]
pub struct Symbols {
    /// Every identifier that appears, in any role.
    pub all: HashSet<String>,
    /// Names read as variables.
    pub referenced: BTreeSet<String>,
    /// Names bound locally, parameters included.
    pub bound: HashSet<String>,
}

impl Symbols {
    pub fn of(def: &FunctionDef) -> Self {
        let mut symbols = Self::default();
        symbols.visit_def(def);
        symbols
    }

    /// Variables the function closes over: read but not bound, and bound in
    /// a non-global enclosing scope.
    pub fn free_variables(&self, env: &Scope) -> Vec<String> {
        let enclosing = env.enclosing_names();
        self.referenced
            .iter()
            .filter(|name| !self.bound.contains(*name) && enclosing.contains(*name))
            .cloned()
            .collect()
    }

    fn bind(&mut self, name: &str) {
        self.all.insert(name.to_string());
        self.bound.insert(name.to_string());
    }

    fn visit_def(&mut self, def: &FunctionDef) {
        self.bind(&def.name.name);
        for decorator in &def.decorators {
            self.visit_expr(decorator);
        }
        for param in &def.params {
            self.bind(&param.name);
        }
        self.visit_block(&def.body);
    }

    fn visit_block(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.visit_stmt(statement);
        }
    }

    fn visit_else(&mut self, block: &Option<Vec<Statement>>) {
        if let Some(block) = block {
            self.visit_block(block);
        }
    }

    fn visit_stmt(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Expr(expr) | StatementKind::Raise(expr) => self.visit_expr(expr),
            StatementKind::Return(expr) => {
                if let Some(expr) = expr {
                    self.visit_expr(expr);
                }
            }
            StatementKind::Assign(assign) => {
                self.visit_expr(&assign.value);
                for name in assign.target.names() {
                    self.bind(&name.name);
                }
            }
            StatementKind::AugAssign(aug) => {
                self.visit_expr(&aug.value);
                self.referenced.insert(aug.name.name.clone());
                self.bind(&aug.name.name);
            }
            StatementKind::Delete(delete) => {
                for target in &delete.targets {
                    self.bind(&target.name);
                }
            }
            StatementKind::If(if_stmt) => {
                self.visit_expr(&if_stmt.cond);
                self.visit_block(&if_stmt.then_block);
                self.visit_else(&if_stmt.else_block);
            }
            StatementKind::For(for_stmt) => {
                self.visit_expr(&for_stmt.iter);
                for name in for_stmt.target.names() {
                    self.bind(&name.name);
                }
                self.visit_block(&for_stmt.body);
                self.visit_else(&for_stmt.else_block);
            }
            StatementKind::While(while_stmt) => {
                self.visit_expr(&while_stmt.cond);
                self.visit_block(&while_stmt.body);
                self.visit_else(&while_stmt.else_block);
            }
            StatementKind::With(with) => {
                self.visit_expr(&with.context);
                if let Some(binding) = &with.binding {
                    self.bind(&binding.name);
                }
                self.visit_block(&with.body);
            }
            StatementKind::FnDef(def) => self.visit_def(def),
            StatementKind::Import(import) => {
                self.all.insert(import.module.name.clone());
                for name in import.bound_names() {
                    self.bind(&name.name);
                }
            }
            StatementKind::Break | StatementKind::Continue | StatementKind::Pass => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expression) {
        match expr {
            Expression::Value(..) => {}
            Expression::Name(name) => {
                self.all.insert(name.name.clone());
                self.referenced.insert(name.name.clone());
            }
            Expression::Tuple(items, _) | Expression::List(items, _) => {
                for item in items {
                    self.visit_expr(item);
                }
            }
            Expression::Attribute(value, attr, _) => {
                self.visit_expr(value);
                self.all.insert(attr.name.clone());
            }
            Expression::Call(call) => {
                self.visit_expr(&call.callee);
                for arg in &call.args {
                    self.visit_expr(arg);
                }
            }
            Expression::Index(value, index, _) => {
                self.visit_expr(value);
                self.visit_expr(index);
            }
            Expression::UnaryOp(_, value, _) => self.visit_expr(value),
            Expression::BinaryOp(lhs, _, rhs, _) => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::Symbols;
    use crate::{
        ast::statements::StatementKind,
        parser::{ProgramSource, parse_ast},
        runtime::{Scope, Value},
    };

    fn symbols_of(source: &str) -> Symbols {
        let program = ProgramSource::new(source.to_string(), Path::new("test.cap"));
        let ast = parse_ast(&program).unwrap();
        let StatementKind::FnDef(def) = &ast.statements[0].kind else {
            panic!("expected a function definition");
        };
        Symbols::of(def)
    }

    #[test]
    fn collects_bound_and_referenced() {
        let symbols = symbols_of(
            "fn f(a) {\n  b = a + c;\n  for i, j in d { del b; }\n  fn g() { return e; }\n}",
        );
        for name in ["f", "a", "b", "i", "j", "g"] {
            assert!(symbols.bound.contains(name), "{name}");
        }
        for name in ["a", "c", "d", "e"] {
            assert!(symbols.referenced.contains(name), "{name}");
        }
        assert!(symbols.all.contains("e"));
    }

    #[test]
    fn free_variables_come_from_enclosing_functions() {
        let symbols = symbols_of("fn f(a) { return a + x + y + print; }");
        let globals = Scope::global();
        globals.set("y", Value::Int(1));
        let local = Scope::child(&globals);
        local.set("x", Value::Int(2));
        assert_eq!(symbols.free_variables(&local), vec!["x".to_string()]);
        assert!(symbols.free_variables(&globals).is_empty());
    }
}
