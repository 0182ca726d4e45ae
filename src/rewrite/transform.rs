use std::sync::Arc;

use tracing::trace;

use super::{BuildConfig, RewriteError, emit, namer::Namer};
use crate::{
    ast::{
        common::{Ident, Span},
        expressions::Expression,
        functions::FunctionDef,
        statements::{
            AssignStmt, DeleteStmt, ForStmt, IfStmt, ImportStmt, Statement, StatementKind, Target,
            WhileStmt, WithStmt,
        },
    },
    runtime::capture::MODULE_NAME,
};

/// The synthesized wrapper module: a single outer function that, once
/// called, returns the rewritten function.
#[derive(Debug)]
pub struct Wrapped {
    pub statements: Vec<Statement>,
    pub outer: String,
}

/// Builds statements standing for one user-written line.
#[derive(Clone, Copy)]
struct Synth {
    line: usize,
}

impl Synth {
    fn of(statement: &Statement) -> Self {
        Self {
            line: statement.original_line(),
        }
    }

    fn stmt(self, kind: StatementKind) -> Statement {
        Statement {
            kind,
            span: Span::default(),
            line: self.line,
            origin: Some(self.line),
        }
    }

    fn expr(self, expr: Expression) -> Statement {
        self.stmt(StatementKind::Expr(expr))
    }

    fn assign(self, name: &str, value: Expression) -> Statement {
        self.assign_to(Target::Name(Ident::synthetic(name)), value)
    }

    fn assign_to(self, target: Target, value: Expression) -> Statement {
        self.stmt(StatementKind::Assign(AssignStmt { target, value }))
    }

    fn if_(self, cond: Expression, then_block: Vec<Statement>) -> Statement {
        self.if_else(cond, then_block, None)
    }

    fn if_else(
        self,
        cond: Expression,
        then_block: Vec<Statement>,
        else_block: Option<Vec<Statement>>,
    ) -> Statement {
        self.stmt(StatementKind::If(IfStmt {
            cond,
            then_block,
            else_block,
        }))
    }

    fn with(self, context: Expression, binding: Option<&str>, body: Vec<Statement>) -> Statement {
        self.stmt(StatementKind::With(WithStmt {
            context,
            binding: binding.map(Ident::synthetic),
            body,
        }))
    }
}

/// Rewrites a function body so every capturable construct decides at run
/// time whether to execute natively or record an IR node.
pub struct BuildTransformer<'a> {
    config: &'a BuildConfig,
    namer: Namer,
    lib: String,
}

impl<'a> BuildTransformer<'a> {
    pub fn new(config: &'a BuildConfig, mut namer: Namer) -> Self {
        let lib = namer.new_name(MODULE_NAME);
        Self { config, namer, lib }
    }

    /// Wraps the target function:
    ///
    /// ```text
    /// fn outer_fn() {
    ///     free = none;
    ///     fn inner_fn(params) {
    ///         import captive;
    ///         with captive.capture_root() as return_block { body }
    ///         return return_block;
    ///     }
    ///     return inner_fn;
    /// }
    /// ```
    pub fn wrap(
        mut self,
        def: &FunctionDef,
        decorators: Vec<Expression>,
        free_variables: &[String],
    ) -> Result<Wrapped, RewriteError> {
        let s = Synth {
            line: def.original_line(),
        };
        let outer = self.namer.new_name("outer_fn");
        let inner = self.namer.new_name("inner_fn");
        let return_block = self.namer.new_name("return_block");

        let body = self.visit_block(&def.body)?;
        let inner_body = vec![
            s.stmt(StatementKind::Import(ImportStmt {
                module: Ident::synthetic(MODULE_NAME),
                items: Vec::new(),
                alias: Some(Ident::synthetic(self.lib.as_str())),
            })),
            s.with(self.lib("capture_root", vec![]), Some(&return_block), body),
            s.stmt(StatementKind::Return(Some(Expression::name(&return_block)))),
        ];
        let inner_def = FunctionDef {
            doc_string: def.doc_string.clone(),
            decorators,
            name: Ident::synthetic(inner.as_str()),
            params: def.params.clone(),
            body: inner_body,
            span: Span::default(),
            line: s.line,
            origin: Some(s.line),
        };

        let mut outer_body: Vec<Statement> = free_variables
            .iter()
            .map(|name| s.assign(name, Expression::none()))
            .collect();
        outer_body.push(s.stmt(StatementKind::FnDef(Arc::new(inner_def))));
        outer_body.push(s.stmt(StatementKind::Return(Some(Expression::name(&inner)))));
        let outer_def = FunctionDef {
            doc_string: None,
            decorators: Vec::new(),
            name: Ident::synthetic(outer.as_str()),
            params: Vec::new(),
            body: outer_body,
            span: Span::default(),
            line: s.line,
            origin: Some(s.line),
        };

        Ok(Wrapped {
            statements: vec![s.stmt(StatementKind::FnDef(Arc::new(outer_def)))],
            outer,
        })
    }

    fn lib(&self, function: &str, args: Vec<Expression>) -> Expression {
        Expression::call(Expression::attr(Expression::name(&self.lib), function), args)
    }

    fn visit_block(&mut self, statements: &[Statement]) -> Result<Vec<Statement>, RewriteError> {
        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            out.extend(self.visit_stmt(statement)?);
        }
        Ok(out)
    }

    fn visit_else(
        &mut self,
        block: &Option<Vec<Statement>>,
    ) -> Result<Option<Vec<Statement>>, RewriteError> {
        block.as_deref().map(|b| self.visit_block(b)).transpose()
    }

    /// Rewrites the children of a statement, then the statement itself.
    fn visit_stmt(&mut self, statement: &Statement) -> Result<Vec<Statement>, RewriteError> {
        let s = Synth::of(statement);
        let keep = |kind: StatementKind| {
            let mut kept = statement.clone();
            kept.kind = kind;
            kept.origin = Some(s.line);
            vec![kept]
        };

        match &statement.kind {
            StatementKind::If(if_stmt) => {
                let then_block = self.visit_block(&if_stmt.then_block)?;
                let else_block = self.visit_else(&if_stmt.else_block)?;
                if !self.config.support_if {
                    return Ok(keep(StatementKind::If(IfStmt {
                        cond: if_stmt.cond.clone(),
                        then_block,
                        else_block,
                    })));
                }
                Ok(self.rewrite_if(s, &if_stmt.cond, then_block, else_block))
            }
            StatementKind::For(for_stmt) => {
                let body = self.visit_block(&for_stmt.body)?;
                let else_block = self.visit_else(&for_stmt.else_block)?;
                if !self.config.support_for {
                    return Ok(keep(StatementKind::For(ForStmt {
                        target: for_stmt.target.clone(),
                        iter: for_stmt.iter.clone(),
                        body,
                        else_block,
                    })));
                }
                Ok(self.rewrite_for(s, for_stmt, body, else_block))
            }
            StatementKind::While(while_stmt) => {
                let body = self.visit_block(&while_stmt.body)?;
                let else_block = self.visit_else(&while_stmt.else_block)?;
                if !self.config.support_while {
                    return Ok(keep(StatementKind::While(WhileStmt {
                        cond: while_stmt.cond.clone(),
                        body,
                        else_block,
                    })));
                }
                Ok(self.rewrite_while(s, &while_stmt.cond, body, else_block))
            }
            StatementKind::With(with) => {
                let body = self.visit_block(&with.body)?;
                Ok(keep(StatementKind::With(WithStmt {
                    context: with.context.clone(),
                    binding: with.binding.clone(),
                    body,
                })))
            }
            StatementKind::FnDef(def) => {
                let mut nested = (**def).clone();
                nested.body = self.visit_block(&def.body)?;
                nested.origin = Some(def.original_line());
                Ok(keep(StatementKind::FnDef(Arc::new(nested))))
            }
            StatementKind::Assign(assign) if self.config.support_assign => {
                self.rewrite_assign(s, assign)
            }
            StatementKind::Delete(delete) if self.config.support_delete => {
                Ok(self.rewrite_delete(s, delete))
            }
            other => Ok(keep(other.clone())),
        }
    }

    fn rewrite_if(
        &mut self,
        s: Synth,
        test: &Expression,
        then_block: Vec<Statement>,
        else_block: Option<Vec<Statement>>,
    ) -> Vec<Statement> {
        let cond = self.namer.new_name("cond");
        let is_readable = self.namer.new_name("is_readable");
        let cond_statement = self.namer.new_name("cond_statement");
        trace!(line = s.line, "rewriting if");

        let mut out = vec![
            s.assign(&cond, test.clone()),
            s.assign(&is_readable, self.lib("is_readable", vec![Expression::name(&cond)])),
            s.assign(&cond_statement, Expression::none()),
            s.if_(
                Expression::name(&is_readable),
                vec![s.assign(&cond_statement, self.lib("If", vec![Expression::name(&cond)]))],
            ),
            s.if_(
                Expression::or(Expression::name(&is_readable), Expression::name(&cond)),
                vec![s.with(
                    self.lib("if_block", vec![Expression::name(&cond_statement)]),
                    None,
                    then_block,
                )],
            ),
        ];
        if let Some(else_block) = else_block.filter(|b| !b.is_empty()) {
            out.push(s.if_(
                Expression::or(
                    Expression::name(&is_readable),
                    Expression::not(Expression::name(&cond)),
                ),
                vec![s.with(
                    self.lib("else_block", vec![Expression::name(&cond_statement)]),
                    None,
                    else_block,
                )],
            ));
        }
        out
    }

    fn rewrite_for(
        &mut self,
        s: Synth,
        for_stmt: &ForStmt,
        body: Vec<Statement>,
        else_block: Option<Vec<Statement>>,
    ) -> Vec<Statement> {
        let iter = self.namer.new_name("iter");
        let is_iterable = self.namer.new_name("is_iterable");
        let for_statement = self.namer.new_name("for_statement");
        trace!(line = s.line, "rewriting for");

        let else_block = else_block.filter(|b| !b.is_empty());
        let native_else = else_block.clone().map(|else_block| {
            vec![s.if_(Expression::not(Expression::name(&is_iterable)), else_block)]
        });
        let mut out = vec![
            s.assign(&iter, for_stmt.iter.clone()),
            s.assign(&is_iterable, self.lib("is_iterable", vec![Expression::name(&iter)])),
            s.assign(&for_statement, Expression::none()),
            s.if_(
                Expression::name(&is_iterable),
                vec![
                    s.assign(&for_statement, self.lib("For", vec![Expression::name(&iter)])),
                    s.assign(
                        &iter,
                        self.lib("symbolic_iteration", vec![Expression::name(&iter)]),
                    ),
                ],
            ),
            s.stmt(StatementKind::For(ForStmt {
                target: for_stmt.target.clone(),
                iter: Expression::name(&iter),
                body: vec![s.with(
                    self.lib("loop_block", vec![Expression::name(&for_statement)]),
                    None,
                    body,
                )],
                else_block: native_else,
            })),
        ];
        if let Some(else_block) = else_block {
            out.push(s.if_(
                Expression::name(&is_iterable),
                vec![s.with(
                    self.lib("else_block", vec![Expression::name(&for_statement)]),
                    None,
                    else_block,
                )],
            ));
        }
        out
    }

    // A symbolic while runs its body once. The done flag is set before the
    // body so `continue` can't loop forever. The first pass tests the value
    // already held in `cond`, later passes evaluate the condition again.
    fn rewrite_while(
        &mut self,
        s: Synth,
        test: &Expression,
        body: Vec<Statement>,
        else_block: Option<Vec<Statement>>,
    ) -> Vec<Statement> {
        let cond = self.namer.new_name("cond");
        let is_readable = self.namer.new_name("is_readable");
        let while_statement = self.namer.new_name("while_statement");
        let while_done = self.namer.new_name("while_done");
        let while_first = self.namer.new_name("while_first");
        trace!(line = s.line, "rewriting while");

        let else_block = else_block.filter(|b| !b.is_empty());
        let native_else = else_block.clone().map(|else_block| {
            vec![s.if_(Expression::not(Expression::name(&is_readable)), else_block)]
        });
        let mut out = vec![
            s.assign(&cond, test.clone()),
            s.assign(&is_readable, self.lib("is_readable", vec![Expression::name(&cond)])),
            s.assign(&while_statement, Expression::none()),
            s.if_(
                Expression::name(&is_readable),
                vec![s.assign(&while_statement, self.lib("While", vec![Expression::name(&cond)]))],
            ),
            s.assign(&while_done, Expression::bool(false)),
            s.assign(&while_first, Expression::bool(true)),
            s.stmt(StatementKind::While(WhileStmt {
                cond: Expression::and(
                    Expression::not(Expression::name(&while_done)),
                    Expression::or(
                        Expression::or(
                            Expression::name(&is_readable),
                            Expression::and(
                                Expression::name(&while_first),
                                Expression::name(&cond),
                            ),
                        ),
                        Expression::and(
                            Expression::not(Expression::name(&while_first)),
                            test.clone(),
                        ),
                    ),
                ),
                body: vec![
                    s.assign(&while_first, Expression::bool(false)),
                    s.assign(&while_done, Expression::name(&is_readable)),
                    s.with(
                        self.lib("loop_block", vec![Expression::name(&while_statement)]),
                        None,
                        body,
                    ),
                ],
                else_block: native_else,
            })),
        ];
        if let Some(else_block) = else_block {
            out.push(s.if_(
                Expression::name(&is_readable),
                vec![s.with(
                    self.lib("else_block", vec![Expression::name(&while_statement)]),
                    None,
                    else_block,
                )],
            ));
        }
        out
    }

    fn rewrite_assign(
        &mut self,
        s: Synth,
        assign: &AssignStmt,
    ) -> Result<Vec<Statement>, RewriteError> {
        let names = target_names(&assign.target)?;
        let temp_value = self.namer.new_name("temp_value");
        let readable_targets = self.namer.new_name("readable_targets");

        Ok(vec![
            s.assign(&temp_value, assign.value.clone()),
            s.assign(
                &readable_targets,
                self.lib("readable_targets", vec![Expression::name(&temp_value)]),
            ),
            s.if_else(
                Expression::name(&readable_targets),
                vec![
                    s.expr(self.lib(
                        "Assign",
                        vec![
                            Expression::tuple(names.iter().map(|n| Expression::str(n)).collect()),
                            Expression::name(&temp_value),
                        ],
                    )),
                    s.assign_to(
                        assign.target.clone(),
                        self.lib("unwrap_single", vec![Expression::name(&readable_targets)]),
                    ),
                ],
                Some(vec![
                    s.assign_to(assign.target.clone(), Expression::name(&temp_value)),
                ]),
            ),
        ])
    }

    fn rewrite_delete(&mut self, s: Synth, delete: &DeleteStmt) -> Vec<Statement> {
        let temp_value = self.namer.new_name("temp_value");
        let deletable_names = self.namer.new_name("deletable_names");

        let mut out = vec![s.assign(
            &temp_value,
            Expression::tuple(
                delete
                    .targets
                    .iter()
                    .map(|t| Expression::Name(t.clone()))
                    .collect(),
            ),
        )];
        for (i, target) in delete.targets.iter().enumerate() {
            let value = Expression::index(Expression::name(&temp_value), Expression::int(i as i64));
            out.push(s.if_(
                Expression::not(self.lib("is_deletable", vec![value])),
                vec![s.stmt(StatementKind::Delete(DeleteStmt {
                    targets: vec![target.clone()],
                }))],
            ));
        }
        out.push(s.assign(
            &deletable_names,
            self.lib(
                "deletable_names",
                vec![
                    Expression::name(&temp_value),
                    Expression::tuple(
                        delete
                            .targets
                            .iter()
                            .map(|t| Expression::str(&t.name))
                            .collect(),
                    ),
                ],
            ),
        ));
        out.push(s.if_(
            Expression::name(&deletable_names),
            vec![s.expr(self.lib("Delete", vec![Expression::name(&deletable_names)]))],
        ));
        out
    }
}

/// Names of a flat assignment target.
fn target_names(target: &Target) -> Result<Vec<String>, RewriteError> {
    match target {
        Target::Name(name) => Ok(vec![name.name.clone()]),
        Target::Tuple(items, _) => items
            .iter()
            .map(|item| match item {
                Target::Name(name) => Ok(name.name.clone()),
                Target::Tuple(..) => Err(RewriteError::UnsupportedTarget {
                    target: emit::expression(&item.to_expression()),
                }),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Arc};

    use super::BuildTransformer;
    use crate::{
        ast::{
            functions::FunctionDef,
            statements::{Statement, StatementKind},
        },
        parser::{ProgramSource, parse_ast},
        rewrite::{BuildConfig, RewriteError, emit, namer::Namer},
    };

    fn def_of(source: &str) -> Arc<FunctionDef> {
        let program = ProgramSource::new(source.to_string(), Path::new("test.cap"));
        let ast = parse_ast(&program).unwrap();
        let StatementKind::FnDef(def) = &ast.statements[0].kind else {
            panic!("expected a function definition");
        };
        def.clone()
    }

    fn rewrite(source: &str, config: &BuildConfig) -> Result<String, RewriteError> {
        let def = def_of(source);
        let wrapped = BuildTransformer::new(config, Namer::default()).wrap(&def, vec![], &[])?;
        let mut statements = wrapped.statements;
        Ok(emit::emit(&mut statements).0)
    }

    fn fn_defs(statements: &[Statement]) -> usize {
        statements
            .iter()
            .filter(|s| matches!(s.kind, StatementKind::FnDef(_)))
            .count()
    }

    #[test]
    fn wraps_target_function() {
        let def = def_of("/// Docs.\nfn f(a, b) {\n  return a;\n}");
        let wrapped = BuildTransformer::new(&BuildConfig::default(), Namer::new(["outer_fn"]))
            .wrap(&def, vec![], &["x".to_string()])
            .unwrap();
        assert_eq!(wrapped.outer, "outer_fn_0");
        assert_eq!(fn_defs(&wrapped.statements), 1);
        let StatementKind::FnDef(outer) = &wrapped.statements[0].kind else {
            panic!("expected the outer function");
        };
        assert!(outer.params.is_empty());
        assert_eq!(outer.body.len(), 3);
        let StatementKind::FnDef(inner) = &outer.body[1].kind else {
            panic!("expected the inner function");
        };
        assert_eq!(inner.params.len(), 2);
        assert!(inner.doc_string.is_some());
        assert_eq!(wrapped.statements[0].origin, Some(def.line));
    }

    #[test]
    fn rewrites_every_construct() {
        let source = "fn f(q) {\n  if q { a = 1; } else { a = 2; }\n  for i in q { del a; }\n  while q { pass; }\n}";
        let text = rewrite(source, &BuildConfig::default()).unwrap();
        for needle in [
            "captive.If(",
            "captive.if_block(",
            "captive.else_block(",
            "captive.For(",
            "captive.symbolic_iteration(",
            "captive.While(",
            "captive.loop_block(",
            "captive.readable_targets(",
            "captive.Assign(",
            "captive.deletable_names(",
            "captive.Delete(",
            "captive.capture_root()",
        ] {
            assert!(text.contains(needle), "missing {needle} in\n{text}");
        }
    }

    #[test]
    fn disabled_constructs_are_kept() {
        let config = BuildConfig::default()
            .without("if")
            .and_then(|c| c.without("assign"))
            .unwrap();
        let text = rewrite("fn f(q) {\n  if q { a = 1; }\n}", &config).unwrap();
        assert!(!text.contains("captive.If("));
        assert!(!text.contains("captive.Assign("));
        assert!(text.contains("if q {"));
        assert!(text.contains("a = 1;"));
    }

    #[test]
    fn nested_tuple_target_is_unsupported() {
        let err = rewrite("fn f() {\n  (a, (b, c)) = x;\n}", &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, RewriteError::UnsupportedTarget { .. }));
    }

    #[test]
    fn temporaries_avoid_user_names() {
        let def = def_of("fn f(cond) {\n  if cond { pass; }\n}");
        let namer = Namer::new(["cond", "f"]);
        let wrapped = BuildTransformer::new(&BuildConfig::default(), namer)
            .wrap(&def, vec![], &[])
            .unwrap();
        let mut statements = wrapped.statements;
        let (text, _) = emit::emit(&mut statements);
        assert!(text.contains("cond_0 = cond;"), "{text}");
    }
}
