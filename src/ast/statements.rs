use std::sync::Arc;

use educe::Educe;

use super::{
    common::{Ident, Span},
    expressions::{ArithOp, Expression},
    functions::FunctionDef,
};

/// A statement together with where it sits in its unit.
///
/// `line` is the 1-based line in the unit the statement was parsed from or
/// emitted into. `origin` is the line in the user-written source this
/// statement descends from, set once a statement passes through the rewriter.
#[derive(Clone, Debug, Educe)]
#[educe(PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    #[educe(PartialEq(ignore))]
    pub span: Span,
    #[educe(PartialEq(ignore))]
    pub line: usize,
    #[educe(PartialEq(ignore))]
    pub origin: Option<usize>,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span, line: usize) -> Self {
        Self {
            kind,
            span,
            line,
            origin: None,
        }
    }

    /// The user-written line this statement stands for.
    pub fn original_line(&self) -> usize {
        self.origin.unwrap_or(self.line)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StatementKind {
    Expr(Expression),
    Assign(AssignStmt),
    AugAssign(AugAssignStmt),
    Delete(DeleteStmt),
    If(IfStmt),
    For(ForStmt),
    While(WhileStmt),
    With(WithStmt),
    Return(Option<Expression>),
    Raise(Expression),
    Break,
    Continue,
    Pass,
    FnDef(Arc<FunctionDef>),
    Import(ImportStmt),
}

/// Left hand side of an assignment or the variables of a for loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Name(Ident),
    Tuple(Vec<Target>, Span),
}

impl Target {
    /// Converts a parsed expression into an assignment target, returning the
    /// span of the offending expression when it can't be assigned to.
    pub fn try_from_expression(expr: Expression) -> Result<Self, Span> {
        match expr {
            Expression::Name(name) => Ok(Target::Name(name)),
            Expression::Tuple(items, span) | Expression::List(items, span) => Ok(Target::Tuple(
                items
                    .into_iter()
                    .map(Target::try_from_expression)
                    .collect::<Result<_, _>>()?,
                span,
            )),
            other => Err(other.span()),
        }
    }

    pub fn to_expression(&self) -> Expression {
        match self {
            Target::Name(name) => Expression::Name(name.clone()),
            Target::Tuple(items, span) => {
                Expression::Tuple(items.iter().map(Target::to_expression).collect(), *span)
            }
        }
    }

    /// All the names bound by this target, in order.
    pub fn names(&self) -> Vec<&Ident> {
        match self {
            Target::Name(name) => vec![name],
            Target::Tuple(items, _) => items.iter().flat_map(Target::names).collect(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssignStmt {
    pub target: Target,
    pub value: Expression,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AugAssignStmt {
    pub name: Ident,
    pub op: ArithOp,
    pub value: Expression,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteStmt {
    pub targets: Vec<Ident>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IfStmt {
    pub cond: Expression,
    pub then_block: Vec<Statement>,
    pub else_block: Option<Vec<Statement>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForStmt {
    pub target: Target,
    pub iter: Expression,
    pub body: Vec<Statement>,
    pub else_block: Option<Vec<Statement>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WhileStmt {
    pub cond: Expression,
    pub body: Vec<Statement>,
    pub else_block: Option<Vec<Statement>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithStmt {
    pub context: Expression,
    pub binding: Option<Ident>,
    pub body: Vec<Statement>,
}

/// `import module as alias;` or `from module import a, b as c;`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImportStmt {
    pub module: Ident,
    /// Empty for a plain module import.
    pub items: Vec<ImportItem>,
    pub alias: Option<Ident>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImportItem {
    pub name: Ident,
    pub alias: Option<Ident>,
}

impl ImportItem {
    pub fn bound_name(&self) -> &Ident {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

impl ImportStmt {
    /// The names this import binds in the importing scope.
    pub fn bound_names(&self) -> Vec<&Ident> {
        if self.items.is_empty() {
            vec![self.alias.as_ref().unwrap_or(&self.module)]
        } else {
            self.items.iter().map(ImportItem::bound_name).collect()
        }
    }
}
