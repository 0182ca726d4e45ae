use super::common::{Ident, Span};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expression {
    Value(ValueExpr, Span),
    Name(Ident),
    Tuple(Vec<Self>, Span),
    // `[a, b]`, evaluates to a tuple as well.
    List(Vec<Self>, Span),
    Attribute(Box<Self>, Ident, Span),
    Call(CallOp),
    Index(Box<Self>, Box<Self>, Span),
    UnaryOp(UnaryOp, Box<Self>, Span),
    BinaryOp(Box<Self>, BinaryOp, Box<Self>, Span),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValueExpr {
    ConstNone,
    ConstBool(bool),
    ConstInt(i64),
    ConstStr(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallOp {
    pub callee: Box<Expression>,
    pub args: Vec<Expression>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    ArithNeg,
    LogicalNot,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Arith(ArithOp),
    Logic(LogicOp),
    Compare(CmpOp),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        }
    }
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Arith(op) => op.symbol(),
            BinaryOp::Compare(op) => op.symbol(),
            BinaryOp::Logic(LogicOp::And) => "and",
            BinaryOp::Logic(LogicOp::Or) => "or",
        }
    }
}

/// Constructors for expressions that have no source text, used when
/// generating code.
impl Expression {
    pub fn name(name: &str) -> Self {
        Self::Name(Ident::synthetic(name))
    }

    pub fn none() -> Self {
        Self::Value(ValueExpr::ConstNone, Span::default())
    }

    pub fn bool(value: bool) -> Self {
        Self::Value(ValueExpr::ConstBool(value), Span::default())
    }

    pub fn int(value: i64) -> Self {
        Self::Value(ValueExpr::ConstInt(value), Span::default())
    }

    pub fn str(value: &str) -> Self {
        Self::Value(ValueExpr::ConstStr(value.to_string()), Span::default())
    }

    pub fn tuple(items: Vec<Self>) -> Self {
        Self::Tuple(items, Span::default())
    }

    pub fn attr(value: Self, name: &str) -> Self {
        Self::Attribute(Box::new(value), Ident::synthetic(name), Span::default())
    }

    pub fn call(callee: Self, args: Vec<Self>) -> Self {
        Self::Call(CallOp {
            callee: Box::new(callee),
            args,
            span: Span::default(),
        })
    }

    pub fn index(value: Self, index: Self) -> Self {
        Self::Index(Box::new(value), Box::new(index), Span::default())
    }

    pub fn not(value: Self) -> Self {
        Self::UnaryOp(UnaryOp::LogicalNot, Box::new(value), Span::default())
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::BinaryOp(
            Box::new(lhs),
            BinaryOp::Logic(LogicOp::Or),
            Box::new(rhs),
            Span::default(),
        )
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::BinaryOp(
            Box::new(lhs),
            BinaryOp::Logic(LogicOp::And),
            Box::new(rhs),
            Span::default(),
        )
    }

    pub fn span(&self) -> Span {
        match self {
            Expression::Value(_, span) => *span,
            Expression::Name(ident) => ident.span,
            Expression::Tuple(_, span) => *span,
            Expression::List(_, span) => *span,
            Expression::Attribute(_, _, span) => *span,
            Expression::Call(call) => call.span,
            Expression::Index(_, _, span) => *span,
            Expression::UnaryOp(_, _, span) => *span,
            Expression::BinaryOp(_, _, _, span) => *span,
        }
    }
}
