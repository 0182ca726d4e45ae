use super::{
    common::{DocString, Ident, Span},
    expressions::Expression,
    statements::Statement,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionDef {
    pub doc_string: Option<DocString>,
    /// Decorator expressions, outermost first.
    pub decorators: Vec<Expression>,
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Vec<Statement>,
    pub span: Span,
    pub line: usize,
    pub origin: Option<usize>,
}

impl FunctionDef {
    pub fn original_line(&self) -> usize {
        self.origin.unwrap_or(self.line)
    }
}
