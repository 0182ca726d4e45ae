use logos::Logos;
use std::convert::Infallible;

#[derive(Debug, PartialEq, Clone, Default)]
pub enum LexingError {
    NumberParseError,
    InvalidEscape,
    #[default]
    Other,
}

impl From<std::num::ParseIntError> for LexingError {
    fn from(_: std::num::ParseIntError) -> Self {
        LexingError::NumberParseError
    }
}

impl From<unescaper::Error> for LexingError {
    fn from(_: unescaper::Error) -> Self {
        LexingError::InvalidEscape
    }
}

impl From<Infallible> for LexingError {
    fn from(_: Infallible) -> Self {
        LexingError::Other
    }
}

#[derive(Logos, logos_display::Debug, logos_display::Display, PartialEq, Clone)]
#[logos(error = LexingError, skip r"[ \t\r\n\f]+", skip r"//[^/][^\n]*", skip r"/\*(?:[^*]|\*[^/])*\*/")]
pub enum Token {
    #[token("fn")]
    KeywordFn,
    #[token("return")]
    KeywordReturn,
    #[token("if")]
    KeywordIf,
    #[token("else")]
    KeywordElse,
    #[token("for")]
    KeywordFor,
    #[token("in")]
    KeywordIn,
    #[token("while")]
    KeywordWhile,
    #[token("break")]
    KeywordBreak,
    #[token("continue")]
    KeywordContinue,
    #[token("pass")]
    KeywordPass,
    #[token("del")]
    KeywordDel,
    #[token("raise")]
    KeywordRaise,
    #[token("with")]
    KeywordWith,
    #[token("as")]
    KeywordAs,
    #[token("import")]
    KeywordImport,
    #[token("from")]
    KeywordFrom,
    #[token("not")]
    KeywordNot,
    #[token("and")]
    KeywordAnd,
    #[token("or")]
    KeywordOr,
    #[token("true")]
    KeywordTrue,
    #[token("false")]
    KeywordFalse,
    #[token("none")]
    KeywordNone,

    // Modern way of allowing identifiers, read: https://unicode.org/reports/tr31/
    #[regex(r"[\p{XID_Start}_]\p{XID_Continue}*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Literals
    #[regex(r"\d+", |lex| lex.slice().parse::<i64>())]
    Integer(i64),
    #[regex(r#""(?:[^"\\]|\\.)*""#, |lex| {
        let slice = lex.slice();
        let len = slice.len();
        unescaper::unescape(&slice[1..(len-1)])
    })]
    String(String),

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBracket,
    #[token("}")]
    RightBracket,
    #[token("[")]
    LeftSquareBracket,
    #[token("]")]
    RightSquareBracket,
    #[token("=")]
    Assign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Coma,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("<")]
    LessThanSign,
    #[token(">")]
    MoreThanSign,
    #[token(">=")]
    MoreThanEqSign,
    #[token("<=")]
    LessThanEqSign,

    #[token("+")]
    OperatorAdd,
    #[token("-")]
    OperatorSub,
    #[token("*")]
    OperatorMul,
    #[token("/")]
    OperatorDiv,
    #[token("%")]
    OperatorRem,
    #[token("==")]
    OperatorEq,
    #[token("!=")]
    OperatorNe,

    #[regex("///[^\n]*", |lex| lex.slice()[3..].to_string())]
    DocString(String),
}
