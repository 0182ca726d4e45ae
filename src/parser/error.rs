use std::fmt;

use super::{
    ProgramSource,
    lexer::LexicalError,
    tokens::{self, Token},
};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use itertools::Itertools;
use lalrpop_util::ParseError;

pub type Error = ParseError<usize, Token, LexicalError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics(pub Error);

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.0)
    }
}

impl std::error::Error for Diagnostics {}

type SourceSpan = (String, std::ops::Range<usize>);

impl Diagnostics {
    pub fn report(&self, source: &ProgramSource) -> Report<'static, SourceSpan> {
        let path = source.path.display().to_string();
        let error = &self.0;

        let mut colors = ColorGenerator::new();
        match error {
            ParseError::InvalidToken { location } => {
                let loc = *location;
                Report::build(ReportKind::Error, (path.clone(), loc..loc))
                    .with_code("P1")
                    .with_message("Parse error.")
                    .with_label(
                        Label::new((path.clone(), loc..(loc + 1)))
                            .with_color(colors.next())
                            .with_message("invalid token"),
                    )
                    .finish()
            }
            ParseError::UnrecognizedEof { location, expected } => {
                let loc = *location;
                Report::build(ReportKind::Error, (path.clone(), loc..loc))
                    .with_code("P2")
                    .with_message("Parse error.")
                    .with_label(
                        Label::new((path.clone(), loc..loc))
                            .with_message("unrecognized eof")
                            .with_color(colors.next()),
                    )
                    .with_note(format!(
                        "expected one of the following: {}",
                        expected.iter().join(", ")
                    ))
                    .finish()
            }
            ParseError::UnrecognizedToken { token, expected } => {
                Report::build(ReportKind::Error, (path.clone(), token.0..token.2))
                    .with_code("P3")
                    .with_message("Parse error.")
                    .with_label(
                        Label::new((path.clone(), token.0..token.2))
                            .with_message(format!("unrecognized token '{}'", token.1))
                            .with_color(colors.next()),
                    )
                    .with_note(format!(
                        "expected one of the following: {}",
                        expected.iter().join(", ")
                    ))
                    .finish()
            }
            ParseError::ExtraToken { token } => {
                Report::build(ReportKind::Error, (path.clone(), token.0..token.2))
                    .with_code("P4")
                    .with_message("Parse error.")
                    .with_label(
                        Label::new((path.clone(), token.0..token.2))
                            .with_message(format!("unexpected extra token '{}'", token.1)),
                    )
                    .finish()
            }
            ParseError::User { error } => match error {
                LexicalError::InvalidToken(err, range) => {
                    let message = match err {
                        tokens::LexingError::NumberParseError => "error parsing literal number",
                        tokens::LexingError::InvalidEscape => "invalid escape in string literal",
                        tokens::LexingError::Other => "unrecognized input",
                    };
                    Report::build(ReportKind::Error, (path.clone(), range.clone()))
                        .with_code("P5")
                        .with_message("Lexical error.")
                        .with_label(
                            Label::new((path.clone(), range.clone()))
                                .with_message(message)
                                .with_color(colors.next()),
                        )
                        .finish()
                }
                LexicalError::InvalidTarget(range) => {
                    Report::build(ReportKind::Error, (path.clone(), range.clone()))
                        .with_code("P6")
                        .with_message("Invalid assignment target.")
                        .with_label(
                            Label::new((path.clone(), range.clone()))
                                .with_message("only names and tuples of names can be assigned to")
                                .with_color(colors.next()),
                        )
                        .finish()
                }
            },
        }
    }

    pub fn render(&self, source: &ProgramSource) {
        let path = source.path.display().to_string();
        if let Err(e) = self
            .report(source)
            .eprint((path, Source::from(source.input.clone())))
        {
            tracing::error!("failed to print diagnostics: {e}");
        }
    }
}
