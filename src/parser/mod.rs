use std::path::{Path, PathBuf};

use crate::ast::{CompilationUnit, common::LineIndex};
use error::Diagnostics;
use lexer::Lexer;
use tracing::debug;

pub mod error;
mod lexer;
pub mod tokens;

pub mod grammar {
    #![allow(dead_code, unused_imports, unused_variables)]

    pub use self::grammar::*;
    use lalrpop_util::lalrpop_mod;

    lalrpop_mod!(pub grammar);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub input: String,
    pub path: PathBuf,
}

impl ProgramSource {
    pub fn new(input: String, path: &Path) -> Self {
        Self {
            input,
            path: path.to_path_buf(),
        }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?, path))
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(&self.input)
    }
}

pub fn parse_ast(source: &ProgramSource) -> Result<CompilationUnit, Diagnostics> {
    let lexer = Lexer::new(&source.input);
    let parser = grammar::CompilationUnitParser::new();
    let lines = source.line_index();

    match parser.parse(&lines, lexer) {
        Ok(statements) => Ok(CompilationUnit {
            file_path: source.path.clone(),
            statements,
        }),
        Err(e) => {
            debug!("failed to parse {}: {}", source.path.display(), e);
            Err(Diagnostics(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ProgramSource, grammar, lexer::Lexer, parse_ast};
    use crate::ast::{
        common::LineIndex,
        expressions::Expression,
        statements::{StatementKind, Target},
    };

    fn parse(source: &str) -> Vec<crate::ast::statements::Statement> {
        let lines = LineIndex::new(source);
        let lexer = Lexer::new(source);
        let parser = grammar::CompilationUnitParser::new();
        parser.parse(&lines, lexer).unwrap()
    }

    #[test]
    fn parse_simple_program() {
        let source = r##"
import captive;

/// Builds a tiny circuit.
@captive.build
fn circuit(a, b) {
    h = captive.op("H");
    x = 1 + 2 * 3;
    if a {
        h(0);
    } else if b {
        h(1);
    } else {
        pass;
    }
    for q in range(3) {
        h(q);
    } else {
        h(9);
    }
    while x > 0 {
        x -= 1;
    }
    del x;
    print("hello world\nwith newlines and \" escapes ");
    return captive.current_block();
}
        "##;
        let statements = parse(source);
        assert_eq!(statements.len(), 2);
        let StatementKind::FnDef(def) = &statements[1].kind else {
            panic!("expected a function definition");
        };
        assert_eq!(def.name.name, "circuit");
        assert_eq!(def.params.len(), 2);
        assert_eq!(def.decorators.len(), 1);
        assert_eq!(def.doc_string.as_ref().unwrap().text(), "Builds a tiny circuit.");
        assert_eq!(def.body.len(), 8);
    }

    #[test]
    fn parse_lines() {
        let source = "x = 1;\n\ny = 2;\nif x {\n  z = 3;\n}\n";
        let statements = parse(source);
        assert_eq!(
            statements.iter().map(|s| s.line).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        let StatementKind::If(stmt) = &statements[2].kind else {
            panic!("expected if");
        };
        assert_eq!(stmt.then_block[0].line, 5);
    }

    #[test]
    fn parse_else_if_lines() {
        let source = "if a {\n} else if b {\n  c;\n}\n";
        let statements = parse(source);
        let StatementKind::If(stmt) = &statements[0].kind else {
            panic!("expected if");
        };
        let nested = &stmt.else_block.as_ref().unwrap()[0];
        assert_eq!(nested.line, 2);
    }

    #[test]
    fn parse_tuple_targets() {
        let statements = parse("a, b = 1, 2;\n(c, d) = b, a;");
        let StatementKind::Assign(assign) = &statements[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(&assign.target, Target::Tuple(items, _) if items.len() == 2));
        assert!(matches!(&assign.value, Expression::Tuple(items, _) if items.len() == 2));
    }

    #[test]
    fn parse_imports() {
        let statements =
            parse("import captive as cap;\nfrom captive import op, register as reg, build;");
        let names = |index: usize| {
            let StatementKind::Import(import) = &statements[index].kind else {
                panic!("expected import");
            };
            import
                .bound_names()
                .iter()
                .map(|name| name.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(0), vec!["cap"]);
        assert_eq!(names(1), vec!["op", "reg", "build"]);
    }

    #[test]
    fn parse_unary() {
        parse("x = 2 - -2;\ny = not a and b or c;");
    }

    #[test]
    fn parse_decorators() {
        let statements = parse(
            "@outer\n@captive.build_with_config(captive.without(\"if\"))\nfn f() {}\n",
        );
        let StatementKind::FnDef(def) = &statements[0].kind else {
            panic!("expected a function definition");
        };
        assert_eq!(def.decorators.len(), 2);
        assert!(matches!(&def.decorators[1], Expression::Call(_)));
    }

    #[test]
    fn parse_empty_fn() {
        parse("fn hello() {}");
    }

    #[test]
    fn parse_with() {
        parse("with captive.Program() as program {\n  h(0);\n}\nwith block {}\n");
    }

    #[test]
    fn invalid_assignment_target() {
        let source = ProgramSource::new("f() = 3;".to_string(), Path::new("bad.cap"));
        assert!(parse_ast(&source).is_err());
    }

    #[test]
    fn missing_semicolon() {
        let source = ProgramSource::new("x = 3\ny = 4;".to_string(), Path::new("bad.cap"));
        assert!(parse_ast(&source).is_err());
    }
}
