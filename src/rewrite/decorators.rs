use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::RewriteError;
use crate::{
    ast::expressions::Expression,
    runtime::{Function, Scope, Value},
};

/// A decorator that triggers the capture rewrite and must be removed from
/// the rewritten function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecoratorSpec {
    /// The module the decorator is exposed from.
    pub module: String,
    /// The decorator itself, or the function producing it.
    pub method: String,
}

impl DecoratorSpec {
    pub fn new(module: &str, method: &str) -> Self {
        Self {
            module: module.to_string(),
            method: method.to_string(),
        }
    }
}

pub fn default_specs() -> Vec<DecoratorSpec> {
    vec![
        DecoratorSpec::new(crate::runtime::capture::MODULE_NAME, "build"),
        DecoratorSpec::new(crate::runtime::capture::MODULE_NAME, "build_with_config"),
    ]
}

/// Names under which the trigger decorators are reachable from a
/// function's globals.
#[derive(Debug, Default, Clone)]
pub struct Aliases {
    modules: HashSet<String>,
    methods: HashSet<String>,
}

impl Aliases {
    pub fn collect(specs: &[DecoratorSpec], globals: &Scope) -> Self {
        let mut aliases = Self::default();
        for spec in specs {
            aliases.modules.insert(spec.module.clone());
            aliases.methods.insert(spec.method.clone());
        }
        for (name, value) in globals.bindings() {
            match &value {
                Value::Module(module) if specs.iter().any(|s| s.module == module.name) => {
                    aliases.modules.insert(name);
                }
                Value::Function(Function::Native(native))
                    if specs.iter().any(|s| {
                        native.module.as_deref() == Some(s.module.as_str()) && s.method == native.name
                    }) =>
                {
                    aliases.methods.insert(name);
                }
                _ => {}
            }
        }
        aliases
    }

    /// Whether `decorator` is `@m`, `@a.m`, `@m(...)` or `@a.m(...)` for a
    /// known module alias `a` and method alias `m`.
    pub fn is_trigger(&self, decorator: &Expression) -> bool {
        let target = match decorator {
            Expression::Call(call) => &*call.callee,
            other => other,
        };
        match target {
            Expression::Name(name) => self.methods.contains(&name.name),
            Expression::Attribute(value, attr, _) => {
                self.methods.contains(&attr.name)
                    && matches!(&**value, Expression::Name(module) if self.modules.contains(&module.name))
            }
            _ => false,
        }
    }

    /// Drops the trigger decorator. A trigger decorator can't be combined
    /// with any other decorator.
    pub fn strip(
        &self,
        decorators: &[Expression],
        function: &str,
    ) -> Result<Vec<Expression>, RewriteError> {
        if !decorators.iter().any(|d| self.is_trigger(d)) {
            return Ok(decorators.to_vec());
        }
        if decorators.len() == 1 {
            return Ok(Vec::new());
        }
        Err(RewriteError::ChainedDecorator {
            function: function.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Aliases, DecoratorSpec, default_specs};
    use crate::{
        ast::{expressions::Expression, statements::StatementKind},
        parser::{ProgramSource, parse_ast},
        rewrite::RewriteError,
        runtime::{Interpreter, Scope, Unit},
    };

    fn decorators_of(source: &str) -> Vec<Expression> {
        let program = ProgramSource::new(source.to_string(), Path::new("test.cap"));
        let ast = parse_ast(&program).unwrap();
        let StatementKind::FnDef(def) = &ast.statements.last().unwrap().kind else {
            panic!("expected a function definition");
        };
        def.decorators.clone()
    }

    fn globals_of(source: &str) -> std::rc::Rc<Scope> {
        let program = ProgramSource::new(source.to_string(), Path::new("test.cap"));
        let ast = parse_ast(&program).unwrap();
        Interpreter::new()
            .exec_module(&ast, Unit::original("test.cap", source))
            .unwrap()
    }

    #[test]
    fn strips_all_decorator_forms() {
        let aliases = Aliases::collect(&default_specs(), &Scope::global());
        for source in [
            "@build\nfn f() {}",
            "@captive.build\nfn f() {}",
            "@build_with_config(c)\nfn f() {}",
            "@captive.build_with_config(c)\nfn f() {}",
        ] {
            let stripped = aliases.strip(&decorators_of(source), "f").unwrap();
            assert!(stripped.is_empty(), "{source}");
        }
    }

    #[test]
    fn keeps_unrelated_decorators() {
        let aliases = Aliases::collect(&default_specs(), &Scope::global());
        let decorators = decorators_of("@other\n@mod.thing(1)\nfn f() {}");
        assert_eq!(aliases.strip(&decorators, "f").unwrap(), decorators);
    }

    #[test]
    fn chained_trigger_decorator_fails() {
        let aliases = Aliases::collect(&default_specs(), &Scope::global());
        let decorators = decorators_of("@other\n@captive.build\nfn f() {}");
        let err = aliases.strip(&decorators, "f").unwrap_err();
        assert!(matches!(err, RewriteError::ChainedDecorator { .. }));
        assert!(err.to_string().contains("decorator"));
    }

    #[test]
    fn aliases_come_from_globals() {
        let globals = globals_of("import captive as cap;\nfrom captive import build as my_build;\n");
        let aliases = Aliases::collect(&default_specs(), &globals);
        assert!(aliases.is_trigger(&decorators_of("@cap.build\nfn f() {}")[0]));
        assert!(aliases.is_trigger(&decorators_of("@my_build\nfn f() {}")[0]));
        assert!(!aliases.is_trigger(&decorators_of("@cap.other\nfn f() {}")[0]));
    }

    #[test]
    fn additional_specs() {
        let mut specs = default_specs();
        specs.push(DecoratorSpec::new("tools", "my_decorator"));
        let aliases = Aliases::collect(&specs, &Scope::global());
        assert!(aliases.is_trigger(&decorators_of("@tools.my_decorator\nfn f() {}")[0]));
        assert!(aliases.is_trigger(&decorators_of("@my_decorator\nfn f() {}")[0]));
    }
}
