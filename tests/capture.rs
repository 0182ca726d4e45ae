use captive::{
    rewrite::{BuildConfig, decorators::DecoratorSpec},
    runtime::{FaultKind, Value},
};
use test_case::test_case;

use crate::common::{captured, run_source, run_source_with_config};

mod common;

const PRELUDE: &str = "import captive;\nX = captive.op(\"X\");\nH = captive.op(\"H\");\nCX = captive.op(\"CX\");\n";

fn script(body: &str) -> String {
    format!("{PRELUDE}{body}")
}

#[test_case("fn f(c) { if c { X(0); } }", "f(false)", "" ; "false condition captures nothing")]
#[test_case("fn f(c) { if c { X(0); } else { H(0); } }", "f(0)", "H 0" ; "native else branch")]
#[test_case("fn f(c) { if c { X(0); } }", "f(captive.register(\"c\"))", "if R(c):\n  X 0" ; "symbolic without else")]
#[test_case("fn f(c) { if c { X(0); } else { if c { H(0); } } }", "f(captive.register(\"c\"))", "if R(c):\n  X 0\nelse:\n  if R(c):\n    H 0" ; "nested symbolic if")]
#[test_case("fn f(n) { for i in range(n) { X(i); } }", "f(2)", "X 0\nX 1" ; "native for")]
#[test_case("fn f(it) { for i in it { X(i); } else { H(0); } }", "f(captive.iterable(\"range(4)\", captive.register(\"i\")))", "for R(i) in range(4):\n  X R(i)\nelse:\n  H 0" ; "symbolic for else")]
#[test_case("fn f(it) { for i in it { X(i); break; } else { H(0); } }", "f(captive.iterable(\"r\", captive.register(\"i\")))", "for R(i) in r:\n  X R(i)\nelse:\n  H 0" ; "symbolic for else after break")]
#[test_case("fn f(n) { for i in range(n) { X(i); } else { H(9); } }", "f(2)", "X 0\nX 1\nH 9" ; "native for else")]
#[test_case("fn f(n) { for i in range(n) { X(i); break; } else { H(9); } }", "f(3)", "X 0" ; "native for break skips else")]
#[test_case("fn f(n) { while n < 1 { X(n); n += 1; } else { H(0); } }", "f(0)", "X 0\nH 0" ; "native while else")]
#[test_case("fn f(n) { while n < 5 { X(n); break; } else { H(0); } }", "f(0)", "X 0" ; "native while break skips else")]
#[test_case("fn f(c) { while c { X(0); continue; } }", "f(captive.register(\"c\"))", "while R(c):\n  X 0" ; "symbolic while runs once")]
#[test_case("fn f(q, r) { a, b = CX(q, r); H(a); }", "f(captive.register(\"q\"), captive.register(\"r\"))", "CX R(q), R(r)\na, b = CX R(q), R(r)\nH R(q)" ; "tuple assign")]
#[test_case("fn f(q) { a = 1; b = a + 1; X(b); }", "f(captive.register(\"q\"))", "X 2" ; "native assign")]
#[test_case("fn f(q) { a = q; del a; X(a); }", "f(captive.register(\"q\"))", "a = R(q)\ndel a\nX R(q)" ; "symbolic delete keeps binding")]
fn captures(def: &str, call: &str, expected: &str) {
    let source = script(&format!("@captive.build\n{def}\nfn main() {{ return {call}; }}\n"));
    assert_eq!(captured(&source, "capture.cap"), expected);
}

#[test]
fn native_while_tests_condition_once_per_pass() {
    let source = script(
        "fn check(n) {\n    print(\"check\", n);\n    return n < 2;\n}\n@captive.build\nfn f() {\n    n = 0;\n    while check(n) {\n        X(n);\n        n += 1;\n    }\n}\nfn main() { return f(); }\n",
    );
    let outcome = run_source(&source, "while.cap");
    assert_eq!(outcome.result.unwrap().to_string(), "X 0\nX 1");
    assert_eq!(outcome.printed, "check 0\ncheck 1\ncheck 2\n");
}

#[test]
fn native_delete_unbinds() {
    let source = script(
        "@captive.build\nfn f() {\n    a = 1;\n    del a;\n    X(a);\n}\nfn main() { return f(); }\n",
    );
    let fault = run_source(&source, "delete.cap").result.unwrap_err();
    assert!(matches!(&fault.kind, FaultKind::UndefinedName(name) if name == "a"));
}

#[test]
fn built_function_keeps_name_and_doc() {
    let source = script(
        "/// Flips a register.\n@captive.build\nfn flip(q) { X(q); }\nfn main() { return (flip.name, flip.doc); }\n",
    );
    let value = run_source(&source, "doc.cap").result.unwrap();
    assert_eq!(
        value,
        Value::tuple(vec!["flip".into(), "Flips a register.".into()])
    );
}

#[test]
fn explicit_return_wins_over_block() {
    let source = script("@captive.build\nfn f(q) { X(q); return 7; }\nfn main() { return f(1); }\n");
    assert_eq!(run_source(&source, "ret.cap").result.unwrap(), Value::Int(7));
}

#[test]
fn free_variables_resolve_in_enclosing_function() {
    let source = script(
        "fn make(q) {\n    @captive.build\n    fn inner() { X(q); }\n    return inner;\n}\nfn main() {\n    f = make(captive.register(\"q\"));\n    return f();\n}\n",
    );
    assert_eq!(captured(&source, "free.cap"), "X R(q)");
}

#[test]
fn aliases_are_recognized() {
    let source = script(
        "import captive as cap;\nfrom captive import build as b;\n@b\nfn f(c) { if c { X(0); } }\n@cap.build\nfn g(c) { if c { H(0); } }\nfn main() { c = captive.register(\"c\"); return (f(c), g(c)); }\n",
    );
    let Value::Tuple(blocks) = run_source(&source, "alias.cap").result.unwrap() else {
        panic!("expected a tuple");
    };
    assert_eq!(blocks[0].to_string(), "if R(c):\n  X 0");
    assert_eq!(blocks[1].to_string(), "if R(c):\n  H 0");
}

#[test]
fn additional_decorator_is_stripped() {
    let source = script(
        "fn wrap(f) { return captive.build(f); }\n@wrap\nfn f(c) { if c { X(0); } }\nfn main() { return f(captive.register(\"c\")); }\n",
    );
    let config = BuildConfig::default().with_decorator(DecoratorSpec::new("tools", "wrap"));
    let outcome = run_source_with_config(&source, "extra.cap", config);
    assert_eq!(outcome.result.unwrap().to_string(), "if R(c):\n  X 0");
    assert!(!outcome.generated[0].1.contains("@wrap"), "{}", outcome.generated[0].1);
}

#[test_case("if", "X 0\na = R(q)\ndel a\nX R(q)" ; "if")]
#[test_case("assign", "if R(q):\n  X 0\ndel a\nX R(q)" ; "assign")]
#[test_case("delete", "if R(q):\n  X 0\na = R(q)\nX R(q)" ; "delete")]
fn interpreter_config_disables_constructs(construct: &str, expected: &str) {
    let source = script(
        "@captive.build\nfn f(q) {\n    if q { X(0); }\n    a = q;\n    del a;\n    X(q);\n}\nfn main() { return f(captive.register(\"q\")); }\n",
    );
    let config = BuildConfig::default().without(construct).unwrap();
    let value = run_source_with_config(&source, "config.cap", config)
        .result
        .unwrap();
    assert_eq!(value.to_string(), expected);
}

#[test]
fn build_with_config_from_script() {
    let source = script(
        "config = captive.with_decorator(captive.without(\"while\"), \"tools\", \"wrap\");\n@captive.build_with_config(config)\nfn f(c) { while c { X(0); break; } }\nfn main() { return f(captive.register(\"c\")); }\n",
    );
    assert_eq!(captured(&source, "config.cap"), "X 0");
}

#[test]
fn nested_builds_nest_blocks() {
    let source = script(
        "@captive.build\nfn inner(q) { H(q); }\n@captive.build\nfn outer(q) {\n    X(q);\n    b = inner(q);\n    X(len(b));\n}\nfn main() { return outer(captive.register(\"q\")); }\n",
    );
    assert_eq!(captured(&source, "nested.cap"), "X R(q)\n  H R(q)\nX 1");
}

#[test]
fn user_names_are_not_shadowed() {
    let source = script(
        "@captive.build\nfn f(cond, captive_0) {\n    if cond { X(captive_0); }\n}\nfn main() { return f(true, 5); }\n",
    );
    let outcome = run_source(&source, "names.cap");
    assert_eq!(outcome.result.unwrap().to_string(), "X 5");
    assert!(outcome.generated[0].1.contains("cond_0 = cond;"));
}

#[test]
fn building_a_value_that_is_not_a_function_fails() {
    let source = script("fn main() { return captive.build(1); }\n");
    let fault = run_source(&source, "bad.cap").result.unwrap_err();
    assert!(matches!(fault.kind, FaultKind::Rewrite(_)), "{fault:?}");
}
