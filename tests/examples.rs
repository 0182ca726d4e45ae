use crate::common::{captured, cli_args, run_cli, run_source};
use test_case::test_case;

mod common;

#[test_case(include_str!("../demos/bell.cap"), "demos/bell.cap", "H R(q0)\nCX R(q0), R(q1)\nM R(q0), R(q1)\nm = M R(q0), R(q1)" ; "bell.cap")]
#[test_case(include_str!("../demos/conditional.cap"), "demos/conditional.cap", "if R(m):\n  X 0\nelse:\n  Z 0" ; "conditional.cap")]
#[test_case(include_str!("../demos/loops.cap"), "demos/loops.cap", "for R(i), R(j) in pairs:\n  H R(i), R(j)" ; "loops.cap")]
#[test_case(include_str!("../demos/repeat.cap"), "demos/repeat.cap", "while R(flag):\n  X 0\nelse:\n  Z 0" ; "repeat.cap")]
#[test_case(include_str!("../demos/assign.cap"), "demos/assign.cap", "a = R(q)\ndel a" ; "assign.cap")]
#[test_case(include_str!("../demos/nested.cap"), "demos/nested.cap", "X R(q)\n  H R(q)" ; "nested.cap")]
#[test_case(include_str!("../demos/uncaptured_if.cap"), "demos/uncaptured_if.cap", "X 0" ; "uncaptured_if.cap")]
fn example_tests(source: &str, path: &str, expected: &str) {
    assert_eq!(captured(source, path), expected);
}

#[test_case(include_str!("../demos/conditional.cap"), "demos/conditional.cap", "X 0\nZ 0\n" ; "native branches")]
#[test_case(include_str!("../demos/loops.cap"), "demos/loops.cap", "H 0, 1\nH 2, 3\n" ; "native loop")]
#[test_case(include_str!("../demos/repeat.cap"), "demos/repeat.cap", "X 0\nX 1\nX 2\n" ; "native while")]
fn native_values_run_natively(source: &str, path: &str, printed: &str) {
    let outcome = run_source(source, path);
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
    assert_eq!(outcome.printed, printed);
}

#[test]
fn every_call_generates_a_unit() {
    let outcome = run_source(include_str!("../demos/conditional.cap"), "demos/conditional.cap");
    assert_eq!(outcome.generated.len(), 3);
    for (filename, source) in &outcome.generated {
        assert!(filename.ends_with(".cap"), "{filename}");
        assert!(source.contains(".capture_root()"), "{source}");
    }
}

#[test_case("demos/bell.cap", "H R(q0)\nCX R(q0), R(q1)\nM R(q0), R(q1)\nm = M R(q0), R(q1)\n" ; "bell")]
#[test_case("demos/nested.cap", "X R(q)\n  H R(q)\n" ; "nested")]
fn cli_prints_program(input: &str, expected: &str) {
    assert_eq!(run_cli(&cli_args(input)).unwrap(), expected);
}

#[test]
fn cli_lowers_straight_line_code() {
    let mut args = cli_args("demos/nested.cap");
    args.lower = true;
    assert_eq!(run_cli(&args).unwrap(), "X R(q)\nH R(q)\n");
}

#[test]
fn cli_lowering_rejects_control_flow() {
    let mut args = cli_args("demos/conditional.cap");
    args.lower = true;
    let err = run_cli(&args).unwrap_err();
    assert!(err.to_string().contains("can't lower if statement"), "{err}");
}

#[test]
fn cli_without_switch() {
    let mut args = cli_args("demos/conditional.cap");
    args.without = vec!["if".to_string()];
    assert_eq!(run_cli(&args).unwrap(), "X 0\n");
}

#[test]
fn cli_emits_generated_source() {
    let mut args = cli_args("demos/assign.cap");
    args.emit_generated = true;
    let output = run_cli(&args).unwrap();
    assert!(output.contains(".readable_targets("), "{output}");
    assert!(output.contains(".deletable_names("), "{output}");
    assert!(output.ends_with("a = R(q)\ndel a\n"), "{output}");
}
