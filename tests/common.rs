#![allow(dead_code)]

use std::{
    cell::RefCell,
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};

use captive::{
    driver::{CliArgs, run},
    parser::{ProgramSource, parse_ast},
    rewrite::BuildConfig,
    runtime::{Fault, Interpreter, Unit, Value},
};

/// Collects what a script prints.
#[derive(Clone, Default)]
pub struct Output(Rc<RefCell<Vec<u8>>>);

impl Output {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output is utf-8")
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct Outcome {
    pub result: Result<Value, Fault>,
    pub printed: String,
    pub generated: Vec<(String, String)>,
}

/// Runs `source` as if loaded from `path` and calls its `main`.
pub fn run_source(source: &str, path: &str) -> Outcome {
    run_source_with_config(source, path, BuildConfig::default())
}

pub fn run_source_with_config(source: &str, path: &str, config: BuildConfig) -> Outcome {
    let program = ProgramSource::new(source.to_string(), Path::new(path));
    let ast = match parse_ast(&program) {
        Ok(ast) => ast,
        Err(_) => panic!("error parsing {path}"),
    };

    let output = Output::default();
    let mut interpreter = Interpreter::new()
        .with_config(config)
        .with_output(output.clone())
        .keep_generated(true);
    let result = interpreter
        .exec_module(&ast, Unit::original(path, source))
        .and_then(|globals| {
            let main = globals.get("main").expect("script defines main");
            interpreter.call(&main, vec![])
        });

    Outcome {
        result,
        printed: output.text(),
        generated: interpreter.generated_sources().to_vec(),
    }
}

/// The rendering of the block `main` returns.
pub fn captured(source: &str, path: &str) -> String {
    match run_source(source, path).result {
        Ok(value) => value.to_string(),
        Err(fault) => panic!("{path} failed: {fault:?}"),
    }
}

pub fn cli_args(input: &str) -> CliArgs {
    CliArgs {
        input: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(input),
        entry: "main".to_string(),
        config: None,
        emit_generated: false,
        lower: false,
        without: Vec::new(),
    }
}

/// Runs a script file through the command line driver.
pub fn run_cli(args: &CliArgs) -> anyhow::Result<String> {
    let mut out = Vec::new();
    run(args, &mut out)?;
    Ok(String::from_utf8(out)?)
}
