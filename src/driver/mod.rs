use std::{
    io::Write,
    path::PathBuf,
    time::Instant,
};

use anyhow::{Context, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::{
    check,
    lowering::{Lowering, OpListing},
    parser::{ProgramSource, parse_ast},
    runtime::{Interpreter, Unit, Value},
};
use config::{Config, OutputMode};

pub mod config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// The script to run.
    pub input: PathBuf,

    /// The function to call once the script is loaded.
    #[arg(short, long, default_value = "main")]
    pub entry: String,

    /// Project config file. Defaults to a Captive.toml next to the script.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the source generated for each built function.
    #[arg(long, default_value_t = false)]
    pub emit_generated: bool,

    /// Print the lowered listing instead of the captured program.
    #[arg(short, long, default_value_t = false)]
    pub lower: bool,

    /// Leave a construct uncaptured: if, for, while, assign or delete.
    #[arg(long, value_name = "CONSTRUCT")]
    pub without: Vec<String>,
}

pub fn main() -> anyhow::Result<()> {
    let start_time = Instant::now();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let mut stdout = std::io::stdout();
    run(&args, &mut stdout)?;

    tracing::debug!("Done in {:?}", start_time.elapsed());
    Ok(())
}

fn load_config(args: &CliArgs) -> anyhow::Result<Config> {
    let path = args.config.clone().or_else(|| Config::discover(&args.input));
    let mut config = match &path {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };
    for construct in &args.without {
        config.capture = config.capture.without(construct)?;
    }
    if args.lower {
        config.output.mode = OutputMode::Lowered;
    }
    tracing::debug!("Running with config: {:#?}", config);
    Ok(config)
}

/// Loads the script, calls its entry function and prints what it captured.
pub fn run(args: &CliArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let source = ProgramSource::from_file(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    tracing::debug!("source code:\n{}", source.input);

    let ast = match parse_ast(&source) {
        Ok(ast) => ast,
        Err(diagnostics) => {
            diagnostics.render(&source);
            bail!("failed to parse {}", args.input.display());
        }
    };

    let mut interpreter = Interpreter::new()
        .with_config(config.capture.clone())
        .keep_generated(args.emit_generated);
    let unit = Unit::original(&args.input.display().to_string(), &source.input);

    let result = interpreter
        .exec_module(&ast, unit)
        .and_then(|globals| match globals.get(&args.entry) {
            Some(entry) => interpreter.call(&entry, vec![]).map(Some),
            None => Ok(None),
        });

    if args.emit_generated {
        for (filename, generated) in interpreter.generated_sources() {
            writeln!(out, "{}", format!("// {filename}").dimmed())?;
            writeln!(out, "{generated}")?;
        }
    }

    let value = match result {
        Ok(Some(value)) => value,
        Ok(None) => bail!("no function named {:?} in {}", args.entry, args.input.display()),
        Err(fault) => {
            check::render_fault(&fault, &source);
            bail!("{} failed: {fault}", args.entry);
        }
    };

    print_result(&config, &value, out)
}

fn print_result(config: &Config, value: &Value, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(block) = value.as_block() else {
        if !matches!(value, Value::None) {
            writeln!(out, "{value}")?;
        }
        return Ok(());
    };
    match config.output.mode {
        OutputMode::Program => writeln!(out, "{block}")?,
        OutputMode::Lowered => {
            let ops = (!config.output.ops.is_empty())
                .then(|| config.output.ops.iter().cloned().collect());
            for op in OpListing::new(ops).lower(block)? {
                writeln!(out, "{op}")?;
            }
        }
    }
    Ok(())
}
