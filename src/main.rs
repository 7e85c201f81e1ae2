// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! nestscript - compile a JavaScript subset to register IR and run it
//!
//! This is the main entry point for the nestscript CLI/REPL.

mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nestscript_engine::compiler::parse_module;
use nestscript_engine::{Engine, HostContext, SymbolTable, VmConfig};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "nestscript",
    about = "Compiles a JavaScript subset to register IR and runs it on a small VM",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Abort after executing this many instructions
    #[arg(long, global = true, env = "NESTSCRIPT_MAX_STEPS")]
    max_steps: Option<u64>,

    /// Maximum nesting of function calls
    #[arg(long, global = true, default_value_t = VmConfig::default().max_call_depth)]
    max_call_depth: usize,

    /// Print the global symbol table after running
    #[arg(long, global = true)]
    symbols: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and execute a file
    Run {
        /// Source file
        file: PathBuf,

        /// Treat the file as IR text instead of JavaScript
        #[arg(long)]
        ir: bool,
    },
    /// Print the IR for a JavaScript file
    Compile {
        /// Source file
        file: PathBuf,
    },
    /// Compile and execute code from the command line
    Eval {
        /// JavaScript source
        code: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = VmConfig {
        max_call_depth: cli.max_call_depth,
        max_steps: cli.max_steps,
    };

    let result = match &cli.command {
        Some(Command::Run { file, ir }) => run_file(file, *ir, config, cli.symbols),
        Some(Command::Compile { file }) => compile_file(file),
        Some(Command::Eval { code }) => run_eval(code, config, cli.symbols),
        None => run_repl(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins unless `-v` was given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

fn run_file(path: &Path, ir: bool, config: VmConfig, symbols: bool) -> anyhow::Result<()> {
    let source = read_source(path)?;
    let mut engine = Engine::with_host(HostContext::with_builtins(), config);

    let table = if ir {
        let module = parse_module(&source)?;
        engine.execute(&module)?
    } else {
        engine.run(&source)?
    };

    if symbols {
        print_symbols(&table);
    }
    Ok(())
}

fn compile_file(path: &Path) -> anyhow::Result<()> {
    let source = read_source(path)?;
    let module = Engine::new().compile(&source)?;
    print!("{}", module);
    Ok(())
}

fn run_eval(code: &str, config: VmConfig, symbols: bool) -> anyhow::Result<()> {
    let mut engine = Engine::with_host(HostContext::with_builtins(), config);
    let table = engine.run(code)?;
    if symbols {
        print_symbols(&table);
    }
    Ok(())
}

fn run_repl(config: VmConfig) -> anyhow::Result<()> {
    let mut repl = repl::Repl::new(config).context("failed to initialize REPL")?;
    repl.run().context("REPL error")?;
    Ok(())
}

/// Prints one `name = value` line per global.
pub(crate) fn print_symbols(table: &SymbolTable) {
    for (name, value) in table {
        println!("{} = {}", name.white().bold(), repl::format_value(value));
    }
}
