// main.rs - Interactive read-evaluate loop

use clap::Parser;
use mieliepit::interpreter::{interpret_line, load_prelude};
use mieliepit::state::{Config, ProgramState};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "mieliepit", version)]
/// A tiny stack language with an interactive read-evaluate loop.
///
/// Each capacity flag bounds one of the interpreter's stores; 0 (the
/// default) lets the store grow without bound.
struct CliArgs {
    /// Maximum number of cells on the data stack.
    #[arg(long, default_value_t = 0)]
    stack_size: usize,
    /// Maximum number of cells in the shared code buffer.
    #[arg(long, default_value_t = 0)]
    code_size: usize,
    /// Maximum number of user word definitions.
    #[arg(long, default_value_t = 0)]
    words_size: usize,
    /// Maximum total bytes of word names and descriptions.
    #[arg(long, default_value_t = 0)]
    names_size: usize,
    /// Source files to run, line by line, before the interactive loop.
    files: Vec<PathBuf>,
}

fn capacity(flag: usize) -> Option<usize> {
    if flag == 0 { None } else { Some(flag) }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = Config {
        stack_capacity: capacity(args.stack_size),
        code_capacity: capacity(args.code_size),
        words_capacity: capacity(args.words_size),
        names_capacity: capacity(args.names_size),
    };

    let mut state = ProgramState::with_config(config);
    if let Err(err) = load_prelude(&mut state) {
        eprintln!("Error: the prelude failed to load: {}", err);
        return Ok(());
    }

    for path in &args.files {
        if !run_file(&mut state, path) || state.exit_requested {
            return Ok(());
        }
    }

    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".mieliepit_history");
        p
    });
    if let Some(path) = &history_file {
        let _ = rl.load_history(path);
    }

    println!("mieliepit {}", env!("CARGO_PKG_VERSION"));
    println!("Type guide for an introduction, exit to leave.");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                // Errors are already rendered into the output buffer; the
                // loop keeps going either way.
                let _ = interpret_line(&mut state, &line);
                flush_output(&mut state);
                if state.exit_requested {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = rl.save_history(path);
    }

    Ok(())
}

/// Run one source file line by line, stopping at the first error.  Returns
/// false when the file could not be read or did not run to completion.
fn run_file(state: &mut ProgramState, path: &Path) -> bool {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Error: could not read {}: {}", path.display(), err);
            return false;
        }
    };
    debug!(path = %path.display(), "running source file");
    for line in text.lines() {
        let result = interpret_line(state, line);
        flush_output(state);
        if result.is_err() {
            return false;
        }
        if state.exit_requested {
            return true;
        }
    }
    true
}

fn flush_output(state: &mut ProgramState) {
    let output = state.take_output();
    if !output.is_empty() {
        print!("{}", output);
        let _ = io::stdout().flush();
    }
}
