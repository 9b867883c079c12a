// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use sloth::{Env, EnvOptions};
use sloth_script::{execute_statements, InterpreterOptions};
use tracing::Level;

mod repl;

/// Lazy evaluation interpreter
#[derive(Parser)]
struct Args {
    /// Optional script to execute (defaults to REPL)
    entry_point: Option<PathBuf>,
    /// Log evaluation steps to stderr
    #[clap(long)]
    log: bool,
    /// Add debug logging of each executed statement
    #[clap(long)]
    debug: bool,
    /// Print REPL results as JSON
    #[clap(long)]
    json: bool,
    /// Reverse the digits of integers written by print()
    #[clap(long)]
    reverse_print: bool,
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.log {
            Level::TRACE
        } else if args.debug {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();
    let options = InterpreterOptions { debug: args.debug };
    let env = Env::with_options(
        std::io::stdout(),
        EnvOptions {
            reverse_print: args.reverse_print,
        },
    );
    match args.entry_point {
        None => {
            let stdin = std::io::stdin();
            repl::run(
                stdin.lock(),
                std::io::stdout(),
                std::io::stderr(),
                &env,
                repl::ReplOptions {
                    interpreter: options,
                    json: args.json,
                },
            )?;
        }
        Some(input_path) => {
            let source = read_file(&input_path)?;
            execute_statements(&source, &env, options).map_err(|err| {
                anyhow!(
                    "Failed to execute script at {}: {}",
                    input_path.display(),
                    err
                )
            })?;
        }
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read path {}", path.display()))
}
