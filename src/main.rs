// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! bastion - run scripts with a trust-enforcing `require`
//!
//! Scripts run synchronously on the main thread. Remote modules are fetched
//! with a blocking client, which must not run inside an async runtime.

mod repl;

use anyhow::Context as _;
use bastion_runtime::{Engine, EngineConfig, EngineError, VERSION};
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bastion",
    about = "Run JavaScript with builtin, local and remote trust tiers",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Script file to execute
    file: Option<PathBuf>,

    /// Evaluate script from command line
    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    eval: Option<String>,

    /// Directory local modules are resolved under
    #[arg(long, value_name = "DIR")]
    anchor: Option<PathBuf>,

    /// Lift the restriction on a builtin (repeatable)
    #[arg(long = "unrestrict", value_name = "NAME")]
    unrestrict: Vec<String>,

    /// Engine configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Timeout for remote module downloads, in seconds
    #[arg(long, value_name = "SECS")]
    fetch_timeout: Option<u64>,

    /// Start interactive REPL
    #[arg(short = 'i', long = "interactive", alias = "repl")]
    interactive: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "bastion=debug,bastion_runtime=debug"
    } else {
        "bastion=warn,bastion_runtime=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("reading configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(anchor) = &cli.anchor {
        config.anchor = anchor.clone();
    }
    if let Some(secs) = cli.fetch_timeout {
        config.fetch_timeout_secs = secs;
    }
    config.unrestricted.extend(cli.unrestrict.iter().cloned());
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli)?;
    let mut engine = Engine::with_config(config)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("starting engine")?;

    let nothing_to_run = cli.eval.is_none() && cli.file.is_none();
    if cli.interactive || (nothing_to_run && std::io::stdin().is_terminal()) {
        let mut repl = repl::Repl::new(engine)?;
        repl.run()?;
        return Ok(ExitCode::SUCCESS);
    }

    engine.connect_stdio(std::io::stdin(), std::io::stdout(), std::io::stderr());

    let result = if let Some(code) = &cli.eval {
        engine.eval(code).map(Some)
    } else if let Some(file) = &cli.file {
        engine.run_file(file).map(|_| None)
    } else {
        let mut code = String::new();
        std::io::stdin().read_to_string(&mut code)?;
        engine.eval(&code).map(|_| None)
    };

    match result {
        Ok(Some(value)) => {
            if !value.is_undefined() {
                println!("{}", value.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print an engine error the way scripts see it
pub(crate) fn report(error: &EngineError) {
    match error {
        EngineError::Script(_) => eprintln!("{}", error.to_string().red()),
        EngineError::Require(err) => eprintln!(
            "{} [{}]: {}",
            "RequireError".red().bold(),
            err.code().yellow(),
            err
        ),
        other => eprintln!("{}: {}", "Error".red().bold(), other),
    }
}
