//! Fatigue interlock CLI.
//!
//! Every operation prints its structured result as JSON on stdout and exits
//! with a code from [`interlock::exit_codes`]. `serve` runs the JSON-RPC tool
//! server on stdio.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use interlock::exit_codes;
use interlock::gate::Gate;
use interlock::io::paths::{InitOptions, init_interlock};
use interlock::io::process::ShellRunner;
use interlock::logging;
use interlock::server::Server;

#[derive(Parser)]
#[command(
    name = "interlock",
    version,
    about = "Fatigue-aware safety interlock for AI coding agents"
)]
struct Cli {
    /// Project root containing `.interlock/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.interlock/config.toml` with defaults.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Print behavioral metrics, fatigue and thresholds.
    State,
    /// Report how a command would be treated without running it.
    Check {
        command: String,
    },
    /// Run a command under the interlock.
    Exec {
        command: String,
        /// Reason given by the human after typing the override phrase.
        #[arg(long)]
        override_reason: Option<String>,
    },
    /// Write a file under the interlock.
    Write {
        path: PathBuf,
        /// New file content.
        #[arg(long, conflicts_with = "from", required_unless_present = "from")]
        content: Option<String>,
        /// Read the new content from this file.
        #[arg(long)]
        from: Option<PathBuf>,
        /// Reason given by the human after typing the override phrase.
        #[arg(long)]
        override_reason: Option<String>,
    },
    /// Serve the interlock tools as JSON-RPC over stdio.
    Serve,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let gate = Gate::new(cli.root.clone(), ShellRunner);
    match cli.command {
        Command::Init { force } => {
            let paths = init_interlock(&cli.root, &InitOptions { force })?;
            println!("{}", paths.config_path.display());
            Ok(exit_codes::OK)
        }
        Command::State => {
            let ctx = gate.load_context()?;
            print_json(&gate.state(&ctx))?;
            Ok(exit_codes::OK)
        }
        Command::Check { command } => {
            let ctx = gate.load_context()?;
            let outcome = gate.check_command(&ctx, &command);
            print_json(&outcome)?;
            Ok(exit_codes::for_status(outcome.status))
        }
        Command::Exec {
            command,
            override_reason,
        } => {
            let ctx = gate.load_context()?;
            let outcome = gate.execute_command(&ctx, &command, override_reason.as_deref());
            print_json(&outcome)?;
            Ok(exit_codes::for_status(outcome.status))
        }
        Command::Write {
            path,
            content,
            from,
            override_reason,
        } => {
            let content = match (content, from) {
                (Some(content), _) => content,
                (None, Some(from)) => fs::read_to_string(&from)
                    .with_context(|| format!("read {}", from.display()))?,
                (None, None) => anyhow::bail!("either --content or --from is required"),
            };
            let ctx = gate.load_context()?;
            let outcome = gate.write_file(&ctx, &path, &content, override_reason.as_deref());
            print_json(&outcome)?;
            Ok(exit_codes::for_status(outcome.status))
        }
        Command::Serve => {
            let server = Server::new(gate);
            server.serve(std::io::stdin().lock(), std::io::stdout().lock())?;
            Ok(exit_codes::OK)
        }
    }
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{payload}").context("write stdout")?;
    Ok(())
}
