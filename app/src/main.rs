//! Overflow Trap Demo
//!
//! Driver for the `overflow-trap` library. Installs the overflow handler
//! into the process-wide trap vector for the lifetime of the program and
//! narrates checked 32-bit arithmetic.
//!
//! # Usage
//!
//! ```bash
//! # Numbered menu
//! trap-demo
//!
//! # Run the canned cases, pausing between them
//! trap-demo cases --step
//!
//! # Prompt for operands
//! trap-demo interactive --op '*'
//!
//! # Compare silent wrapping with the checked operations
//! trap-demo wrapping
//!
//! # One operation; non-zero exit status on overflow
//! trap-demo calc -- -2147483648 - 1
//! ```

mod cases;
mod config;
mod interactive;
mod menu;
mod report;
mod wrapping;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{error, info};
use overflow_trap::{ArithOp, CheckedArithmetic, TrapGuard, TRAP_SIGNAL};
use std::io::{self, Write};
use std::path::PathBuf;

use cases::{run_cases, Case, DEFAULT_CASES};
use config::{DemoConfig, ModeSetting};
use interactive::run_interactive;
use menu::run_menu;
use report::print_outcome;
use wrapping::run_wrapping_demo;

/// Overflow Trap Demo
///
/// Checked signed arithmetic through an overflow trap handler
#[derive(Parser)]
#[command(name = "trap-demo")]
#[command(version = "0.1.0")]
#[command(about = "Checked signed arithmetic through an overflow trap handler")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ./trap-demo.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// How the overflow flag is observed (overrides the config file)
    #[arg(short, long, global = true, value_enum)]
    mode: Option<ModeSetting>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the canned overflow cases
    Cases {
        /// Wait for Enter between cases
        #[arg(short, long)]
        step: bool,
    },

    /// Prompt for two integers at a time
    Interactive {
        /// Operator applied to each pair (+, -, *)
        #[arg(short, long, default_value = "+", allow_hyphen_values = true)]
        op: ArithOp,
    },

    /// Show silent wrapping next to the checked operations
    Wrapping,

    /// Evaluate a single checked operation
    Calc {
        #[arg(allow_hyphen_values = true)]
        a: i32,
        #[arg(allow_hyphen_values = true)]
        op: ArithOp,
        #[arg(allow_hyphen_values = true)]
        b: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let mut config = DemoConfig::discover(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    println!(
        "{} Installing overflow trap handler ({} mode)...",
        "[*]".cyan().bold(),
        config.mode.resolve()
    );
    let guard = TrapGuard::acquire_process(config.mode.resolve())
        .context("Failed to install overflow trap handler")?;
    info!("overflow trap handler installed");

    let outcome = run(cli.command, &guard.arithmetic(&TRAP_SIGNAL), &config);

    println!("{} Restoring previous trap handler...", "[*]".cyan().bold());
    if let Err(e) = guard.release() {
        if let Err(run_err) = &outcome {
            error!("{:#}", run_err);
        }
        return Err(e).context("Failed to restore previous trap handler");
    }
    info!("previous trap handler restored");

    outcome
}

fn run(command: Option<Commands>, arith: &CheckedArithmetic<'_>, config: &DemoConfig) -> Result<()> {
    let cases: &[Case] = if config.cases.is_empty() {
        &DEFAULT_CASES[..]
    } else {
        &config.cases[..]
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        None => run_menu(arith, cases, config.step, &mut input, &mut out)?,

        Some(Commands::Cases { step }) => {
            run_cases(arith, cases, step || config.step, &mut input, &mut out)?;
        }

        Some(Commands::Interactive { op }) => {
            run_interactive(arith, op, &mut input, &mut out)?;
        }

        Some(Commands::Wrapping) => run_wrapping_demo(arith, &mut out)?,

        Some(Commands::Calc { a, op, b }) => {
            writeln!(out, "{} {} {}", a, op, b)?;
            let result = arith.apply(op, a, b);
            print_outcome(&mut out, result, arith.signal())?;
            if result.overflowed {
                anyhow::bail!("{} {} {} overflows i32", a, op, b);
            }
        }
    }

    Ok(())
}
