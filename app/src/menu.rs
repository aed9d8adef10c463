//! Numbered menu shown when no subcommand is given.

use anyhow::Result;
use colored::Colorize;
use overflow_trap::{ArithOp, CheckedArithmetic};
use std::io::{BufRead, Write};

use crate::cases::{run_cases, Case};
use crate::interactive::run_interactive;
use crate::wrapping::run_wrapping_demo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Cases,
    Interactive,
    Wrapping,
    Quit,
}

impl Choice {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "1" => Some(Choice::Cases),
            "2" => Some(Choice::Interactive),
            "3" => Some(Choice::Wrapping),
            "4" => Some(Choice::Quit),
            _ => None,
        }
    }
}

/// Loop until the user picks quit or input ends
pub fn run_menu<R: BufRead, W: Write>(
    arith: &CheckedArithmetic<'_>,
    cases: &[Case],
    step: bool,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    loop {
        writeln!(out, "\n{}", "Select a mode:".white().bold())?;
        writeln!(out, "  1. Run all test cases")?;
        writeln!(out, "  2. Interactive addition")?;
        writeln!(out, "  3. Show default overflow behavior")?;
        writeln!(out, "  4. Quit")?;
        write!(out, "Choice (1-4): ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }

        match Choice::parse(&line) {
            Some(Choice::Cases) => {
                run_cases(arith, cases, step, input, out)?;
            }
            Some(Choice::Interactive) => {
                run_interactive(arith, ArithOp::Add, input, out)?;
            }
            Some(Choice::Wrapping) => run_wrapping_demo(arith, out)?,
            Some(Choice::Quit) => {
                writeln!(out, "Leaving...")?;
                return Ok(());
            }
            None => writeln!(
                out,
                "{} Invalid choice `{}`, try again",
                "[WARNING]".yellow().bold(),
                line.trim()
            )?,
        }
    }
}
