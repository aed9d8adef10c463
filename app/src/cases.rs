//! Canned overflow scenarios
//!
//! The built-in table covers both overflow directions for each operation
//! and a few ordinary results. A config file may replace it.

use anyhow::Result;
use colored::Colorize;
use once_cell::sync::Lazy;
use overflow_trap::{ArithOp, CheckedArithmetic};
use serde::{Deserialize, Deserializer};
use std::io::{BufRead, Write};

use crate::report::{print_banner, print_outcome};

/// One scenario: `a op b`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    pub a: i32,
    pub b: i32,
    #[serde(deserialize_with = "deserialize_op")]
    pub op: ArithOp,
    pub description: String,
}

impl Case {
    pub fn new(a: i32, b: i32, op: ArithOp, description: &str) -> Self {
        Self {
            a,
            b,
            op,
            description: description.to_string(),
        }
    }
}

fn deserialize_op<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ArithOp, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

/// Built-in scenario table
pub static DEFAULT_CASES: Lazy<Vec<Case>> = Lazy::new(|| {
    vec![
        Case::new(i32::MAX, 1, ArithOp::Add, "INT_MAX + 1 (positive overflow)"),
        Case::new(i32::MIN, -1, ArithOp::Add, "INT_MIN + (-1) (negative overflow)"),
        Case::new(i32::MIN, 1, ArithOp::Sub, "INT_MIN - 1 (underflow)"),
        Case::new(i32::MAX, -1, ArithOp::Sub, "INT_MAX - (-1) (overflow)"),
        Case::new(100_000, 100_000, ArithOp::Mul, "Large multiplication overflow"),
        Case::new(100, 200, ArithOp::Add, "Ordinary addition"),
        Case::new(-100, -200, ArithOp::Add, "Ordinary negative addition"),
        Case::new(500, 300, ArithOp::Sub, "Ordinary subtraction"),
    ]
});

/// Counts gathered while running a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub overflowed: usize,
}

/// Run every case, narrating each outcome
///
/// With `step` set, waits for a line on `input` between cases; EOF stops
/// the run early.
pub fn run_cases<R: BufRead, W: Write>(
    arith: &CheckedArithmetic<'_>,
    cases: &[Case],
    step: bool,
    input: &mut R,
    out: &mut W,
) -> Result<Summary> {
    print_banner(out, "Overflow trap test cases")?;

    let mut summary = Summary::default();
    for (i, case) in cases.iter().enumerate() {
        writeln!(out, "\nTest {}: {}", i + 1, case.description.white().bold())?;
        writeln!(out, "  Operation: {} {} {}", case.a, case.op, case.b)?;

        let result = arith.apply(case.op, case.a, case.b);
        print_outcome(out, result, arith.signal())?;

        summary.total += 1;
        if result.overflowed {
            summary.overflowed += 1;
        }

        if step && i + 1 < cases.len() {
            write!(out, "Press Enter for the next case...")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }
        }
    }

    writeln!(
        out,
        "\n{} {} cases, {} overflowed",
        "[*]".cyan().bold(),
        summary.total,
        summary.overflowed
    )?;
    Ok(summary)
}
