//! Narration of checked results.
//!
//! All console output about a trap happens here, after the checked
//! operation has returned.

use colored::Colorize;
use overflow_trap::{CheckedResult, TrapSignal};
use std::io::{self, Write};

/// Print the outcome of one checked operation.
///
/// An overflowed value is printed only with an explicit untrustworthy label.
pub fn print_outcome<W: Write>(
    out: &mut W,
    result: CheckedResult,
    signal: &TrapSignal,
) -> io::Result<()> {
    if result.overflowed {
        writeln!(
            out,
            "{} Overflow trap fired: {}",
            "[OVERFLOW]".red().bold(),
            signal.message()
        )?;
        writeln!(
            out,
            "  Raw value {} is NOT the correct result (untrustworthy)",
            result.value.to_string().yellow()
        )?;
        writeln!(
            out,
            "  Use a wider type (i64) or check the operand range"
        )?;
    } else {
        writeln!(
            out,
            "{} Result: {}",
            "[OK]".green().bold(),
            result.value.to_string().white().bold()
        )?;
    }
    Ok(())
}

pub fn print_banner<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "\n{}", "=".repeat(60))?;
    writeln!(out, "{}", title.cyan().bold())?;
    writeln!(out, "{}", "=".repeat(60))
}
