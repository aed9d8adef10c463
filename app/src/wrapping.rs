//! Side-by-side: Rust's silent wrapping versus the checked operations.

use anyhow::Result;
use colored::Colorize;
use overflow_trap::CheckedArithmetic;
use std::io::Write;

use crate::report::{print_banner, print_outcome};

pub fn run_wrapping_demo<W: Write>(arith: &CheckedArithmetic<'_>, out: &mut W) -> Result<()> {
    print_banner(out, "Default overflow behavior")?;

    writeln!(out, "i32::MAX = {}", i32::MAX)?;
    writeln!(out, "i32::MIN = {}", i32::MIN)?;
    writeln!(
        out,
        "\n{} (debug builds panic, release builds wrap silently):",
        "Plain arithmetic".yellow().bold()
    )?;
    writeln!(out, "  i32::MAX + 1 = {} (wrapped)", i32::MAX.wrapping_add(1))?;
    writeln!(out, "  i32::MIN - 1 = {} (wrapped)", i32::MIN.wrapping_sub(1))?;

    writeln!(out, "\n{}", "Checked through the overflow trap:".green().bold())?;
    writeln!(out, "  i32::MAX + 1")?;
    print_outcome(out, arith.checked_add(i32::MAX, 1), arith.signal())?;
    writeln!(out, "  i32::MIN - 1")?;
    print_outcome(out, arith.checked_sub(i32::MIN, 1), arith.signal())?;
    Ok(())
}
