//! Interactive prompt: read two integers, run one checked operation.

use anyhow::Result;
use colored::Colorize;
use overflow_trap::{ArithOp, CheckedArithmetic};
use std::io::{BufRead, Write};

use crate::report::{print_banner, print_outcome};

enum Input {
    Value(i32),
    Quit,
}

/// Prompt until a valid `i32` is entered. `q`/`Q` or EOF quits.
fn read_operand<R: BufRead, W: Write>(label: &str, input: &mut R, out: &mut W) -> Result<Input> {
    loop {
        write!(out, "Enter the {} integer: ", label)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(Input::Quit);
        }

        let token = line.trim();
        if token.starts_with(['q', 'Q']) {
            return Ok(Input::Quit);
        }

        match token.parse::<i32>() {
            Ok(value) => return Ok(Input::Value(value)),
            Err(e) => writeln!(
                out,
                "{} `{}` is not a 32-bit signed integer ({}), try again",
                "[ERROR]".red().bold(),
                token,
                e
            )?,
        }
    }
}

/// Run the prompt loop. Returns how many operations were evaluated.
pub fn run_interactive<R: BufRead, W: Write>(
    arith: &CheckedArithmetic<'_>,
    op: ArithOp,
    input: &mut R,
    out: &mut W,
) -> Result<usize> {
    print_banner(out, "Interactive mode")?;
    writeln!(out, "Enter two integers to evaluate a {} b", op)?;
    writeln!(out, "Enter q to leave interactive mode\n")?;

    let mut evaluated = 0;
    loop {
        let Input::Value(a) = read_operand("first", input, out)? else {
            break;
        };
        let Input::Value(b) = read_operand("second", input, out)? else {
            break;
        };

        writeln!(out, "\nCompute: {} {} {}", a, op, b)?;
        let result = arith.apply(op, a, b);
        print_outcome(out, result, arith.signal())?;
        writeln!(out)?;
        evaluated += 1;
    }

    Ok(evaluated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use overflow_trap::{TrapGuard, TrapMode, TrapSignal, TrapVector};
    use std::io::Cursor;

    fn run(script: &str, op: ArithOp) -> (usize, String) {
        let vector = TrapVector::new();
        let signal = TrapSignal::new();
        let guard = TrapGuard::acquire(&vector, TrapMode::detect()).unwrap();
        let mut out = Vec::new();

        let count = run_interactive(
            &guard.arithmetic(&signal),
            op,
            &mut Cursor::new(script),
            &mut out,
        )
        .unwrap();
        (count, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_addition_then_quit() {
        let (count, text) = run("100\n200\nq\n", ArithOp::Add);
        assert_eq!(count, 1);
        assert!(text.contains("300"));
        assert!(text.contains("[OK]"));
    }

    #[test]
    fn test_overflow_is_flagged() {
        let (count, text) = run("2147483647\n1\nQ\n", ArithOp::Add);
        assert_eq!(count, 1);
        assert!(text.contains("[OVERFLOW]"));
    }

    #[test]
    fn test_invalid_input_reprompts() {
        let (count, text) = run("abc\n2147483648\n6\n7\n", ArithOp::Mul);
        assert_eq!(count, 1);
        assert_eq!(text.matches("[ERROR]").count(), 2);
        assert!(text.contains("42"));
    }

    #[test]
    fn test_quit_on_second_operand() {
        let (count, _) = run("5\nquit\n", ArithOp::Sub);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_eof_ends_session() {
        let (count, _) = run("", ArithOp::Add);
        assert_eq!(count, 0);
    }
}
