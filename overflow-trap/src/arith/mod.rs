//! Checked 32-bit signed arithmetic.
//!
//! Each operation clears the signal, executes the instruction together with
//! an overflow observation, and raises the trap when the flag is set. The
//! caller gets the raw machine result and the signal state read right after.

mod emulated;
#[cfg(target_arch = "x86_64")]
mod hardware;

use std::fmt;
use std::str::FromStr;

use crate::handler::TrapFrame;
use crate::signal::TrapSignal;
use crate::vector::TrapVector;
use crate::{TrapError, TrapMode};

pub use emulated::{add_overflows, mul_overflows, sub_overflows};

/// Operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl ArithOp {
    pub const ALL: [ArithOp; 3] = [ArithOp::Add, ArithOp::Sub, ArithOp::Mul];

    pub const fn symbol(self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
            ArithOp::Mul => '*',
        }
    }

    pub(crate) const fn code(self) -> u8 {
        match self {
            ArithOp::Add => 1,
            ArithOp::Sub => 2,
            ArithOp::Mul => 3,
        }
    }

    pub(crate) const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ArithOp::Add),
            2 => Some(ArithOp::Sub),
            3 => Some(ArithOp::Mul),
            _ => None,
        }
    }

    /// Wrapping result and hardware overflow flag.
    fn execute(self, mode: TrapMode, a: i32, b: i32) -> (i32, bool) {
        match mode {
            #[cfg(target_arch = "x86_64")]
            TrapMode::Hardware => hardware::execute(self, a, b),
            _ => emulated::execute(self, a, b),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<char> for ArithOp {
    type Error = char;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '+' => Ok(ArithOp::Add),
            '-' => Ok(ArithOp::Sub),
            '*' | 'x' | 'X' => Ok(ArithOp::Mul),
            other => Err(other),
        }
    }
}

impl FromStr for ArithOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "add" => Ok(ArithOp::Add),
            "sub" => Ok(ArithOp::Sub),
            "mul" => Ok(ArithOp::Mul),
            t => {
                let mut chars = t.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => {
                        ArithOp::try_from(c).map_err(|c| format!("unknown operator `{c}`"))
                    }
                    _ => Err(format!("unknown operator `{t}`")),
                }
            }
        }
    }
}

/// Outcome of one checked operation.
///
/// `value` is whatever the hardware produced. When `overflowed` is set it is
/// the wrapped bit pattern, not a clamped or otherwise usable number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct CheckedResult {
    pub value: i32,
    pub overflowed: bool,
}

impl CheckedResult {
    /// The value, if it can be trusted.
    pub fn trusted(self) -> Option<i32> {
        (!self.overflowed).then_some(self.value)
    }
}

/// Checked arithmetic bound to one trap vector and one signal.
#[derive(Debug, Clone, Copy)]
pub struct CheckedArithmetic<'a> {
    vector: &'a TrapVector,
    signal: &'a TrapSignal,
    mode: TrapMode,
}

impl<'a> CheckedArithmetic<'a> {
    /// Fails with [`TrapError::PlatformUnsupported`] before any arithmetic
    /// can run in an unavailable mode.
    pub fn new(
        vector: &'a TrapVector,
        signal: &'a TrapSignal,
        mode: TrapMode,
    ) -> Result<Self, TrapError> {
        Ok(Self::unchecked(vector, signal, mode.ensure_supported()?))
    }

    pub(crate) fn unchecked(vector: &'a TrapVector, signal: &'a TrapSignal, mode: TrapMode) -> Self {
        Self {
            vector,
            signal,
            mode,
        }
    }

    pub fn mode(&self) -> TrapMode {
        self.mode
    }

    pub fn signal(&self) -> &'a TrapSignal {
        self.signal
    }

    pub fn checked_add(&self, a: i32, b: i32) -> CheckedResult {
        self.apply(ArithOp::Add, a, b)
    }

    pub fn checked_sub(&self, a: i32, b: i32) -> CheckedResult {
        self.apply(ArithOp::Sub, a, b)
    }

    pub fn checked_mul(&self, a: i32, b: i32) -> CheckedResult {
        self.apply(ArithOp::Mul, a, b)
    }

    pub fn apply(&self, op: ArithOp, a: i32, b: i32) -> CheckedResult {
        self.signal.reset();

        let (value, flag) = op.execute(self.mode, a, b);
        if flag {
            self.vector
                .raise(&TrapFrame::new(op, a, b, value, self.signal));
        }

        CheckedResult {
            value,
            overflowed: self.signal.overflowed(),
        }
    }
}
