//! # Overflow Trap
//!
//! Signed 32-bit arithmetic that surfaces overflow through a trap slot instead
//! of silently wrapping.
//!
//! ## How It Works
//!
//! A [`TrapVector`] is a single process-wide slot naming the handler that runs
//! when an overflow trap fires. A [`TrapVectorManager`] swaps the
//! [`OVERFLOW_HANDLER`] into that slot and remembers whatever was there before,
//! so it can be put back exactly once.
//!
//! Each [`CheckedArithmetic`] call resets the [`TrapSignal`], runs the
//! operation together with an overflow observation, and dispatches through the
//! slot when the flag is set. The handler only flips the signal and records a
//! diagnostic, so the caller reads the outcome from the returned
//! [`CheckedResult`].
//!
//! ## Usage
//!
//! ```rust
//! use overflow_trap::{CheckedArithmetic, TrapGuard, TrapMode, TrapSignal, TrapVector};
//!
//! static VECTOR: TrapVector = TrapVector::new();
//! static SIGNAL: TrapSignal = TrapSignal::new();
//!
//! let guard = TrapGuard::acquire(&VECTOR, TrapMode::detect()).unwrap();
//! let arith = guard.arithmetic(&SIGNAL);
//!
//! assert_eq!(arith.checked_add(100, 200).trusted(), Some(300));
//! assert!(arith.checked_add(i32::MAX, 1).overflowed);
//!
//! guard.release().unwrap();
//! ```

mod arith;
mod error;
mod handler;
mod platform;
mod signal;
mod vector;

pub use arith::{add_overflows, mul_overflows, sub_overflows, ArithOp, CheckedArithmetic, CheckedResult};
pub use error::TrapError;
pub use handler::{HandlerState, TrapFrame, TrapHandler, DEFAULT_HANDLER, OVERFLOW_HANDLER, OVERFLOW_MESSAGE};
pub use platform::TrapMode;
pub use signal::{Fault, TrapSignal, MESSAGE_CAPACITY};
pub use vector::{TrapGuard, TrapVector, TrapVectorManager, OVERFLOW_VECTOR};

/// Signal shared by the process-wide vector.
pub static TRAP_SIGNAL: TrapSignal = TrapSignal::new();

/// Uses the mode of the guard holding [`OVERFLOW_VECTOR`], or the detected
/// mode when no guard holds it.
fn process_arithmetic() -> CheckedArithmetic<'static> {
    let mode = OVERFLOW_VECTOR
        .active_mode()
        .unwrap_or_else(TrapMode::detect);
    CheckedArithmetic::unchecked(&OVERFLOW_VECTOR, &TRAP_SIGNAL, mode)
}

/// Checked `a + b` through [`OVERFLOW_VECTOR`] and [`TRAP_SIGNAL`].
///
/// Overflow is only reported while the overflow handler is installed in the
/// process-wide vector.
pub fn checked_add(a: i32, b: i32) -> CheckedResult {
    process_arithmetic().checked_add(a, b)
}

/// Checked `a - b` through [`OVERFLOW_VECTOR`] and [`TRAP_SIGNAL`].
pub fn checked_sub(a: i32, b: i32) -> CheckedResult {
    process_arithmetic().checked_sub(a, b)
}

/// Checked `a * b` through [`OVERFLOW_VECTOR`] and [`TRAP_SIGNAL`].
pub fn checked_mul(a: i32, b: i32) -> CheckedResult {
    process_arithmetic().checked_mul(a, b)
}
