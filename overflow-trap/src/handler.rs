//! Trap handlers and the context they run in.
//!
//! A handler runs synchronously from inside a checked operation, between the
//! flag-setting instruction and the operation's return. It may only perform
//! atomic stores: no allocation, no locking, no logging, no I/O. Narration
//! belongs to the caller once control is back.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::arith::ArithOp;
use crate::signal::TrapSignal;

/// Diagnostic written by [`OVERFLOW_HANDLER`].
pub const OVERFLOW_MESSAGE: &str =
    "arithmetic overflow: signed result exceeds the representable range";

/// Handler that records the overflow into the frame's [`TrapSignal`].
pub static OVERFLOW_HANDLER: TrapHandler = TrapHandler::new("overflow", record_overflow);

/// What a fresh [`TrapVector`](crate::TrapVector) holds: returns without
/// doing anything, so an overflow goes unnoticed.
pub static DEFAULT_HANDLER: TrapHandler = TrapHandler::new("default", ignore_trap);

fn record_overflow(frame: &TrapFrame<'_>) {
    frame.signal.record(OVERFLOW_MESSAGE, frame);
}

fn ignore_trap(_frame: &TrapFrame<'_>) {}

/// Entry in a trap slot.
///
/// Handlers live in statics; the slot stores a reference to one and compares
/// by address, so two descriptors with the same entry are still distinct.
pub struct TrapHandler {
    name: &'static str,
    entry: fn(&TrapFrame<'_>),
}

impl TrapHandler {
    pub const fn new(name: &'static str, entry: fn(&TrapFrame<'_>)) -> Self {
        Self { name, entry }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn invoke(&self, frame: &TrapFrame<'_>) {
        (self.entry)(frame)
    }

    pub fn is(&self, other: &TrapHandler) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for TrapHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapHandler")
            .field("name", &self.name)
            .field("addr", &(self as *const Self))
            .finish()
    }
}

/// State captured at the trap instruction.
pub struct TrapFrame<'a> {
    pub op: ArithOp,
    pub lhs: i32,
    pub rhs: i32,
    /// Wrapped value left in the destination register.
    pub value: i32,
    signal: &'a TrapSignal,
}

impl<'a> TrapFrame<'a> {
    pub(crate) fn new(op: ArithOp, lhs: i32, rhs: i32, value: i32, signal: &'a TrapSignal) -> Self {
        Self {
            op,
            lhs,
            rhs,
            value,
            signal,
        }
    }
}

const IDLE: u8 = 0;
const HANDLING: u8 = 1;

/// Idle/Handling state of the handler attached to one trap slot.
///
/// Idle -> Handling when a trap is raised, Handling -> Idle when the handler
/// body returns. A trap raised while Handling is dropped.
pub struct HandlerState(AtomicU8);

impl HandlerState {
    pub const fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    pub fn is_handling(&self) -> bool {
        self.0.load(Ordering::Acquire) == HANDLING
    }

    /// Enters Handling, or returns `None` if a handler is already running.
    pub(crate) fn enter(&self) -> Option<Handling<'_>> {
        self.0
            .compare_exchange(IDLE, HANDLING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Handling(self))
    }
}

impl Default for HandlerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the state to Idle on drop.
pub(crate) struct Handling<'a>(&'a HandlerState);

impl Drop for Handling<'_> {
    fn drop(&mut self) {
        self.0 .0.store(IDLE, Ordering::Release);
    }
}
