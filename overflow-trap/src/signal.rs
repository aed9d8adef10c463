//! The overflow signal shared between the trap handler and callers.
//!
//! Every field is an atomic so the handler can write it from trap context
//! without allocating or locking.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicUsize, Ordering};

use crate::arith::ArithOp;
use crate::handler::TrapFrame;

/// Size of the diagnostic message buffer in bytes.
pub const MESSAGE_CAPACITY: usize = 128;

/// Operands and wrapped result of the operation that trapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub op: ArithOp,
    pub lhs: i32,
    pub rhs: i32,
    /// Whatever the hardware left in the destination. Not a valid result.
    pub value: i32,
}

/// Whether the most recent checked operation overflowed, plus a diagnostic.
///
/// Only the overflow handler sets the flag, and only checked arithmetic
/// clears it. The flag describes the latest call only; read it right after
/// the operation that may have set it.
pub struct TrapSignal {
    overflowed: AtomicBool,
    message: [AtomicU8; MESSAGE_CAPACITY],
    message_len: AtomicUsize,
    fault_op: AtomicU8,
    fault_lhs: AtomicI32,
    fault_rhs: AtomicI32,
    fault_value: AtomicI32,
}

impl TrapSignal {
    pub const fn new() -> Self {
        Self {
            overflowed: AtomicBool::new(false),
            message: [const { AtomicU8::new(0) }; MESSAGE_CAPACITY],
            message_len: AtomicUsize::new(0),
            fault_op: AtomicU8::new(0),
            fault_lhs: AtomicI32::new(0),
            fault_rhs: AtomicI32::new(0),
            fault_value: AtomicI32::new(0),
        }
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }

    /// Last diagnostic written by the handler, empty if none was written yet.
    pub fn message(&self) -> String {
        let len = self.message_len.load(Ordering::Acquire);
        let bytes: Vec<u8> = self.message[..len]
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// The operation recorded by the last trap, if the flag is still set.
    pub fn last_fault(&self) -> Option<Fault> {
        if !self.overflowed() {
            return None;
        }
        let op = ArithOp::from_code(self.fault_op.load(Ordering::Relaxed))?;
        Some(Fault {
            op,
            lhs: self.fault_lhs.load(Ordering::Relaxed),
            rhs: self.fault_rhs.load(Ordering::Relaxed),
            value: self.fault_value.load(Ordering::Relaxed),
        })
    }

    /// Clears the flag and the fault record. The message is kept until the
    /// next trap overwrites it.
    pub(crate) fn reset(&self) {
        self.fault_op.store(0, Ordering::Relaxed);
        self.overflowed.store(false, Ordering::Release);
    }

    /// Trap-context write. Atomic stores only.
    pub(crate) fn record(&self, message: &str, frame: &TrapFrame<'_>) {
        let mut len = message.len().min(MESSAGE_CAPACITY);
        while !message.is_char_boundary(len) {
            len -= 1;
        }
        for (slot, byte) in self.message.iter().zip(&message.as_bytes()[..len]) {
            slot.store(*byte, Ordering::Relaxed);
        }
        self.message_len.store(len, Ordering::Release);

        self.fault_lhs.store(frame.lhs, Ordering::Relaxed);
        self.fault_rhs.store(frame.rhs, Ordering::Relaxed);
        self.fault_value.store(frame.value, Ordering::Relaxed);
        self.fault_op.store(frame.op.code(), Ordering::Relaxed);
        self.overflowed.store(true, Ordering::Release);
    }
}

impl Default for TrapSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TrapSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrapSignal")
            .field("overflowed", &self.overflowed())
            .field("message", &self.message())
            .finish()
    }
}
