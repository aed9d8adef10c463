//! x86_64 instruction sequences: the arithmetic instruction immediately
//! followed by `seto`, which captures OF as set by that instruction.

use std::arch::asm;

use super::ArithOp;

pub(super) fn execute(op: ArithOp, a: i32, b: i32) -> (i32, bool) {
    let value: i32;
    let of: u8;
    // SAFETY: register-only arithmetic; no memory or stack access.
    unsafe {
        match op {
            ArithOp::Add => asm!(
                "add {v:e}, {b:e}",
                "seto {of}",
                v = inout(reg) a => value,
                b = in(reg) b,
                of = out(reg_byte) of,
                options(pure, nomem, nostack),
            ),
            ArithOp::Sub => asm!(
                "sub {v:e}, {b:e}",
                "seto {of}",
                v = inout(reg) a => value,
                b = in(reg) b,
                of = out(reg_byte) of,
                options(pure, nomem, nostack),
            ),
            ArithOp::Mul => asm!(
                "imul {v:e}, {b:e}",
                "seto {of}",
                v = inout(reg) a => value,
                b = in(reg) b,
                of = out(reg_byte) of,
                options(pure, nomem, nostack),
            ),
        }
    }
    (value, of != 0)
}
