//! Errors raised while managing the trap vector.
//!
//! Overflow itself is never an error: it travels as data in
//! [`CheckedResult`](crate::CheckedResult).

use thiserror::Error;

use crate::TrapMode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrapError {
    /// The vector is already claimed. Installing again would overwrite the
    /// saved handler and lose the ability to restore it.
    #[error("overflow trap already installed (slot holds `{active}`)")]
    DoubleInstall { active: &'static str },

    /// The requested trap mode cannot run on this target.
    #[error("trap mode `{mode}` is not supported on target architecture `{arch}`")]
    PlatformUnsupported { mode: TrapMode, arch: &'static str },

    /// Someone replaced the installed handler behind the manager's back.
    #[error("trap vector holds `{found}`, expected installed handler `{expected}`")]
    VectorClobbered {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown trap mode `{0}` (expected auto, hardware or emulated)")]
    UnknownMode(String),
}
