//! Selection of the instruction sequence that observes the overflow flag.

use std::fmt;
use std::str::FromStr;

use crate::TrapError;

/// How a checked operation observes the processor's signed-overflow flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrapMode {
    /// `add`/`sub`/`imul` followed by `seto` in one inline assembly block.
    /// Only available on x86_64.
    Hardware,
    /// Wrapping operation, with the flag recomputed from operands and result.
    Emulated,
}

impl TrapMode {
    /// Best mode for the compilation target.
    pub const fn detect() -> Self {
        if cfg!(target_arch = "x86_64") {
            TrapMode::Hardware
        } else {
            TrapMode::Emulated
        }
    }

    pub fn is_supported(self) -> bool {
        self.is_supported_on(std::env::consts::ARCH)
    }

    /// Whether this mode can run on target architecture `arch`, as named by
    /// [`std::env::consts::ARCH`].
    pub fn is_supported_on(self, arch: &str) -> bool {
        match self {
            TrapMode::Hardware => arch == "x86_64",
            TrapMode::Emulated => true,
        }
    }

    /// Fails with [`TrapError::PlatformUnsupported`] if this mode cannot run
    /// on the current target.
    pub fn ensure_supported(self) -> Result<Self, TrapError> {
        self.ensure_supported_on(std::env::consts::ARCH)
    }

    pub fn ensure_supported_on(self, arch: &'static str) -> Result<Self, TrapError> {
        if self.is_supported_on(arch) {
            Ok(self)
        } else {
            Err(TrapError::PlatformUnsupported { mode: self, arch })
        }
    }

    pub(crate) const fn code(self) -> u8 {
        match self {
            TrapMode::Hardware => 1,
            TrapMode::Emulated => 2,
        }
    }

    pub(crate) const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TrapMode::Hardware),
            2 => Some(TrapMode::Emulated),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TrapMode::Hardware => "hardware",
            TrapMode::Emulated => "emulated",
        }
    }
}

impl fmt::Display for TrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrapMode {
    type Err = TrapError;

    /// Accepts `auto`, `hardware` and `emulated`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(TrapMode::detect()),
            "hardware" | "hw" => Ok(TrapMode::Hardware),
            "emulated" | "emu" => Ok(TrapMode::Emulated),
            _ => Err(TrapError::UnknownMode(s.to_string())),
        }
    }
}
