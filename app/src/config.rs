//! Driver configuration (`trap-demo.toml`)
//!
//! ```toml
//! mode = "emulated"   # auto | hardware | emulated
//! step = true         # wait for Enter between canned cases
//!
//! [[cases]]
//! a = 2147483647
//! b = 1
//! op = "+"
//! description = "INT_MAX + 1"
//! ```

use anyhow::{Context, Result};
use overflow_trap::TrapMode;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::cases::Case;

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "trap-demo.toml";

/// Trap mode as written in the config file or on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// Hardware on x86_64, emulated elsewhere
    #[default]
    Auto,
    /// Inline `seto` after the arithmetic instruction (x86_64 only)
    Hardware,
    /// Flag recomputed from operands and result
    Emulated,
}

impl ModeSetting {
    pub fn resolve(self) -> TrapMode {
        match self {
            ModeSetting::Auto => TrapMode::detect(),
            ModeSetting::Hardware => TrapMode::Hardware,
            ModeSetting::Emulated => TrapMode::Emulated,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    #[serde(default)]
    pub mode: ModeSetting,
    #[serde(default)]
    pub step: bool,
    /// Replaces the built-in case table when non-empty
    #[serde(default)]
    pub cases: Vec<Case>,
}

impl DemoConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse config content
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `explicit` if given (it must exist), otherwise the default file
    /// if present, otherwise built-in defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    log::debug!("using {}", default.display());
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
