use std::fmt;
use std::str::FromStr;

use crate::delimiters::Delimiters;

/// Default cap on bytes carried over between reads: 16 KiB.
pub const DEFAULT_MAX_RESIDUAL: usize = 16 * 1024;

/// What happens to an unterminated packet at the end of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReassemblyMode {
    /// Keep the fragment (from its `START` onward) and prepend it to the
    /// next read on the same connection.
    #[default]
    Strict,
    /// Frame every read on its own; a packet split across reads is lost.
    PerRead,
}

impl ReassemblyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReassemblyMode::Strict => "strict",
            ReassemblyMode::PerRead => "per-read",
        }
    }
}

impl fmt::Display for ReassemblyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `strict`/`on` and `per-read`/`off`.
impl FromStr for ReassemblyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" | "on" => Ok(Self::Strict),
            "per-read" | "off" => Ok(Self::PerRead),
            other => Err(format!(
                "unknown reassembly mode {other:?} (expected strict|on|per-read|off)"
            )),
        }
    }
}

/// Configuration for packet framing on one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Delimiter bytes. Default: `*`, `|`, `&`.
    pub delimiters: Delimiters,
    /// Treatment of packets split across reads. Default: strict.
    pub reassembly: ReassemblyMode,
    /// Largest unterminated fragment kept between reads. Default: 16 KiB.
    pub max_residual_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            reassembly: ReassemblyMode::default(),
            max_residual_size: DEFAULT_MAX_RESIDUAL,
        }
    }
}
