use std::fmt;
use std::str::FromStr;

use super::PlatformError;

/// CPU architectures a distribution can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
  X64,
  Aarch64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X64),
      "aarch64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  /// Returns the identifier used in platform keys
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X64 => "x64",
      Self::Aarch64 => "aarch64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "x64" => Ok(Self::X64),
      "aarch64" => Ok(Self::Aarch64),
      other => Err(PlatformError::UnknownArch(other.to_string())),
    }
  }
}
