use std::fmt;
use std::str::FromStr;

use super::PlatformError;

/// Operating systems a distribution can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
  Linux,
  MacOsx,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOsx),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the identifier used in platform keys
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOsx => "macosx",
      Self::Windows => "windows",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Os {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "linux" => Ok(Self::Linux),
      "macosx" => Ok(Self::MacOsx),
      "windows" => Ok(Self::Windows),
      other => Err(PlatformError::UnknownOs(other.to_string())),
    }
  }
}
