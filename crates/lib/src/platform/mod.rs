pub mod arch;
pub mod os;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arch::Arch;
pub use os::Os;

/// Errors produced when parsing platform identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
  #[error("unknown operating system '{0}' (expected linux, macosx or windows)")]
  UnknownOs(String),

  #[error("unknown architecture '{0}' (expected x64 or aarch64)")]
  UnknownArch(String),

  #[error("malformed platform key '{0}' (expected {{os}}-{{arch}})")]
  Malformed(String),

  #[error("unsupported host platform: {os}/{arch}")]
  UnsupportedHost { os: String, arch: String },
}

/// Platform key combining OS and architecture (e.g., "macosx-aarch64").
///
/// Every per-platform fragment of the build configuration is indexed by the
/// string form of this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformKey {
  pub os: Os,
  pub arch: Arch,
}

impl PlatformKey {
  /// Create a new platform key
  pub fn new(os: Os, arch: Arch) -> Self {
    Self { os, arch }
  }

  /// Detect the current platform at runtime
  pub fn current() -> Result<Self, PlatformError> {
    match (Os::current(), Arch::current()) {
      (Some(os), Some(arch)) => Ok(Self { os, arch }),
      _ => Err(PlatformError::UnsupportedHost {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
      }),
    }
  }

  /// Returns the key string (e.g., "linux-x64")
  pub fn key(&self) -> String {
    format!("{}-{}", self.os, self.arch)
  }
}

impl fmt::Display for PlatformKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.os, self.arch)
  }
}

impl FromStr for PlatformKey {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (os, arch) = s.split_once('-').ok_or_else(|| PlatformError::Malformed(s.to_string()))?;
    Ok(Self {
      os: os.parse()?,
      arch: arch.parse()?,
    })
  }
}

impl TryFrom<String> for PlatformKey {
  type Error = PlatformError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<PlatformKey> for String {
  fn from(key: PlatformKey) -> Self {
    key.key()
  }
}

/// Returns the platform key for the current system (e.g., "linux-x64")
///
/// Returns `None` if the current platform is not supported
pub fn platform_key() -> Option<String> {
  PlatformKey::current().ok().map(|p| p.key())
}
