//! Dependency spec parsing and package name normalization.
//!
//! A dependency spec is the raw requirement string from the configuration,
//! e.g. `"numpy==2.1.0"` or `"cffi>=1.15"`. All comparisons between package
//! names happen on the normalized form.

use std::fmt;

/// Characters that terminate the package name inside a dependency spec.
const VERSION_OPERATORS: [char; 4] = ['<', '>', '=', '!'];

/// Normalize a package name: lowercase, `_` replaced by `-`.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(name: &str) -> String {
  name.trim().to_lowercase().replace('_', "-")
}

/// Extract the package name from a dependency spec.
///
/// Returns the substring preceding the first of `< > = !`, trimmed. A spec
/// with no operator is returned whole.
pub fn package_name(spec: &str) -> &str {
  match spec.find(VERSION_OPERATORS) {
    Some(idx) => spec[..idx].trim(),
    None => spec.trim(),
  }
}

/// A normalized package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
  pub fn new(name: &str) -> Self {
    Self(normalize(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for PackageName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A parsed dependency spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
  /// The spec exactly as written in the configuration.
  pub raw: String,
  /// The name as written, before normalization.
  pub display_name: String,
  /// The normalized package name.
  pub name: PackageName,
}

impl DependencySpec {
  pub fn parse(raw: &str) -> Self {
    let display_name = package_name(raw).to_string();
    Self {
      raw: raw.trim().to_string(),
      name: PackageName::new(&display_name),
      display_name,
    }
  }

  /// Returns the pinned version if the spec is an exact `name==version` pin.
  pub fn pinned_version(&self) -> Option<&str> {
    let rest = self.raw.get(self.display_name.len()..)?.trim_start();
    let version = rest.strip_prefix("==")?;
    if version.starts_with('=') {
      return None;
    }
    Some(version.trim())
  }
}

impl fmt::Display for DependencySpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}
