//! Effective binary/source fallback policy for one platform.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::{ResolutionConfig, merge_resolution};
use crate::package::PackageName;

/// The resolved policy used by the acquisition engine.
///
/// Unset booleans resolve to `false`; every name in the lists is normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionPolicy {
  pub allow_source_all: bool,
  pub strict_missing: bool,
  pub allow_source_list: BTreeSet<String>,
  pub force_no_binary_list: BTreeSet<String>,
  pub only_binary_list: BTreeSet<String>,
}

impl ResolutionPolicy {
  /// Source fallback permitted, either globally or for this package.
  pub fn allows_source(&self, name: &PackageName) -> bool {
    self.allow_source_all || self.allow_source_list.contains(name.as_str())
  }

  pub fn forbids_source(&self, name: &PackageName) -> bool {
    self.only_binary_list.contains(name.as_str())
  }

  pub fn forces_source(&self, name: &PackageName) -> bool {
    self.force_no_binary_list.contains(name.as_str())
  }
}

impl From<ResolutionConfig> for ResolutionPolicy {
  fn from(config: ResolutionConfig) -> Self {
    Self {
      allow_source_all: config.allow_source_all.unwrap_or(false),
      strict_missing: config.strict_missing.unwrap_or(false),
      allow_source_list: config.allow_source_list,
      force_no_binary_list: config.force_no_binary_list,
      only_binary_list: config.only_binary_list,
    }
  }
}

/// Overlay a platform fragment onto the global policy.
///
/// `resolve(base, &ResolutionConfig::default())` is `base` with its lists
/// normalized. Lists in the result are the union of both sides.
pub fn resolve(base: &ResolutionConfig, platform_override: &ResolutionConfig) -> ResolutionPolicy {
  merge_resolution(base, platform_override).into()
}
