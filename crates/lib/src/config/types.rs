//! Typed configuration records.
//!
//! A configuration file is either the shared base config or a
//! variant-specific override; both use the same schema. Every field is
//! optional in the file so that a variant only has to state what it changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::platform::PlatformKey;

/// Per-package, per-platform rules with a human-readable reason
/// (`package -> platformKey -> reason`).
pub type RuleMap = BTreeMap<String, BTreeMap<PlatformKey, String>>;

/// One configuration file, as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
  pub registries: Registries,
  pub build: BuildSettings,
  pub packages: PackagesConfig,
}

/// Additional package indexes passed to the downloader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registries {
  pub additional: Vec<String>,
}

/// Build-wide settings.
///
/// `parallelDownloads` from older configuration files is accepted and
/// ignored; downloads are always sequential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildSettings {
  /// Raise the default log level to `debug`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub enable_logging: Option<bool>,

  /// Per-tool-invocation timeout in seconds.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<u64>,

  /// Python `major.minor` the distribution is built for (e.g. "3.12").
  #[serde(skip_serializing_if = "Option::is_none")]
  pub python_version: Option<String>,

  /// Interpreter used to run the package downloader.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub python: Option<String>,
}

/// The `packages` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackagesConfig {
  pub dependencies: Vec<String>,
  pub skip: RuleMap,
  pub force_source: RuleMap,
  pub copy_files: Vec<CopyFile>,
  pub overrides: BTreeMap<String, String>,
  pub resolution: ResolutionConfig,
  pub platform_specific: BTreeMap<PlatformKey, PlatformConfig>,
}

/// A file or directory to place into the distribution.
///
/// `to` may contain the `{site-packages}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyFile {
  pub from: String,
  pub to: String,
}

/// Binary/source fallback policy as written in a config file.
///
/// Booleans are optional so that a variant can tell "not set" apart from an
/// explicit `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolutionConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub allow_source_all: Option<bool>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub strict_missing: Option<bool>,

  #[serde(skip_serializing_if = "BTreeSet::is_empty")]
  pub allow_source_list: BTreeSet<String>,

  #[serde(skip_serializing_if = "BTreeSet::is_empty")]
  pub force_no_binary_list: BTreeSet<String>,

  #[serde(skip_serializing_if = "BTreeSet::is_empty")]
  pub only_binary_list: BTreeSet<String>,
}

impl ResolutionConfig {
  pub fn is_empty(&self) -> bool {
    self.allow_source_all.is_none()
      && self.strict_missing.is_none()
      && self.allow_source_list.is_empty()
      && self.force_no_binary_list.is_empty()
      && self.only_binary_list.is_empty()
  }
}

/// Settings that apply to a single platform key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
  /// Dependencies added on top of the global list for this platform.
  pub dependencies: Vec<String>,

  pub copy_files: Vec<CopyFile>,

  pub resolution: ResolutionConfig,

  /// Older wheel platform tags to fetch as supplementary artifacts
  /// (e.g. `macosx_10_9_x86_64`).
  pub compatibility_tags: Vec<String>,
}

impl PlatformConfig {
  pub fn is_empty(&self) -> bool {
    self.dependencies.is_empty()
      && self.copy_files.is_empty()
      && self.resolution.is_empty()
      && self.compatibility_tags.is_empty()
  }
}
