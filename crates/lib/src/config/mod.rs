//! Build configuration: loading, merging, and the immutable merged view.
//!
//! A build is driven by a shared base config plus an optional
//! variant-specific override. [`load_merged`] produces a [`MergedConfig`],
//! which is built once per invocation and threaded through every component.

pub mod merge;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::package::{DependencySpec, PackageName};
use crate::platform::PlatformKey;
use crate::policy::{self, ResolutionPolicy};

pub use merge::{apply_overrides, merge_configs, merge_resolution};
pub use types::{
  BuildConfig, BuildSettings, CopyFile, PackagesConfig, PlatformConfig, Registries, ResolutionConfig, RuleMap,
};

/// Python version assumed when the config does not name one.
pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

/// Interpreter used to run the downloader when the config does not name one.
pub const DEFAULT_PYTHON: &str = "python3";

/// Errors raised while reading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Load a single configuration file.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(path = %path.display(), "loaded config");
  Ok(config)
}

/// Load the base config and, if given, merge the variant config over it.
pub fn load_merged(base: &Path, variant: Option<&Path>) -> Result<MergedConfig, ConfigError> {
  let base_config = load_config(base)?;
  let merged = match variant {
    Some(path) => {
      let variant_config = load_config(path)?;
      info!(base = %base.display(), variant = %path.display(), "merging variant config");
      merge_configs(base_config, variant_config)
    }
    None => base_config,
  };
  Ok(MergedConfig::from_config(merged))
}

/// The effective configuration for one build invocation.
///
/// Constructed once and never mutated. Version overrides are already applied
/// to every dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedConfig {
  config: BuildConfig,
}

impl MergedConfig {
  /// Finalize a (possibly merged) config: apply version overrides and check
  /// for empty dependency lists.
  pub fn from_config(mut config: BuildConfig) -> Self {
    let packages = &mut config.packages;
    packages.dependencies = apply_overrides(&packages.dependencies, &packages.overrides);
    for entry in packages.platform_specific.values_mut() {
      entry.dependencies = apply_overrides(&entry.dependencies, &packages.overrides);
    }

    if packages.dependencies.is_empty() {
      warn!("global dependency list is empty");
    }
    for (key, entry) in &packages.platform_specific {
      if entry.dependencies.is_empty() {
        debug!(platform = %key, "no platform-specific dependencies");
      }
    }

    Self { config }
  }

  pub fn registries(&self) -> &[String] {
    &self.config.registries.additional
  }

  pub fn python_version(&self) -> &str {
    self.config.build.python_version.as_deref().unwrap_or(DEFAULT_PYTHON_VERSION)
  }

  pub fn python(&self) -> &str {
    self.config.build.python.as_deref().unwrap_or(DEFAULT_PYTHON)
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.config.build.timeout.map(Duration::from_secs)
  }

  pub fn logging_enabled(&self) -> bool {
    self.config.build.enable_logging.unwrap_or(false)
  }

  pub fn platform_entry(&self, platform: PlatformKey) -> Option<&PlatformConfig> {
    self.config.packages.platform_specific.get(&platform)
  }

  /// Global dependencies followed by the platform's additional ones.
  ///
  /// Each package appears once: the first spec naming it wins, so a global
  /// pin takes precedence over a platform entry for the same package.
  pub fn dependencies_for(&self, platform: PlatformKey) -> Vec<DependencySpec> {
    let extra = self.platform_entry(platform).map(|p| p.dependencies.as_slice()).unwrap_or_default();
    let mut out: Vec<DependencySpec> = Vec::new();
    for raw in self.config.packages.dependencies.iter().chain(extra) {
      let spec = DependencySpec::parse(raw);
      match out.iter().find(|s| s.name == spec.name) {
        Some(kept) => {
          if kept.raw != spec.raw {
            warn!(platform = %platform, kept = %kept.raw, dropped = %spec.raw, "duplicate dependency ignored");
          }
        }
        None => out.push(spec),
      }
    }
    out
  }

  /// Global resolution policy overlaid with the platform fragment.
  pub fn effective_policy(&self, platform: PlatformKey) -> ResolutionPolicy {
    let empty = ResolutionConfig::default();
    let fragment = self.platform_entry(platform).map(|p| &p.resolution).unwrap_or(&empty);
    policy::resolve(&self.config.packages.resolution, fragment)
  }

  /// Reason a package is skipped on this platform, if any.
  pub fn skip_reason(&self, name: &PackageName, platform: PlatformKey) -> Option<&str> {
    rule_for(&self.config.packages.skip, name, platform)
  }

  /// Reason a package must be built from source on this platform, if any.
  pub fn force_source_reason(&self, name: &PackageName, platform: PlatformKey) -> Option<&str> {
    rule_for(&self.config.packages.force_source, name, platform)
  }

  /// Global copy directives followed by the platform's.
  pub fn copy_files_for(&self, platform: PlatformKey) -> Vec<CopyFile> {
    let mut out = self.config.packages.copy_files.clone();
    if let Some(entry) = self.platform_entry(platform) {
      out.extend(entry.copy_files.iter().cloned());
    }
    out
  }

  pub fn compatibility_tags(&self, platform: PlatformKey) -> &[String] {
    self
      .platform_entry(platform)
      .map(|p| p.compatibility_tags.as_slice())
      .unwrap_or_default()
  }
}

fn rule_for<'a>(rules: &'a RuleMap, name: &PackageName, platform: PlatformKey) -> Option<&'a str> {
  rules
    .iter()
    .find(|(pkg, _)| PackageName::new(pkg) == *name)
    .and_then(|(_, by_platform)| by_platform.get(&platform))
    .map(String::as_str)
}
