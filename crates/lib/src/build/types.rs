use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::acquire::{AcquireError, AcquisitionReport, PipDownloader, PlannedAcquisition};
use crate::checker::CheckerError;
use crate::config::{ConfigError, MergedConfig};
use crate::consolidate::{ConsolidateError, ConsolidationReport};
use crate::layout::{DistLayout, LayoutError};
use crate::platform::{PlatformError, PlatformKey};
use crate::policy::ResolutionPolicy;

/// Errors that abort a build.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Platform(#[from] PlatformError),

  #[error("package acquisition failed")]
  Acquire(#[from] AcquireError),

  #[error("library consolidation failed")]
  Consolidate(#[from] ConsolidateError),

  #[error("copyFiles placement failed")]
  Layout(#[from] LayoutError),

  #[error(transparent)]
  Checker(#[from] CheckerError),

  #[error("no python executable found in {}", .root.display())]
  MissingInterpreter { root: PathBuf },

  #[error("I/O error at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Everything a build step may read. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct BuildContext {
  pub config: MergedConfig,
  pub platform: PlatformKey,
  pub layout: DistLayout,
  /// Directory `copyFiles` sources are resolved against.
  pub config_dir: PathBuf,
  /// `major.minor`, used for `{site-packages}`.
  pub python_version: String,
  /// Per tool invocation.
  pub timeout: Option<Duration>,
}

impl BuildContext {
  pub fn new(config: MergedConfig, platform: PlatformKey, layout: DistLayout, config_dir: impl Into<PathBuf>) -> Self {
    Self {
      python_version: config.python_version().to_string(),
      timeout: config.timeout(),
      config,
      platform,
      layout,
      config_dir: config_dir.into(),
    }
  }

  /// Load and merge the config files and build a context around them.
  ///
  /// `copyFiles` sources resolve against the base config's directory.
  pub fn load(
    base: &Path,
    variant: Option<&Path>,
    platform: PlatformKey,
    layout: DistLayout,
  ) -> Result<Self, BuildError> {
    let config = crate::config::load_merged(base, variant)?;
    let config_dir = match base.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
      _ => PathBuf::from("."),
    };
    Ok(Self::new(config, platform, layout, config_dir))
  }

  /// The pip downloader this context describes.
  pub fn downloader(&self) -> PipDownloader {
    PipDownloader::new(self.config.python(), self.layout.packages_dir())
      .with_extra_index_urls(self.config.registries())
      .with_timeout(self.timeout)
  }
}

/// Native import check to run after the build.
#[derive(Debug, Clone)]
pub struct ImportCheck {
  pub script: PathBuf,
  pub whitelist: Option<PathBuf>,
}

/// Options for [`run_build`](super::run_build).
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub consolidate: bool,
  pub relocate: bool,
  pub check: Option<ImportCheck>,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      consolidate: true,
      relocate: true,
      check: None,
    }
  }
}

/// Result of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub platform: PlatformKey,
  pub acquisition: AcquisitionReport,
  /// `None` when consolidation was disabled.
  pub consolidation: Option<ConsolidationReport>,
  pub placed_files: Vec<PathBuf>,
  pub import_check_passed: bool,
}

/// A `copyFiles` directive with its destination resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCopy {
  pub from: PathBuf,
  pub to: PathBuf,
}

/// What a build would do, computed without side effects.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
  pub platform: PlatformKey,
  pub policy: ResolutionPolicy,
  pub packages: Vec<PlannedAcquisition>,
  pub copy_files: Vec<PlannedCopy>,
  /// `elf`, `macho`, or `none`.
  pub consolidation: &'static str,
}
