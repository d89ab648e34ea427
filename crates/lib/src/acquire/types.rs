//! Outcomes, rationales, and errors of package acquisition.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::downloader::DownloadMode;
use crate::package::PackageName;
use crate::platform::PlatformKey;
use crate::process::ToolError;

/// Why the engine took the path it took for a package.
///
/// The `Display` form is what gets logged and is the build's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "rule", content = "detail")]
pub enum Rationale {
  /// `packages.skip` rule, with its configured reason.
  SkipRule(String),
  /// `packages.forceSource` rule, with its configured reason.
  ForceSourceRule(String),
  /// Named in `resolution.forceNoBinaryList`.
  ForceNoBinaryList,
  /// A wheel was found on the first try.
  BinaryAvailable,
  /// No wheel; named in `resolution.onlyBinaryList`.
  OnlyBinaryList,
  /// No wheel; neither `allowSourceAll` nor `allowSourceList` permits source.
  SourceNotPermitted,
  /// No wheel; source permitted by `allowSourceAll`.
  AllowSourceAll,
  /// No wheel; source permitted by `allowSourceList`.
  AllowSourceList,
}

impl fmt::Display for Rationale {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Rationale::SkipRule(reason) => write!(f, "skip rule: {}", reason),
      Rationale::ForceSourceRule(reason) => write!(f, "forceSource rule: {}", reason),
      Rationale::ForceNoBinaryList => f.write_str("policy forceNoBinaryList"),
      Rationale::BinaryAvailable => f.write_str("binary wheel available"),
      Rationale::OnlyBinaryList => f.write_str("policy onlyBinaryList forbids source fallback"),
      Rationale::SourceNotPermitted => f.write_str("policy does not permit source fallback (allowSourceAll/allowSourceList)"),
      Rationale::AllowSourceAll => f.write_str("source fallback permitted by policy allowSourceAll"),
      Rationale::AllowSourceList => f.write_str("source fallback permitted by policy allowSourceList"),
    }
  }
}

/// Terminal state of one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "via")]
pub enum Outcome {
  Done(DownloadMode),
  Skipped,
}

/// A supplementary wheel (older ABI tag) that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplementaryFailure {
  pub platform_tag: String,
  pub code: i32,
  pub message: String,
}

/// What happened to one dependency on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionRecord {
  pub spec: String,
  pub package: String,
  pub platform: PlatformKey,
  pub outcome: Outcome,
  pub rationale: Rationale,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub supplementary_failures: Vec<SupplementaryFailure>,
}

/// Result of acquiring a whole dependency list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionReport {
  pub records: Vec<AcquisitionRecord>,
}

impl AcquisitionReport {
  pub fn done(&self) -> impl Iterator<Item = &AcquisitionRecord> {
    self.records.iter().filter(|r| matches!(r.outcome, Outcome::Done(_)))
  }

  pub fn skipped(&self) -> impl Iterator<Item = &AcquisitionRecord> {
    self.records.iter().filter(|r| r.outcome == Outcome::Skipped)
  }

  pub fn supplementary_failures(&self) -> impl Iterator<Item = (&AcquisitionRecord, &SupplementaryFailure)> {
    self
      .records
      .iter()
      .flat_map(|r| r.supplementary_failures.iter().map(move |f| (r, f)))
  }
}

/// Fatal acquisition errors. Anything returned here aborts the build.
#[derive(Debug, Error)]
pub enum AcquireError {
  /// No permitted acquisition path and `strictMissing` is set.
  #[error("{package} on {platform}: no permitted acquisition path ({rationale})")]
  PolicyViolation {
    package: PackageName,
    platform: PlatformKey,
    rationale: Rationale,
  },

  /// The downloader failed on a path that has no further fallback.
  #[error("{package} on {platform}: {mode} download of '{spec}' failed with exit code {code}: {message}")]
  Failed {
    package: PackageName,
    platform: PlatformKey,
    spec: String,
    mode: DownloadMode,
    code: i32,
    message: String,
  },

  #[error(transparent)]
  Tool(#[from] ToolError),
}
