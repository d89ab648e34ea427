//! Dry-run view of the acquisition state machine.
//!
//! Computes, without invoking the downloader, which path each dependency
//! would take and what happens if its wheel turns out to be missing.

use serde::Serialize;

use super::types::Rationale;
use crate::config::MergedConfig;
use crate::platform::PlatformKey;

/// What happens when no wheel is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingWheel {
  /// Source download is attempted.
  FallBackToSource(Rationale),
  /// Build aborts (`strictMissing`).
  Abort(Rationale),
  /// Package is skipped with a warning.
  Skip(Rationale),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "path")]
pub enum PlannedPath {
  Skip { rationale: Rationale },
  ForceSource { rationale: Rationale },
  BinaryFirst { if_missing: MissingWheel, supplementary_tags: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAcquisition {
  pub spec: String,
  pub package: String,
  #[serde(flatten)]
  pub path: PlannedPath,
}

/// Plan the acquisition of every dependency on `platform`.
pub fn plan_acquisition(config: &MergedConfig, platform: PlatformKey) -> Vec<PlannedAcquisition> {
  let policy = config.effective_policy(platform);
  let tags = config.compatibility_tags(platform);

  config
    .dependencies_for(platform)
    .into_iter()
    .map(|spec| {
      let path = if let Some(reason) = config.skip_reason(&spec.name, platform) {
        PlannedPath::Skip {
          rationale: Rationale::SkipRule(reason.to_string()),
        }
      } else if let Some(reason) = config.force_source_reason(&spec.name, platform) {
        PlannedPath::ForceSource {
          rationale: Rationale::ForceSourceRule(reason.to_string()),
        }
      } else if policy.forces_source(&spec.name) {
        PlannedPath::ForceSource {
          rationale: Rationale::ForceNoBinaryList,
        }
      } else {
        let no_source = if policy.forbids_source(&spec.name) {
          Some(Rationale::OnlyBinaryList)
        } else if !policy.allows_source(&spec.name) {
          Some(Rationale::SourceNotPermitted)
        } else {
          None
        };
        let if_missing = match no_source {
          Some(rationale) if policy.strict_missing => MissingWheel::Abort(rationale),
          Some(rationale) => MissingWheel::Skip(rationale),
          None if policy.allow_source_all => MissingWheel::FallBackToSource(Rationale::AllowSourceAll),
          None => MissingWheel::FallBackToSource(Rationale::AllowSourceList),
        };
        PlannedPath::BinaryFirst {
          if_missing,
          supplementary_tags: tags.to_vec(),
        }
      };

      PlannedAcquisition {
        spec: spec.raw,
        package: spec.name.to_string(),
        path,
      }
    })
    .collect()
}
