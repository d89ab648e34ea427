//! Package acquisition.
//!
//! Walks the effective dependency list for one platform and fetches each
//! package as a binary wheel or a source distribution, following the merged
//! skip/forceSource rules and the resolution policy:
//!
//! 1. skip rule for `(package, platform)` -> Skipped, downloader not called
//! 2. forceSource rule or `forceNoBinaryList` -> source only, failure is fatal
//! 3. binary only; on success also fetch supplementary platform tags
//! 4. binary failed: `onlyBinaryList` or no source permission -> missing
//! 5. otherwise source only; failure -> missing
//!
//! "Missing" is fatal under `strictMissing` and a logged skip otherwise.

pub mod downloader;
pub mod plan;
pub mod types;

use tracing::{error, info, warn};

use crate::config::MergedConfig;
use crate::package::DependencySpec;
use crate::platform::PlatformKey;
use crate::policy::ResolutionPolicy;

pub use downloader::{DownloadError, DownloadMode, DownloadRequest, Downloader, PipDownloader};
pub use plan::{MissingWheel, PlannedAcquisition, PlannedPath, plan_acquisition};
pub use types::{AcquireError, AcquisitionRecord, AcquisitionReport, Outcome, Rationale, SupplementaryFailure};

/// Acquisition engine for one platform.
///
/// Holds only borrowed, immutable state; one engine is used per build.
#[derive(Debug)]
pub struct Acquirer<'a, D> {
  config: &'a MergedConfig,
  platform: PlatformKey,
  policy: ResolutionPolicy,
  downloader: &'a D,
}

impl<'a, D: Downloader> Acquirer<'a, D> {
  pub fn new(config: &'a MergedConfig, platform: PlatformKey, downloader: &'a D) -> Self {
    Self {
      config,
      platform,
      policy: config.effective_policy(platform),
      downloader,
    }
  }

  /// Acquire every dependency for the platform, in order.
  ///
  /// Stops at the first fatal error; soft failures are recorded as skips.
  pub async fn acquire_all(&self) -> Result<AcquisitionReport, AcquireError> {
    let dependencies = self.config.dependencies_for(self.platform);
    info!(
      platform = %self.platform,
      count = dependencies.len(),
      "acquiring packages"
    );

    let mut report = AcquisitionReport::default();
    for spec in &dependencies {
      let record = self.acquire(spec).await?;
      report.records.push(record);
    }

    info!(
      platform = %self.platform,
      done = report.done().count(),
      skipped = report.skipped().count(),
      "package acquisition finished"
    );
    Ok(report)
  }

  /// Run the acquisition state machine for a single dependency.
  pub async fn acquire(&self, spec: &DependencySpec) -> Result<AcquisitionRecord, AcquireError> {
    let platform = self.platform;

    if let Some(reason) = self.config.skip_reason(&spec.name, platform) {
      let rationale = Rationale::SkipRule(reason.to_string());
      info!(package = %spec.name, platform = %platform, rationale = %rationale, "skipping package");
      return Ok(self.record(spec, Outcome::Skipped, rationale));
    }

    let forced = match self.config.force_source_reason(&spec.name, platform) {
      Some(reason) => Some(Rationale::ForceSourceRule(reason.to_string())),
      None if self.policy.forces_source(&spec.name) => Some(Rationale::ForceNoBinaryList),
      None => None,
    };

    if let Some(rationale) = forced {
      info!(package = %spec.name, platform = %platform, rationale = %rationale, "forcing source download");
      return match self.download(spec, DownloadMode::Source, None).await {
        Ok(()) => Ok(self.done(spec, DownloadMode::Source, rationale)),
        Err(DownloadError::Failed { code, message }) => {
          error!(package = %spec.name, platform = %platform, rationale = %rationale, code, "forced source download failed");
          Err(self.failed(spec, DownloadMode::Source, code, message))
        }
        Err(DownloadError::Tool(err)) => Err(err.into()),
      };
    }

    match self.download(spec, DownloadMode::Binary, None).await {
      Ok(()) => {
        let mut record = self.done(spec, DownloadMode::Binary, Rationale::BinaryAvailable);
        record.supplementary_failures = self.acquire_supplementary(spec).await?;
        return Ok(record);
      }
      Err(DownloadError::Failed { code, message }) => {
        info!(package = %spec.name, platform = %platform, code, message = %message, "binary wheel unavailable");
      }
      Err(DownloadError::Tool(err)) => return Err(err.into()),
    }

    if self.policy.forbids_source(&spec.name) {
      return self.missing(spec, Rationale::OnlyBinaryList);
    }
    if !self.policy.allows_source(&spec.name) {
      return self.missing(spec, Rationale::SourceNotPermitted);
    }

    let rationale = if self.policy.allow_source_all {
      Rationale::AllowSourceAll
    } else {
      Rationale::AllowSourceList
    };
    info!(package = %spec.name, platform = %platform, rationale = %rationale, "falling back to source download");

    match self.download(spec, DownloadMode::Source, None).await {
      Ok(()) => Ok(self.done(spec, DownloadMode::Source, rationale)),
      Err(DownloadError::Failed { code, message }) => {
        if self.policy.strict_missing {
          error!(package = %spec.name, platform = %platform, rationale = %rationale, code, "source download failed (strictMissing)");
          Err(self.failed(spec, DownloadMode::Source, code, message))
        } else {
          warn!(package = %spec.name, platform = %platform, rationale = %rationale, code, "source download failed, skipping package");
          Ok(self.record(spec, Outcome::Skipped, rationale))
        }
      }
      Err(DownloadError::Tool(err)) => Err(err.into()),
    }
  }

  /// Fetch the extra wheels for older platform tags. Failures are surfaced
  /// in the record, never fatal unless the tool itself could not run.
  async fn acquire_supplementary(&self, spec: &DependencySpec) -> Result<Vec<SupplementaryFailure>, AcquireError> {
    let mut failures = Vec::new();
    for tag in self.config.compatibility_tags(self.platform) {
      match self.download(spec, DownloadMode::Binary, Some(tag)).await {
        Ok(()) => {
          info!(package = %spec.name, platform = %self.platform, tag = %tag, "supplementary wheel acquired");
        }
        Err(DownloadError::Failed { code, message }) => {
          warn!(package = %spec.name, platform = %self.platform, tag = %tag, code, "supplementary wheel unavailable");
          failures.push(SupplementaryFailure {
            platform_tag: tag.clone(),
            code,
            message,
          });
        }
        Err(DownloadError::Tool(err)) => return Err(err.into()),
      }
    }
    Ok(failures)
  }

  /// No permitted acquisition path is left for the package.
  fn missing(&self, spec: &DependencySpec, rationale: Rationale) -> Result<AcquisitionRecord, AcquireError> {
    if self.policy.strict_missing {
      error!(package = %spec.name, platform = %self.platform, rationale = %rationale, "package unavailable (strictMissing)");
      Err(AcquireError::PolicyViolation {
        package: spec.name.clone(),
        platform: self.platform,
        rationale,
      })
    } else {
      warn!(package = %spec.name, platform = %self.platform, rationale = %rationale, "package unavailable, skipping");
      Ok(self.record(spec, Outcome::Skipped, rationale))
    }
  }

  async fn download(&self, spec: &DependencySpec, mode: DownloadMode, tag: Option<&String>) -> Result<(), DownloadError> {
    let request = DownloadRequest {
      spec: spec.raw.clone(),
      package: spec.name.clone(),
      mode,
      platform_tag: tag.cloned(),
    };
    self.downloader.download(&request).await
  }

  fn done(&self, spec: &DependencySpec, mode: DownloadMode, rationale: Rationale) -> AcquisitionRecord {
    info!(package = %spec.name, platform = %self.platform, mode = %mode, rationale = %rationale, "package acquired");
    self.record(spec, Outcome::Done(mode), rationale)
  }

  fn failed(&self, spec: &DependencySpec, mode: DownloadMode, code: i32, message: String) -> AcquireError {
    AcquireError::Failed {
      package: spec.name.clone(),
      platform: self.platform,
      spec: spec.raw.clone(),
      mode,
      code,
      message,
    }
  }

  fn record(&self, spec: &DependencySpec, outcome: Outcome, rationale: Rationale) -> AcquisitionRecord {
    AcquisitionRecord {
      spec: spec.raw.clone(),
      package: spec.name.to_string(),
      platform: self.platform,
      outcome,
      rationale,
      supplementary_failures: Vec::new(),
    }
  }
}
