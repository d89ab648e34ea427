//! The build pipeline.
//!
//! One [`BuildContext`] is threaded through every step:
//!
//! 1. acquire every dependency for the target platform
//! 2. consolidate native libraries of the interpreter tree
//! 3. place `copyFiles`
//! 4. optionally run the native import check

mod types;

pub use types::*;

use std::fs;

use tracing::info;

use crate::acquire::{Acquirer, Downloader, plan_acquisition};
use crate::checker::run_import_check;
use crate::consolidate::{ConsolidateOptions, Consolidator};
use crate::layout::place_copy_files;

/// Run a build.
///
/// # Arguments
///
/// * `ctx` - Immutable build context
/// * `downloader` - Package downloader, normally [`BuildContext::downloader`]
/// * `options` - Which optional steps to run
///
/// # Returns
///
/// A [`BuildReport`] with the outcome of every step. Any error aborts the
/// remaining steps; nothing is rolled back.
pub async fn run_build<D: Downloader>(
  ctx: &BuildContext,
  downloader: &D,
  options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
  info!(
    platform = %ctx.platform,
    root = %ctx.layout.root().display(),
    python_version = %ctx.python_version,
    "starting build"
  );

  let packages = ctx.layout.packages_dir();
  fs::create_dir_all(&packages).map_err(|source| BuildError::Io { path: packages, source })?;

  let acquisition = Acquirer::new(&ctx.config, ctx.platform, downloader).acquire_all().await?;

  let consolidation = if options.consolidate {
    let consolidator = Consolidator::for_platform(ctx.platform, ctx.timeout);
    let report = consolidator
      .run(
        &ctx.layout,
        ConsolidateOptions {
          relocate: options.relocate,
        },
      )
      .await?;
    Some(report)
  } else {
    info!("library consolidation disabled");
    None
  };

  let placed_files = place_copy_files(
    &ctx.config.copy_files_for(ctx.platform),
    &ctx.config_dir,
    &ctx.layout,
    ctx.platform.os,
    &ctx.python_version,
  )?;

  let import_check_passed = match &options.check {
    Some(check) => {
      let python = ctx
        .layout
        .python_executable()
        .ok_or_else(|| BuildError::MissingInterpreter {
          root: ctx.layout.root().to_path_buf(),
        })?;
      run_import_check(&python, &check.script, check.whitelist.as_deref(), ctx.timeout).await?;
      true
    }
    None => false,
  };

  info!(
    platform = %ctx.platform,
    packages = acquisition.done().count(),
    skipped = acquisition.skipped().count(),
    files = placed_files.len(),
    "build complete"
  );

  Ok(BuildReport {
    platform: ctx.platform,
    acquisition,
    consolidation,
    placed_files,
    import_check_passed,
  })
}

/// Describe what [`run_build`] would do, without touching the filesystem or
/// running any tool.
pub fn plan_build(ctx: &BuildContext) -> BuildPlan {
  let copy_files = ctx
    .config
    .copy_files_for(ctx.platform)
    .into_iter()
    .map(|directive| PlannedCopy {
      from: ctx.config_dir.join(&directive.from),
      to: ctx
        .layout
        .resolve_destination(&directive.to, ctx.platform.os, &ctx.python_version),
    })
    .collect();

  let consolidation = match Consolidator::for_platform(ctx.platform, None) {
    Consolidator::Elf(_) => "elf",
    Consolidator::MachO(_) => "macho",
    Consolidator::Unsupported(_) => "none",
  };

  BuildPlan {
    platform: ctx.platform,
    policy: ctx.config.effective_policy(ctx.platform),
    packages: plan_acquisition(&ctx.config, ctx.platform),
    copy_files,
    consolidation,
  }
}
