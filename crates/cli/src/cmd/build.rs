//! Implementation of the `pyport build` command.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use pyport_lib::acquire::{DownloadMode, Outcome};
use pyport_lib::build::{BuildContext, BuildOptions, BuildReport, ImportCheck, run_build};
use pyport_lib::layout::DistLayout;
use pyport_lib::platform::PlatformKey;

use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, print_warning};

#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Base configuration file
  #[arg(short, long)]
  pub config: PathBuf,

  /// Variant configuration merged over the base
  #[arg(long)]
  pub variant: Option<PathBuf>,

  /// Root of the interpreter tree to build into
  #[arg(long)]
  pub install_root: PathBuf,

  /// Target platform key, e.g. linux-x64 (default: host)
  #[arg(long)]
  pub platform: Option<PlatformKey>,

  /// Skip native library consolidation
  #[arg(long)]
  pub no_consolidate: bool,

  /// Copy libraries but leave load paths untouched
  #[arg(long)]
  pub no_relocate: bool,

  /// Run the native import checker after the build
  #[arg(long, requires = "checker")]
  pub check: bool,

  /// Checker script run by the built interpreter
  #[arg(long)]
  pub checker: Option<PathBuf>,

  /// Whitelist of expected import failures
  #[arg(long, requires = "check")]
  pub whitelist: Option<PathBuf>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

/// Execute the build command.
///
/// Loads and merges the configs, then runs the pipeline: package
/// acquisition, library consolidation, copyFiles placement, and optionally
/// the native import check. Prints a summary of what happened.
pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let start = Instant::now();
  let platform = super::target_platform(args.platform)?;

  fs::create_dir_all(&args.install_root)
    .with_context(|| format!("Failed to create install root: {}", args.install_root.display()))?;
  let root = dunce::canonicalize(&args.install_root)
    .with_context(|| format!("Failed to resolve install root: {}", args.install_root.display()))?;

  let ctx = BuildContext::load(&args.config, args.variant.as_deref(), platform, DistLayout::new(root))
    .with_context(|| format!("Failed to load config: {}", args.config.display()))?;

  let options = BuildOptions {
    consolidate: !args.no_consolidate,
    relocate: !args.no_relocate,
    check: match (args.check, args.checker) {
      (true, Some(script)) => Some(ImportCheck {
        script,
        whitelist: args.whitelist,
      }),
      _ => None,
    },
  };

  let downloader = ctx.downloader();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(run_build(&ctx, &downloader, &options))
    .context("Build failed")?;

  if args.output.is_json() {
    print_json(&report)?;
  } else {
    print_summary(&report);
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}

fn print_summary(report: &BuildReport) {
  let acquisition = &report.acquisition;
  let count_mode = |mode: DownloadMode| acquisition.done().filter(|r| r.outcome == Outcome::Done(mode)).count();

  for record in acquisition.skipped() {
    print_warning(&format!("Skipped {}: {}", record.spec, record.rationale));
  }
  for (record, failure) in acquisition.supplementary_failures() {
    print_warning(&format!(
      "No {} wheel for {} (exit code {})",
      failure.platform_tag, record.spec, failure.code
    ));
  }

  println!();
  print_success("Build complete!");
  print_stat("Platform", &report.platform.to_string());
  print_stat("Binary wheels", &count_mode(DownloadMode::Binary).to_string());
  print_stat("Source packages", &count_mode(DownloadMode::Source).to_string());
  print_stat("Skipped", &acquisition.skipped().count().to_string());

  match &report.consolidation {
    Some(consolidation) => {
      print_stat("Libraries copied", &consolidation.copied.len().to_string());
      print_stat("Binaries relocated", &consolidation.relocations.len().to_string());
    }
    None => print_stat("Consolidation", "disabled"),
  }

  print_stat("Files placed", &report.placed_files.len().to_string());
  if report.import_check_passed {
    print_stat("Import check", "passed");
  }
}
