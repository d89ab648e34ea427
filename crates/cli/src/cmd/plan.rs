//! Implementation of the `pyport plan` command.
//!
//! Shows, per package, which acquisition path a build would take on a
//! platform and what happens if no wheel exists. Runs no tools.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pyport_lib::acquire::{MissingWheel, PlannedPath};
use pyport_lib::build::{BuildContext, plan_build};
use pyport_lib::layout::DistLayout;
use pyport_lib::platform::PlatformKey;

use crate::output::{OutputFormat, print_info, print_json, print_mapping, print_stat};

#[derive(Args, Debug)]
pub struct PlanArgs {
  /// Base configuration file
  #[arg(short, long)]
  pub config: PathBuf,

  /// Variant configuration merged over the base
  #[arg(long)]
  pub variant: Option<PathBuf>,

  /// Target platform key, e.g. macosx-aarch64 (default: host)
  #[arg(long)]
  pub platform: Option<PlatformKey>,

  /// Install root used to resolve copyFiles destinations
  #[arg(long, default_value = ".")]
  pub install_root: PathBuf,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

pub fn cmd_plan(args: PlanArgs) -> Result<()> {
  let platform = super::target_platform(args.platform)?;
  let ctx = BuildContext::load(
    &args.config,
    args.variant.as_deref(),
    platform,
    DistLayout::new(&args.install_root),
  )
  .with_context(|| format!("Failed to load config: {}", args.config.display()))?;

  let plan = plan_build(&ctx);

  if args.output.is_json() {
    return print_json(&plan);
  }

  print_info(&format!("Plan for {}", plan.platform));
  print_stat("Python", &ctx.python_version);
  print_stat("Consolidation", plan.consolidation);
  print_stat("Strict missing", &plan.policy.strict_missing.to_string());
  print_stat("Allow source (all)", &plan.policy.allow_source_all.to_string());

  println!();
  println!("Packages:");
  for package in &plan.packages {
    let path = match &package.path {
      PlannedPath::Skip { rationale } => format!("skip ({})", rationale),
      PlannedPath::ForceSource { rationale } => format!("source ({})", rationale),
      PlannedPath::BinaryFirst {
        if_missing,
        supplementary_tags,
      } => {
        let fallback = match if_missing {
          MissingWheel::FallBackToSource(r) => format!("else source ({})", r),
          MissingWheel::Abort(r) => format!("else abort ({})", r),
          MissingWheel::Skip(r) => format!("else skip ({})", r),
        };
        if supplementary_tags.is_empty() {
          format!("binary, {}", fallback)
        } else {
          format!("binary + {}, {}", supplementary_tags.join(", "), fallback)
        }
      }
    };
    print_mapping(&package.spec, &path);
  }

  if !plan.copy_files.is_empty() {
    println!();
    println!("Files:");
    for copy in &plan.copy_files {
      print_mapping(&copy.from.display().to_string(), &copy.to.display().to_string());
    }
  }

  Ok(())
}
