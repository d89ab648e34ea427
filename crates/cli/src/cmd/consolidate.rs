//! Implementation of the `pyport consolidate` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use pyport_lib::consolidate::{ConsolidateOptions, Consolidator};
use pyport_lib::layout::DistLayout;
use pyport_lib::platform::PlatformKey;

use crate::output::{OutputFormat, print_json, print_mapping, print_stat, print_success};

#[derive(Args, Debug)]
pub struct ConsolidateArgs {
  /// Root of the interpreter tree
  pub install_root: PathBuf,

  /// Object format to process, by platform key (default: host)
  #[arg(long)]
  pub platform: Option<PlatformKey>,

  /// Copy libraries but leave load paths untouched
  #[arg(long)]
  pub no_relocate: bool,

  /// Kill any single tool that runs longer than this (e.g. "30s")
  #[arg(long, value_parser = humantime::parse_duration)]
  pub timeout: Option<Duration>,

  /// Show every relocated binary
  #[arg(short = 'l', long)]
  pub list: bool,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

pub fn cmd_consolidate(args: ConsolidateArgs) -> Result<()> {
  let platform = super::target_platform(args.platform)?;
  let root = dunce::canonicalize(&args.install_root)
    .with_context(|| format!("Install root not found: {}", args.install_root.display()))?;
  let layout = DistLayout::new(root);

  let consolidator = Consolidator::for_platform(platform, args.timeout);
  let options = ConsolidateOptions {
    relocate: !args.no_relocate,
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(consolidator.run(&layout, options))
    .context("Consolidation failed")?;

  if args.output.is_json() {
    return print_json(&report);
  }

  print_success("Consolidation complete!");
  print_stat("Libraries copied", &report.copied.len().to_string());
  print_stat("Already present", &report.reused.len().to_string());
  print_stat("Binaries relocated", &report.relocations.len().to_string());

  if args.list && !report.relocations.is_empty() {
    println!();
    for record in &report.relocations {
      let binary = record.binary.display().to_string();
      let target = match &record.old_load_path {
        Some(old) => format!("{} ({})", record.new_load_path, old),
        None => record.new_load_path.clone(),
      };
      print_mapping(&binary, &target);
    }
  }

  Ok(())
}
