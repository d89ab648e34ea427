//! Implementation of the `pyport check` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use pyport_lib::checker::run_import_check;

use crate::output::print_success;

#[derive(Args, Debug)]
pub struct CheckArgs {
  /// Interpreter of the built distribution
  pub python: PathBuf,

  /// Checker script to run with it
  pub script: PathBuf,

  /// Whitelist of expected import failures
  #[arg(long)]
  pub whitelist: Option<PathBuf>,

  /// Kill the checker if it runs longer than this (e.g. "10m")
  #[arg(long, value_parser = humantime::parse_duration)]
  pub timeout: Option<Duration>,
}

pub fn cmd_check(args: CheckArgs) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let output = rt
    .block_on(run_import_check(
      &args.python,
      &args.script,
      args.whitelist.as_deref(),
      args.timeout,
    ))
    .context("Native import check failed")?;

  print!("{}", output.stdout);
  print_success("All native modules imported");
  Ok(())
}
