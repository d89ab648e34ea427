mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, CheckArgs, ConsolidateArgs, PlanArgs};
use output::print_error;

/// pyport - build portable, relocatable Python distributions
#[derive(Parser)]
#[command(name = "pyport")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Acquire packages, consolidate native libraries, and place files
  Build(BuildArgs),

  /// Show what a build would do for a platform, without running anything
  Plan(PlanArgs),

  /// Bundle and relocate the native libraries of an install tree
  Consolidate(ConsolidateArgs),

  /// Run the native import checker with a built interpreter
  Check(CheckArgs),

  /// Display host platform information
  Info,
}

impl Commands {
  /// Whether the command's config asks for debug logging.
  ///
  /// Read before logging is set up, so load problems are ignored here and
  /// reported by the command itself.
  fn config_enables_logging(&self) -> bool {
    let (config, variant) = match self {
      Commands::Build(args) => (&args.config, args.variant.as_deref()),
      Commands::Plan(args) => (&args.config, args.variant.as_deref()),
      _ => return false,
    };
    pyport_lib::config::load_merged(config, variant)
      .map(|merged| merged.logging_enabled())
      .unwrap_or(false)
  }
}

/// `RUST_LOG` if set, otherwise `debug` or `info`.
fn env_filter(debug: bool) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let debug = cli.verbose || cli.command.config_enables_logging();
  tracing_subscriber::fmt()
    .with_env_filter(env_filter(debug))
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build(args) => cmd::cmd_build(args),
    Commands::Plan(args) => cmd::cmd_plan(args),
    Commands::Consolidate(args) => cmd::cmd_consolidate(args),
    Commands::Check(args) => cmd::cmd_check(args),
    Commands::Info => {
      cmd::cmd_info();
      Ok(())
    }
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!("{:#}", err);
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
