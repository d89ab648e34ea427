//! macOS: `file` to find Mach-O binaries, `otool -L` to list linked
//! libraries, `install_name_tool` to rewrite load commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use super::{
  BinaryRelocationRecord, ConsolidateError, ConsolidateOptions, ConsolidationReport, LibraryTools,
  SystemLibraries, place_library, prepare_lib_dir,
};
use crate::layout::DistLayout;
use crate::platform::Os;
use crate::process::{ToolOutput, run_tool};
use crate::util::paths::{is_within, loader_path, relative_path};

/// `file` + `otool` + `install_name_tool`.
#[derive(Debug, Clone)]
pub struct MachOTools {
  file: String,
  otool: String,
  install_name_tool: String,
  timeout: Option<Duration>,
}

impl MachOTools {
  pub fn new(timeout: Option<Duration>) -> Self {
    Self {
      file: "file".to_string(),
      otool: "otool".to_string(),
      install_name_tool: "install_name_tool".to_string(),
      timeout,
    }
  }

  pub fn with_programs(
    mut self,
    file: impl Into<String>,
    otool: impl Into<String>,
    install_name_tool: impl Into<String>,
  ) -> Self {
    self.file = file.into();
    self.otool = otool.into();
    self.install_name_tool = install_name_tool.into();
    self
  }

  async fn run(&self, program: &str, args: &[&str], binary: &Path) -> Result<ToolOutput, ConsolidateError> {
    let mut argv: Vec<&std::ffi::OsStr> = args.iter().map(std::ffi::OsStr::new).collect();
    argv.push(binary.as_os_str());

    let output = run_tool(program, argv, self.timeout).await?;
    if !output.success() {
      return Err(ConsolidateError::ToolFailed {
        tool: program.to_string(),
        binary: binary.to_path_buf(),
        code: output.code,
        message: output.error_line().to_string(),
      });
    }
    Ok(output)
  }
}

impl LibraryTools for MachOTools {
  async fn is_binary(&self, path: &Path) -> Result<bool, ConsolidateError> {
    let output = self.run(&self.file, &["-b"], path).await?;
    Ok(output.stdout.contains("Mach-O"))
  }

  async fn collect_dependencies(&self, binary: &Path) -> Result<Vec<PathBuf>, ConsolidateError> {
    let output = self.run(&self.otool, &["-L"], binary).await?;
    Ok(parse_otool_output(&output.stdout).into_iter().map(PathBuf::from).collect())
  }

  /// Change one load command. Mach-O binaries reference each library by its
  /// install name, so there is no search path to replace as a whole.
  async fn rewrite_load_path(&self, binary: &Path, old: Option<&str>, new: &str) -> Result<(), ConsolidateError> {
    let Some(old) = old else {
      return Err(ConsolidateError::UnsupportedRewrite {
        binary: binary.to_path_buf(),
      });
    };
    self.run(&self.install_name_tool, &["-change", old, new], binary).await?;
    debug!(binary = %binary.display(), old, new, "rewrote load command");
    Ok(())
  }
}

/// Parse `otool -L` output into install names, in order, without duplicates.
///
/// ```text
/// /opt/py/bin/python3:
///     /opt/homebrew/opt/openssl@3/lib/libssl.3.dylib (compatibility version 3.0.0, current version 3.0.0)
///     /usr/lib/libSystem.B.dylib (compatibility version 1.0.0, current version 1319.0.0)
/// ```
///
/// Unindented lines are file (or architecture) headers and are skipped.
pub fn parse_otool_output(output: &str) -> Vec<String> {
  let mut names: Vec<String> = Vec::new();

  for line in output.lines() {
    if !line.starts_with(char::is_whitespace) {
      continue;
    }
    let name = line.trim().split(" (").next().unwrap_or("").trim();
    if !name.is_empty() && !names.iter().any(|n| n == name) {
      names.push(name.to_string());
    }
  }

  names
}

/// Consolidate the libraries of the Mach-O executables in `bin/`.
///
/// Every non-system library of each executable is copied (first write wins)
/// and its load command rewritten to `@executable_path/<rel>/<basename>`.
pub async fn consolidate<T: LibraryTools>(
  tools: &T,
  layout: &DistLayout,
  options: ConsolidateOptions,
) -> Result<ConsolidationReport, ConsolidateError> {
  let lib_dir = prepare_lib_dir(layout)?;
  let bin_dir = layout.bin_dir();
  let canonical_bin = dunce::canonicalize(&bin_dir).map_err(|_| ConsolidateError::MissingInterpreter {
    root: layout.root().to_path_buf(),
  })?;
  let prefix = loader_path("@executable_path", &relative_path(&canonical_bin, &lib_dir));

  let mut entries: Vec<PathBuf> = fs::read_dir(&bin_dir)
    .map_err(io_error(&bin_dir))?
    .map(|entry| entry.map(|e| e.path()))
    .collect::<Result<_, _>>()
    .map_err(io_error(&bin_dir))?;
  entries.sort();

  let system = SystemLibraries::for_os(Os::MacOsx);
  let mut report = ConsolidationReport::default();

  for binary in entries {
    if !binary.symlink_metadata().map_err(io_error(&binary))?.is_file() {
      continue;
    }
    if !tools.is_binary(&binary).await? {
      debug!(path = %binary.display(), "skipping non-Mach-O file");
      continue;
    }

    for dep in tools.collect_dependencies(&binary).await? {
      if system.is_system(&dep) || is_within(&dep, &lib_dir) {
        continue;
      }
      place_library(&binary, &dep, &lib_dir)?.record(&mut report);

      if options.relocate {
        let name = dep.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let new = format!("{}/{}", prefix, name);
        let old = dep.to_string_lossy().into_owned();
        tools.rewrite_load_path(&binary, Some(&old), &new).await?;
        report.relocations.push(BinaryRelocationRecord {
          binary: binary.clone(),
          old_load_path: Some(old),
          new_load_path: new,
        });
      }
    }
  }

  info!(
    copied = report.copied.len(),
    reused = report.reused.len(),
    relocated = report.relocations.len(),
    "consolidation finished"
  );
  Ok(report)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConsolidateError {
  let path = path.to_path_buf();
  move |source| ConsolidateError::Io { path, source }
}
