//! Linux: `ldd` to list dependencies, `patchelf` to set the rpath.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{
  BinaryRelocationRecord, ConsolidateError, ConsolidateOptions, ConsolidationReport, LibraryTools, Placed,
  SystemLibraries, place_library, prepare_lib_dir,
};
use crate::layout::DistLayout;
use crate::platform::Os;
use crate::process::run_tool;
use crate::util::paths::{is_within, loader_path, relative_path};

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Printed by `ldd` for static binaries and non-ELF input.
const NOT_DYNAMIC: &str = "not a dynamic executable";

/// `ldd` + `patchelf`.
#[derive(Debug, Clone)]
pub struct ElfTools {
  ldd: String,
  patchelf: String,
  timeout: Option<Duration>,
}

impl ElfTools {
  pub fn new(timeout: Option<Duration>) -> Self {
    Self {
      ldd: "ldd".to_string(),
      patchelf: "patchelf".to_string(),
      timeout,
    }
  }

  /// Use different executables for the dependency lister and rpath editor.
  pub fn with_programs(mut self, ldd: impl Into<String>, patchelf: impl Into<String>) -> Self {
    self.ldd = ldd.into();
    self.patchelf = patchelf.into();
    self
  }

  async fn patchelf(&self, binary: &Path, args: &[&str]) -> Result<(), ConsolidateError> {
    let mut argv: Vec<&std::ffi::OsStr> = args.iter().map(std::ffi::OsStr::new).collect();
    argv.push(binary.as_os_str());

    let output = run_tool(&self.patchelf, argv, self.timeout).await?;
    if !output.success() {
      return Err(ConsolidateError::ToolFailed {
        tool: self.patchelf.clone(),
        binary: binary.to_path_buf(),
        code: output.code,
        message: output.error_line().to_string(),
      });
    }
    Ok(())
  }
}

impl LibraryTools for ElfTools {
  async fn is_binary(&self, path: &Path) -> Result<bool, ConsolidateError> {
    let mut file = match tokio::fs::File::open(path).await {
      Ok(file) => file,
      Err(source) => {
        return Err(ConsolidateError::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic).await {
      Ok(_) => Ok(magic == ELF_MAGIC),
      Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
      Err(source) => Err(ConsolidateError::Io {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  async fn collect_dependencies(&self, binary: &Path) -> Result<Vec<PathBuf>, ConsolidateError> {
    let output = run_tool(&self.ldd, [binary.as_os_str()], self.timeout).await?;

    if !output.success() {
      if output.stderr.contains(NOT_DYNAMIC) || output.stdout.contains(NOT_DYNAMIC) {
        debug!(binary = %binary.display(), "not a dynamic executable");
        return Ok(Vec::new());
      }
      return Err(ConsolidateError::ToolFailed {
        tool: self.ldd.clone(),
        binary: binary.to_path_buf(),
        code: output.code,
        message: output.error_line().to_string(),
      });
    }

    let listing = parse_ldd_output(&output.stdout);
    if let Some(library) = listing.missing.into_iter().next() {
      return Err(ConsolidateError::MissingLibrary {
        binary: binary.to_path_buf(),
        library,
      });
    }
    Ok(listing.paths)
  }

  /// `old` is ignored: an ELF file has one search path, which is replaced.
  async fn rewrite_load_path(&self, binary: &Path, _old: Option<&str>, new: &str) -> Result<(), ConsolidateError> {
    self.patchelf(binary, &["--remove-rpath"]).await?;
    self.patchelf(binary, &["--set-rpath", new]).await?;
    debug!(binary = %binary.display(), rpath = new, "set rpath");
    Ok(())
  }
}

/// Parsed `ldd` output.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LddListing {
  /// Resolved absolute library paths, in listing order.
  pub paths: Vec<PathBuf>,
  /// Sonames the loader could not resolve.
  pub missing: Vec<String>,
}

/// Parse `ldd` output.
///
/// ```text
///   linux-vdso.so.1 (0x00007ffc...)
///   libfoo.so.1 => /usr/lib/custom/libfoo.so.1 (0x00007f...)
///   libbar.so.2 => not found
///   /lib64/ld-linux-x86-64.so.2 (0x00007f...)
/// ```
pub fn parse_ldd_output(output: &str) -> LddListing {
  let mut listing = LddListing::default();

  for line in output.lines() {
    let line = line.trim();

    if let Some((name, target)) = line.split_once("=>") {
      let target = target.trim();
      if target.starts_with("not found") {
        listing.missing.push(name.trim().to_string());
      } else if let Some(path) = target.split_whitespace().next().filter(|p| p.starts_with('/')) {
        listing.paths.push(PathBuf::from(path));
      }
    } else if let Some(path) = line.split_whitespace().next().filter(|p| p.starts_with('/')) {
      listing.paths.push(PathBuf::from(path));
    }
  }

  listing
}

/// Interpreter executable first, then every regular `*.so*` file under the
/// install root in sorted order, keeping only ELF files.
async fn discover_roots<T: LibraryTools>(tools: &T, layout: &DistLayout) -> Result<Vec<PathBuf>, ConsolidateError> {
  let exe = layout
    .python_executable()
    .ok_or_else(|| ConsolidateError::MissingInterpreter {
      root: layout.root().to_path_buf(),
    })?;

  let mut candidates = vec![exe.clone()];
  for entry in WalkDir::new(layout.root()).sort_by_file_name() {
    let entry = entry?;
    if !entry.file_type().is_file() || !entry.file_name().to_string_lossy().contains(".so") {
      continue;
    }
    if entry.path() != exe {
      candidates.push(entry.into_path());
    }
  }

  let mut roots = Vec::with_capacity(candidates.len());
  for candidate in candidates {
    if tools.is_binary(&candidate).await? {
      roots.push(candidate);
    } else {
      debug!(path = %candidate.display(), "skipping non-ELF file");
    }
  }
  Ok(roots)
}

/// Consolidate the libraries of a Linux install tree.
pub async fn consolidate<T: LibraryTools>(
  tools: &T,
  layout: &DistLayout,
  options: ConsolidateOptions,
) -> Result<ConsolidationReport, ConsolidateError> {
  let lib_dir = prepare_lib_dir(layout)?;
  match layout.extension_dir() {
    Some(dir) => debug!(dir = %dir.display(), "native extension directory"),
    None => debug!("no native extension directory found"),
  }

  let roots = discover_roots(tools, layout).await?;
  info!(roots = roots.len(), "scanning native binaries");

  let system = SystemLibraries::for_os(Os::Linux);
  let mut seen = HashSet::new();
  // (library, first binary that needed it)
  let mut closure: Vec<(PathBuf, PathBuf)> = Vec::new();

  for root in &roots {
    for dep in tools.collect_dependencies(root).await? {
      if system.is_system(&dep) || is_within(&dep, &lib_dir) {
        continue;
      }
      if seen.insert(dep.clone()) {
        closure.push((dep, root.clone()));
      }
    }
  }

  let mut report = ConsolidationReport::default();
  let mut to_relocate = roots;
  for (library, binary) in &closure {
    let placed = place_library(binary, library, &lib_dir)?;
    if let Placed::Copied(path) = &placed {
      to_relocate.push(path.clone());
    }
    placed.record(&mut report);
  }

  if options.relocate {
    for binary in to_relocate {
      let dir = binary.parent().unwrap_or(Path::new("."));
      let dir = dunce::canonicalize(dir).map_err(|source| ConsolidateError::Io {
        path: dir.to_path_buf(),
        source,
      })?;
      let rpath = loader_path("$ORIGIN", &relative_path(&dir, &lib_dir));
      tools.rewrite_load_path(&binary, None, &rpath).await?;
      report.relocations.push(BinaryRelocationRecord {
        binary,
        old_load_path: None,
        new_load_path: rpath,
      });
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
