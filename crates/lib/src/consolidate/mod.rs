//! Native library consolidation.
//!
//! Finds the non-system shared libraries the interpreter tree links
//! against, copies them into the distribution's `lib/` directory, and
//! rewrites each binary's load paths so the tree works from any location.
//!
//! The object-format specific work (listing dependencies, editing load
//! commands) sits behind [`LibraryTools`]; [`Consolidator`] picks the
//! implementation for a platform once.

pub mod elf;
pub mod macho;
pub mod system;
pub mod types;

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::layout::DistLayout;
use crate::platform::{Os, PlatformKey};

pub use elf::ElfTools;
pub use macho::MachOTools;
pub use system::SystemLibraries;
pub use types::{BinaryRelocationRecord, ConsolidateError, ConsolidationReport};

/// Object-format tooling used by the consolidation algorithms.
pub trait LibraryTools {
  /// Whether `path` is a native binary this tooling can inspect.
  fn is_binary(&self, path: &Path) -> impl Future<Output = Result<bool, ConsolidateError>>;

  /// Absolute paths of the shared libraries `binary` loads.
  fn collect_dependencies(&self, binary: &Path) -> impl Future<Output = Result<Vec<PathBuf>, ConsolidateError>>;

  /// Point `binary` at `new`.
  ///
  /// With `old` set, only that one library reference is replaced; with
  /// `None`, the binary's whole search path is replaced; formats without one
  /// reject it.
  fn rewrite_load_path(
    &self,
    binary: &Path,
    old: Option<&str>,
    new: &str,
  ) -> impl Future<Output = Result<(), ConsolidateError>>;
}

#[derive(Debug, Clone, Copy)]
pub struct ConsolidateOptions {
  /// Rewrite load paths after copying. Turning this off only gathers libraries.
  pub relocate: bool,
}

impl Default for ConsolidateOptions {
  fn default() -> Self {
    Self { relocate: true }
  }
}

/// Consolidation strategy for one target OS.
#[derive(Debug, Clone)]
pub enum Consolidator {
  Elf(ElfTools),
  MachO(MachOTools),
  /// No consolidation step exists for this OS.
  Unsupported(Os),
}

impl Consolidator {
  pub fn for_platform(platform: PlatformKey, timeout: Option<Duration>) -> Self {
    match platform.os {
      Os::Linux => Consolidator::Elf(ElfTools::new(timeout)),
      Os::MacOsx => Consolidator::MachO(MachOTools::new(timeout)),
      Os::Windows => Consolidator::Unsupported(Os::Windows),
    }
  }

  pub async fn run(&self, layout: &DistLayout, options: ConsolidateOptions) -> Result<ConsolidationReport, ConsolidateError> {
    match self {
      Consolidator::Elf(tools) => elf::consolidate(tools, layout, options).await,
      Consolidator::MachO(tools) => macho::consolidate(tools, layout, options).await,
      Consolidator::Unsupported(os) => {
        info!(%os, "no library consolidation on this platform");
        Ok(ConsolidationReport::default())
      }
    }
  }
}

/// Result of placing one library into the lib dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placed {
  Copied(PathBuf),
  /// A library with the same basename was already there; nothing was written.
  AlreadyPresent(PathBuf),
}

impl Placed {
  fn record(self, report: &mut ConsolidationReport) {
    match self {
      Placed::Copied(path) => report.copied.push(path),
      Placed::AlreadyPresent(path) => report.reused.push(path),
    }
  }
}

/// Copy `library` into `lib_dir` under its own basename, first write wins.
///
/// Symlinks are followed, so a soname link lands as a regular file named
/// after the link. The copy is made writable so its load path can be edited.
pub fn place_library(binary: &Path, library: &Path, lib_dir: &Path) -> Result<Placed, ConsolidateError> {
  let name = library.file_name().ok_or_else(|| ConsolidateError::MissingLibrary {
    binary: binary.to_path_buf(),
    library: library.display().to_string(),
  })?;
  let dest = lib_dir.join(name);

  if dest.symlink_metadata().is_ok() {
    debug!(library = %library.display(), "already consolidated");
    return Ok(Placed::AlreadyPresent(dest));
  }
  if !library.exists() {
    return Err(ConsolidateError::MissingLibrary {
      binary: binary.to_path_buf(),
      library: library.display().to_string(),
    });
  }

  fs::copy(library, &dest).map_err(|source| ConsolidateError::CopyFailed {
    from: library.to_path_buf(),
    to: dest.clone(),
    source,
  })?;
  make_writable(&dest)?;

  info!(from = %library.display(), to = %dest.display(), "consolidated library");
  Ok(Placed::Copied(dest))
}

#[cfg(unix)]
fn make_writable(path: &Path) -> Result<(), ConsolidateError> {
  use std::os::unix::fs::PermissionsExt;

  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| ConsolidateError::Io {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(not(unix))]
fn make_writable(path: &Path) -> Result<(), ConsolidateError> {
  let mut perms = fs::metadata(path)
    .map_err(|source| ConsolidateError::Io {
      path: path.to_path_buf(),
      source,
    })?
    .permissions();
  #[allow(clippy::permissions_set_readonly_false)]
  perms.set_readonly(false);
  fs::set_permissions(path, perms).map_err(|source| ConsolidateError::Io {
    path: path.to_path_buf(),
    source,
  })
}

/// Create the lib dir and return its canonical path.
fn prepare_lib_dir(layout: &DistLayout) -> Result<PathBuf, ConsolidateError> {
  let lib_dir = layout.lib_dir();
  fs::create_dir_all(&lib_dir).map_err(|source| ConsolidateError::Io {
    path: lib_dir.clone(),
    source,
  })?;
  dunce::canonicalize(&lib_dir).map_err(|source| ConsolidateError::Io { path: lib_dir, source })
}
