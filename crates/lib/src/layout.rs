//! Directory layout of a built distribution.
//!
//! ```text
//! <install-root>/
//! ├── bin/          # interpreter and entry points
//! ├── lib/          # consolidated shared libraries, python3.X/
//! └── packages/     # downloaded wheels and sdists
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::CopyFile;
use crate::platform::Os;

/// Placeholder in a `copyFiles` destination replaced by the site-packages dir.
pub const SITE_PACKAGES_PLACEHOLDER: &str = "{site-packages}";

#[derive(Debug, Error)]
pub enum LayoutError {
  #[error("copyFiles source not found: {}", .path.display())]
  MissingSource { path: PathBuf },

  #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("I/O error at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Walk(#[from] walkdir::Error),
}

/// Paths inside one install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistLayout {
  root: PathBuf,
}

impl DistLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn bin_dir(&self) -> PathBuf {
    self.root.join("bin")
  }

  pub fn lib_dir(&self) -> PathBuf {
    self.root.join("lib")
  }

  pub fn packages_dir(&self) -> PathBuf {
    self.root.join("packages")
  }

  /// The interpreter executable, if one exists in `bin/`.
  pub fn python_executable(&self) -> Option<PathBuf> {
    let bin = self.bin_dir();
    let candidates: &[&str] = if cfg!(windows) {
      &["python.exe"]
    } else {
      &["python3", "python"]
    };
    candidates.iter().map(|name| bin.join(name)).find(|path| path.is_file())
  }

  /// Site-packages directory for the given OS and `major.minor` version.
  pub fn site_packages(&self, os: Os, python_version: &str) -> PathBuf {
    match os {
      Os::Windows => self.root.join("Lib").join("site-packages"),
      Os::Linux | Os::MacOsx => self
        .lib_dir()
        .join(format!("python{}", python_version))
        .join("site-packages"),
    }
  }

  /// Directory holding the standard library's native extension modules
  /// (`lib/python3.X/lib-dynload`). First match in sorted order.
  pub fn extension_dir(&self) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(self.lib_dir())
      .ok()?
      .filter_map(|entry| entry.ok())
      .filter(|entry| entry.file_name().to_string_lossy().starts_with("python3"))
      .map(|entry| entry.path().join("lib-dynload"))
      .filter(|path| path.is_dir())
      .collect();
    candidates.sort();
    candidates.into_iter().next()
  }

  /// Resolve a `copyFiles` destination against this layout.
  pub fn resolve_destination(&self, to: &str, os: Os, python_version: &str) -> PathBuf {
    let site = self.site_packages(os, python_version);
    match to.strip_prefix(SITE_PACKAGES_PLACEHOLDER) {
      Some(rest) => {
        let rest = rest.trim_start_matches(['/', '\\']);
        if rest.is_empty() { site } else { site.join(rest) }
      }
      None => self.root.join(to.replace(SITE_PACKAGES_PLACEHOLDER, &site.to_string_lossy())),
    }
  }
}

/// Copy every `copyFiles` directive into the layout.
///
/// `from` is resolved relative to `base_dir` (the config file's directory);
/// `to` is relative to the install root after placeholder substitution.
/// Directories are copied recursively. Returns the destination paths.
pub fn place_copy_files(
  directives: &[CopyFile],
  base_dir: &Path,
  layout: &DistLayout,
  os: Os,
  python_version: &str,
) -> Result<Vec<PathBuf>, LayoutError> {
  let mut placed = Vec::with_capacity(directives.len());

  for directive in directives {
    let from = base_dir.join(&directive.from);
    if !from.exists() {
      return Err(LayoutError::MissingSource { path: from });
    }
    let to = layout.resolve_destination(&directive.to, os, python_version);

    if from.is_dir() {
      copy_tree(&from, &to)?;
    } else {
      copy_file(&from, &to)?;
    }
    info!(from = %from.display(), to = %to.display(), "placed file");
    placed.push(to);
  }

  Ok(placed)
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), LayoutError> {
  for entry in WalkDir::new(from).sort_by_file_name() {
    let entry = entry?;
    let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
    let target = to.join(rel);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&target).map_err(|source| LayoutError::Io { path: target, source })?;
    } else {
      copy_file(entry.path(), &target)?;
    }
  }
  Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<(), LayoutError> {
  if let Some(parent) = to.parent() {
    fs::create_dir_all(parent).map_err(|source| LayoutError::Io {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  debug!(from = %from.display(), to = %to.display(), "copying");
  fs::copy(from, to).map_err(|source| LayoutError::Copy {
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source,
  })?;
  Ok(())
}
