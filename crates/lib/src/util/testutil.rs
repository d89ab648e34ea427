//! Test utilities for pyport-lib.
//!
//! Cross-platform shell helpers plus in-memory fakes for the downloader and
//! the library tools, so the engines can be driven without pip, ldd, or
//! install_name_tool on the test host.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::acquire::{DownloadError, DownloadMode, DownloadRequest, Downloader};
use crate::consolidate::{ConsolidateError, LibraryTools};
use crate::process::ToolError;

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Write an executable `/bin/sh` script and return its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Write a file, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}

/// Downloader that records every request and fails on demand.
#[derive(Debug, Default)]
pub struct FakeDownloader {
  calls: RefCell<Vec<DownloadRequest>>,
  fail_binary: HashSet<String>,
  fail_source: HashSet<String>,
  fail_tags: HashSet<String>,
  broken: bool,
}

impl FakeDownloader {
  pub fn fail_binary(mut self, package: &str) -> Self {
    self.fail_binary.insert(package.to_string());
    self
  }

  pub fn fail_source(mut self, package: &str) -> Self {
    self.fail_source.insert(package.to_string());
    self
  }

  pub fn fail_tag(mut self, tag: &str) -> Self {
    self.fail_tags.insert(tag.to_string());
    self
  }

  /// Every call fails as if the interpreter could not be started.
  pub fn broken(mut self) -> Self {
    self.broken = true;
    self
  }

  pub fn calls(&self) -> Vec<DownloadRequest> {
    self.calls.borrow().clone()
  }
}

impl Downloader for FakeDownloader {
  async fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
    self.calls.borrow_mut().push(request.clone());

    if self.broken {
      return Err(DownloadError::Tool(ToolError::Spawn {
        program: "python3".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
      }));
    }

    let package = request.package.as_str();
    let fails = match (&request.platform_tag, request.mode) {
      (Some(tag), _) => self.fail_tags.contains(tag),
      (None, DownloadMode::Binary) => self.fail_binary.contains(package),
      (None, DownloadMode::Source) => self.fail_source.contains(package),
    };

    if fails {
      Err(DownloadError::Failed {
        code: 1,
        message: format!("ERROR: No matching distribution found for {}", request.spec),
      })
    } else {
      Ok(())
    }
  }
}

/// One recorded load path rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
  pub binary: PathBuf,
  pub old: Option<String>,
  pub new: String,
}

/// Library tools backed by a fixed dependency table.
#[derive(Debug, Default)]
pub struct FakeTools {
  deps: BTreeMap<PathBuf, Vec<PathBuf>>,
  non_binaries: HashSet<PathBuf>,
  fail_rewrite: bool,
  rewrites: RefCell<Vec<Rewrite>>,
  listed: RefCell<Vec<PathBuf>>,
}

impl FakeTools {
  /// Declare the libraries `binary` links against.
  pub fn with_deps<P: AsRef<Path>>(mut self, binary: &Path, deps: &[P]) -> Self {
    self
      .deps
      .insert(binary.to_path_buf(), deps.iter().map(|p| p.as_ref().to_path_buf()).collect());
    self
  }

  /// Mark a file as not a native binary (e.g. a script).
  pub fn not_binary(mut self, path: &Path) -> Self {
    self.non_binaries.insert(path.to_path_buf());
    self
  }

  pub fn failing_rewrites(mut self) -> Self {
    self.fail_rewrite = true;
    self
  }

  pub fn rewrites(&self) -> Vec<Rewrite> {
    self.rewrites.borrow().clone()
  }

  /// Binaries whose dependencies were listed, in order.
  pub fn listed(&self) -> Vec<PathBuf> {
    self.listed.borrow().clone()
  }
}

impl LibraryTools for FakeTools {
  async fn is_binary(&self, path: &Path) -> Result<bool, ConsolidateError> {
    Ok(!self.non_binaries.contains(path))
  }

  async fn collect_dependencies(&self, binary: &Path) -> Result<Vec<PathBuf>, ConsolidateError> {
    self.listed.borrow_mut().push(binary.to_path_buf());
    Ok(self.deps.get(binary).cloned().unwrap_or_default())
  }

  async fn rewrite_load_path(&self, binary: &Path, old: Option<&str>, new: &str) -> Result<(), ConsolidateError> {
    if self.fail_rewrite {
      return Err(ConsolidateError::ToolFailed {
        tool: "fake".to_string(),
        binary: binary.to_path_buf(),
        code: 1,
        message: "cannot patch".to_string(),
      });
    }
    self.rewrites.borrow_mut().push(Rewrite {
      binary: binary.to_path_buf(),
      old: old.map(str::to_string),
      new: new.to_string(),
    });
    Ok(())
  }
}
