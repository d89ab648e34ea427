//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// A temporary directory holding the config files, the files they copy, and
/// the install root.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Copy fixtures into the environment under their own names, plus the
  /// `files/sitecustomize.py` they reference.
  pub fn with_fixtures(names: &[&str]) -> Self {
    let env = Self::empty();
    for name in names {
      env.write_file(name, &fixture_content(name));
    }
    env.write_file("files/sitecustomize.py", "import os\n");
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Write an executable `/bin/sh` script.
  #[cfg(unix)]
  pub fn write_script(&self, relative_path: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.write_file(relative_path, &format!("#!/bin/sh\n{}\n", body));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Install root (not created).
  pub fn install_root(&self) -> PathBuf {
    self.temp.path().join("dist")
  }

  /// A `pyport` command running inside the environment, with logging kept
  /// at its default level.
  pub fn pyport_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("pyport");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
