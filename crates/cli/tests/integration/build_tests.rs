use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn build_places_files_and_honors_skip_rules() {
  let env = TestEnv::with_fixtures(&["windows.json"]);
  let root = env.install_root();

  env
    .pyport_cmd()
    .args(["build", "--config", "windows.json", "--platform", "windows-x64"])
    .arg("--install-root")
    .arg(&root)
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete!"))
    .stdout(predicate::str::contains("Skipped: 1"))
    .stdout(predicate::str::contains("Files placed: 1"))
    .stderr(predicate::str::contains(
      "Skipped pywin32==306: skip rule: bundled with the interpreter",
    ));

  let placed = root.join("Lib").join("site-packages").join("sitecustomize.py");
  assert_eq!(std::fs::read_to_string(placed).unwrap(), "import os\n");
  assert!(root.join("packages").is_dir());
}

#[test]
fn build_json_report() {
  let env = TestEnv::with_fixtures(&["windows.json"]);

  let output = env
    .pyport_cmd()
    .args(["build", "--config", "windows.json", "--platform", "windows-x64", "-o", "json"])
    .arg("--install-root")
    .arg(env.install_root())
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: Value = serde_json::from_slice(&output.stdout).unwrap();
  let record = &report["acquisition"]["records"][0];
  assert_eq!(record["package"], "pywin32");
  assert_eq!(record["outcome"]["state"], "skipped");
  assert_eq!(record["rationale"]["rule"], "skip-rule");
  assert_eq!(report["import_check_passed"], false);
}

#[test]
fn build_with_missing_copy_source_fails() {
  let env = TestEnv::with_fixtures(&["windows.json"]);
  std::fs::remove_file(env.path("files/sitecustomize.py")).unwrap();

  env
    .pyport_cmd()
    .args(["build", "--config", "windows.json", "--platform", "windows-x64"])
    .arg("--install-root")
    .arg(env.install_root())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("copyFiles source not found"));
}

#[test]
fn build_with_unstartable_python_fails() {
  let env = TestEnv::empty();
  env.write_file(
    "base.json",
    r#"{
      "build": { "python": "/nonexistent/bin/python3" },
      "packages": { "dependencies": ["six==1.16.0"] }
    }"#,
  );

  env
    .pyport_cmd()
    .args(["build", "--config", "base.json", "--platform", "linux-x64", "--no-consolidate"])
    .arg("--install-root")
    .arg(env.install_root())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("failed to start"));
}

#[test]
fn check_flag_requires_checker_script() {
  let env = TestEnv::with_fixtures(&["windows.json"]);

  env
    .pyport_cmd()
    .args(["build", "--config", "windows.json", "--install-root", "dist", "--check"])
    .assert()
    .code(2);
}

/// Builds driven by a stand-in interpreter that emulates `pip download`.
#[cfg(unix)]
mod with_fake_pip {
  use super::*;

  /// Fails every `--only-binary` download; logs all arguments.
  const NO_WHEELS: &str = r#"echo "$@" >> "$(dirname "$0")/pip.log"
case "$*" in
  *--only-binary*) echo "ERROR: No matching distribution found" >&2; exit 1;;
esac
exit 0"#;

  fn env_with_config(config: &str) -> TestEnv {
    let env = TestEnv::empty();
    env.write_script("python3", NO_WHEELS);
    let python = env.path("python3");
    env.write_file(
      "base.json",
      &config.replace("PYTHON", &python.to_string_lossy()),
    );
    env
  }

  #[test]
  fn falls_back_to_source_when_permitted() {
    let env = env_with_config(
      r#"{
        "build": { "python": "PYTHON" },
        "registries": { "additional": ["https://example.invalid/simple"] },
        "packages": {
          "dependencies": ["PyYAML==6.0.2"],
          "resolution": { "allowSourceList": ["pyyaml"] }
        }
      }"#,
    );

    env
      .pyport_cmd()
      .args(["build", "--config", "base.json", "--platform", "linux-x64", "--no-consolidate"])
      .arg("--install-root")
      .arg(env.install_root())
      .assert()
      .success()
      .stdout(predicate::str::contains("Source packages: 1"))
      .stdout(predicate::str::contains("Consolidation: disabled"));

    let log = std::fs::read_to_string(env.path("pip.log")).unwrap();
    let calls: Vec<&str> = log.lines().collect();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("-m pip download PyYAML==6.0.2 --dest "));
    assert!(calls[0].contains("--only-binary :all:"));
    assert!(calls[1].contains("--no-binary pyyaml"));
    assert!(calls[1].contains("--extra-index-url=https://example.invalid/simple"));
  }

  #[test]
  fn strict_missing_aborts() {
    let env = env_with_config(
      r#"{
        "build": { "python": "PYTHON" },
        "packages": {
          "dependencies": ["numpy==2.1.0", "six==1.16.0"],
          "resolution": { "strictMissing": true, "onlyBinaryList": ["numpy"] }
        }
      }"#,
    );

    env
      .pyport_cmd()
      .args(["build", "--config", "base.json", "--platform", "linux-x64", "--no-consolidate"])
      .arg("--install-root")
      .arg(env.install_root())
      .assert()
      .code(1)
      .stderr(predicate::str::contains("no permitted acquisition path"));

    // Aborted at numpy; six was never attempted.
    let log = std::fs::read_to_string(env.path("pip.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
  }

  #[test]
  fn missing_wheel_is_skipped_without_strict() {
    let env = env_with_config(
      r#"{
        "build": { "python": "PYTHON" },
        "packages": {
          "dependencies": ["numpy==2.1.0"],
          "resolution": { "onlyBinaryList": ["numpy"] }
        }
      }"#,
    );

    env
      .pyport_cmd()
      .args(["build", "--config", "base.json", "--platform", "linux-x64", "--no-consolidate"])
      .arg("--install-root")
      .arg(env.install_root())
      .assert()
      .success()
      .stdout(predicate::str::contains("Skipped: 1"))
      .stderr(predicate::str::contains("onlyBinaryList"));
  }
}
