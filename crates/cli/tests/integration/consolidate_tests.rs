use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn consolidate_is_a_no_op_on_windows() {
  let env = TestEnv::empty();
  std::fs::create_dir_all(env.install_root()).unwrap();

  env
    .pyport_cmd()
    .args(["consolidate", "dist", "--platform", "windows-x64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Consolidation complete!"))
    .stdout(predicate::str::contains("Libraries copied: 0"))
    .stdout(predicate::str::contains("Binaries relocated: 0"));
}

#[test]
fn consolidate_json_report_on_windows_is_empty() {
  let env = TestEnv::empty();
  std::fs::create_dir_all(env.install_root()).unwrap();

  let output = env
    .pyport_cmd()
    .args(["consolidate", "dist", "--platform", "windows-x64", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["copied"].as_array().unwrap().len(), 0);
  assert_eq!(report["relocations"].as_array().unwrap().len(), 0);
}

#[test]
fn consolidate_missing_root_fails() {
  let env = TestEnv::empty();

  env
    .pyport_cmd()
    .args(["consolidate", "missing", "--platform", "linux-x64"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Install root not found"));
}

#[test]
fn consolidate_without_interpreter_fails() {
  let env = TestEnv::empty();
  std::fs::create_dir_all(env.install_root().join("bin")).unwrap();

  env
    .pyport_cmd()
    .args(["consolidate", "dist", "--platform", "linux-x64"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("no python executable found"));
}

#[test]
fn consolidate_rejects_bad_timeout() {
  let env = TestEnv::empty();

  env
    .pyport_cmd()
    .args(["consolidate", "dist", "--timeout", "soon"])
    .assert()
    .code(2);
}
