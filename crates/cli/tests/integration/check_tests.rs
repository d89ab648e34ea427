//! The checker contract, driven by a stand-in interpreter script.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

/// Echoes its arguments, then exits with `$CHECK_EXIT` (default 0).
const FAKE_PYTHON: &str = r#"echo "checked: $*"
if [ -n "$CHECK_EXIT" ]; then
  echo "ImportError: libfoo.so.1" >&2
  exit "$CHECK_EXIT"
fi
exit 0"#;

fn env() -> TestEnv {
  let env = TestEnv::empty();
  env.write_script("python3", FAKE_PYTHON);
  env.write_file("check_native.py", "");
  env
}

#[test]
fn check_passes_whitelist_to_checker() {
  let env = env();
  env.write_file(
    "whitelist.json",
    r#"{"pywin32-306-cp312-cp312-win_amd64.whl": {"win32api": "DLL load failed"}}"#,
  );

  env
    .pyport_cmd()
    .args(["check", "./python3", "check_native.py", "--whitelist", "whitelist.json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("checked: check_native.py whitelist.json"))
    .stdout(predicate::str::contains("All native modules imported"));
}

#[test]
fn check_rejects_invalid_whitelist() {
  let env = env();
  env.write_file("whitelist.json", r#"["not", "an", "object"]"#);

  env
    .pyport_cmd()
    .args(["check", "./python3", "check_native.py", "--whitelist", "whitelist.json"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("invalid whitelist"))
    .stdout(predicate::str::contains("checked").not());
}

#[test]
fn check_failure_reports_exit_code() {
  let env = env();

  env
    .pyport_cmd()
    .args(["check", "./python3", "check_native.py"])
    .env("CHECK_EXIT", "3")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Native import check failed"))
    .stderr(predicate::str::contains("exit code 3"))
    .stderr(predicate::str::contains("ImportError: libfoo.so.1"));
}
