use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn plan_shows_path_per_package() {
  let env = TestEnv::with_fixtures(&["base.json", "variant.json"]);

  env
    .pyport_cmd()
    .args(["plan", "--config", "base.json", "--variant", "variant.json"])
    .args(["--platform", "linux-x64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Plan for linux-x64"))
    .stdout(predicate::str::contains("Consolidation: elf"))
    .stdout(predicate::str::contains(
      "psycopg2==2.9.9 → source (forceSource rule: link against the bundled libpq)",
    ))
    .stdout(predicate::str::contains(
      "numpy==2.1.1 → binary, else abort (policy onlyBinaryList forbids source fallback)",
    ))
    .stdout(predicate::str::contains("pywin32==306 → skip (skip rule: Windows only)"))
    .stdout(predicate::str::contains(
      "pyyaml==6.0.2 → binary, else source (source fallback permitted by policy allowSourceList)",
    ));
}

#[test]
fn plan_rules_are_per_platform() {
  let env = TestEnv::with_fixtures(&["base.json"]);

  env
    .pyport_cmd()
    .args(["plan", "--config", "base.json", "--platform", "windows-x64"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Consolidation: none"))
    .stdout(predicate::str::contains("psycopg2==2.9.9 → binary"))
    .stdout(predicate::str::contains("pywin32==306 → binary"));
}

#[test]
fn plan_json_includes_supplementary_tags() {
  let env = TestEnv::with_fixtures(&["base.json"]);

  let output = env
    .pyport_cmd()
    .args(["plan", "--config", "base.json", "--platform", "macosx-x64", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(plan["platform"], "macosx-x64");
  assert_eq!(plan["consolidation"], "macho");
  assert_eq!(plan["policy"]["strict_missing"], true);

  let certifi = &plan["packages"][0];
  assert_eq!(certifi["package"], "certifi");
  assert_eq!(certifi["path"], "binary-first");
  assert_eq!(certifi["supplementary_tags"][0], "macosx_10_9_x86_64");

  let copy_to = plan["copy_files"][0]["to"].as_str().unwrap();
  assert!(copy_to.ends_with("python3.12/site-packages/sitecustomize.py"));
}

#[test]
fn plan_with_missing_config_fails() {
  let env = TestEnv::empty();

  env
    .pyport_cmd()
    .args(["plan", "--config", "nope.json", "--platform", "linux-x64"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn plan_with_malformed_config_fails() {
  let env = TestEnv::empty();
  env.write_file("base.json", r#"{"packages": {"dependencies": "numpy"}}"#);

  env
    .pyport_cmd()
    .args(["plan", "--config", "base.json", "--platform", "linux-x64"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("base.json"));
}

#[test]
fn plan_with_unknown_platform_key_in_config_fails() {
  let env = TestEnv::empty();
  env.write_file(
    "base.json",
    r#"{"packages": {"dependencies": [], "skip": {"six": {"solaris-x64": "no"}}}}"#,
  );

  env
    .pyport_cmd()
    .args(["plan", "--config", "base.json", "--platform", "linux-x64"])
    .assert()
    .code(1);
}
