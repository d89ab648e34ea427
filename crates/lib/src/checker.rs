//! Native import check.
//!
//! The checker itself is an external script run by the built interpreter;
//! it imports every native module of every downloaded wheel. This module owns
//! the whitelist file it reads and the invocation contract:
//! `<python> <script> [whitelist.json]`, exit status 0 meaning pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::process::{ToolError, ToolOutput, run_tool};

#[derive(Debug, Error)]
pub enum CheckerError {
  #[error("failed to read whitelist {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse whitelist {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid whitelist {}: {reason}", .path.display())]
  InvalidWhitelist { path: PathBuf, reason: String },

  #[error("native import check failed with exit code {code}: {message}")]
  Failed { code: i32, message: String },

  #[error(transparent)]
  Tool(#[from] ToolError),
}

/// Expected import failures: wheel file name -> module -> error substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
  entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl Whitelist {
  pub fn load(path: &Path) -> Result<Self, CheckerError> {
    let content = std::fs::read_to_string(path).map_err(|source| CheckerError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| CheckerError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_value(value).map_err(|reason| CheckerError::InvalidWhitelist {
      path: path.to_path_buf(),
      reason,
    })
  }

  /// Validate the `{wheel: {module: pattern}}` shape.
  pub fn from_value(value: Value) -> Result<Self, String> {
    let Value::Object(wheels) = value else {
      return Err(format!("must be a JSON object, got {}", kind(&value)));
    };

    let mut entries = BTreeMap::new();
    for (wheel, modules) in wheels {
      let Value::Object(modules) = modules else {
        return Err(format!("entry for '{}' must be an object", wheel));
      };
      let mut patterns = BTreeMap::new();
      for (module, pattern) in modules {
        let Value::String(pattern) = pattern else {
          return Err(format!("error pattern for '{}.{}' must be a string", wheel, module));
        };
        patterns.insert(module, pattern);
      }
      entries.insert(wheel, patterns);
    }

    Ok(Self { entries })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Whether `error` from importing `module` of `wheel` is expected.
  ///
  /// Case-insensitive substring match against the configured pattern; empty
  /// inputs and empty patterns never match.
  pub fn is_whitelisted(&self, wheel: &str, module: &str, error: &str) -> bool {
    if wheel.is_empty() || module.is_empty() || error.is_empty() {
      return false;
    }
    match self.entries.get(wheel).and_then(|modules| modules.get(module)) {
      Some(pattern) if !pattern.is_empty() => error.to_lowercase().contains(&pattern.to_lowercase()),
      _ => false,
    }
  }
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Run the checker script with the built interpreter.
///
/// The whitelist, if given, is validated before the checker starts so a
/// malformed file fails fast instead of inside the interpreter. A whitelist
/// path that does not exist is logged and left out.
pub async fn run_import_check(
  python: &Path,
  script: &Path,
  whitelist: Option<&Path>,
  timeout: Option<Duration>,
) -> Result<ToolOutput, CheckerError> {
  let mut args = vec![script.as_os_str()];
  let whitelist = match whitelist {
    Some(path) if !path.exists() => {
      warn!(path = %path.display(), "whitelist file not found, checking without it");
      None
    }
    other => other,
  };
  if let Some(path) = whitelist {
    let list = Whitelist::load(path)?;
    info!(wheels = list.len(), path = %path.display(), "loaded whitelist");
    args.push(path.as_os_str());
  }

  let program = python.to_string_lossy();
  let output = run_tool(&program, args, timeout).await?;
  if !output.success() {
    warn!(code = output.code, "native import check failed");
    return Err(CheckerError::Failed {
      code: output.code,
      message: output.error_line().to_string(),
    });
  }

  info!("native import check passed");
  Ok(output)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tempfile::TempDir;

  fn sample() -> Whitelist {
    Whitelist::from_value(json!({
      "pyobjc_core-10.3-cp312-cp312-macosx_10_9_universal2.whl": {
        "objc._objc": "Symbol not found"
      },
      "uvloop-0.21.0-cp312-cp312-manylinux_2_17_x86_64.whl": {
        "uvloop.loop": ""
      }
    }))
    .unwrap()
  }

  #[test]
  fn substring_match_ignores_case() {
    let list = sample();
    let wheel = "pyobjc_core-10.3-cp312-cp312-macosx_10_9_universal2.whl";
    assert!(list.is_whitelisted(wheel, "objc._objc", "ImportError: symbol NOT FOUND: _foo"));
    assert!(!list.is_whitelisted(wheel, "objc._objc", "ImportError: bad magic"));
    assert!(!list.is_whitelisted(wheel, "objc._other", "Symbol not found"));
    assert!(!list.is_whitelisted("other.whl", "objc._objc", "Symbol not found"));
  }

  #[test]
  fn empty_inputs_never_match() {
    let list = sample();
    assert!(!list.is_whitelisted("uvloop-0.21.0-cp312-cp312-manylinux_2_17_x86_64.whl", "uvloop.loop", "anything"));
    assert!(!list.is_whitelisted("", "objc._objc", "Symbol not found"));
    assert!(!list.is_whitelisted(
      "pyobjc_core-10.3-cp312-cp312-macosx_10_9_universal2.whl",
      "objc._objc",
      ""
    ));
  }

  #[test]
  fn rejects_wrong_shapes() {
    assert!(Whitelist::from_value(json!(["a"])).unwrap_err().contains("got array"));
    assert!(Whitelist::from_value(json!({"w.whl": "x"})).unwrap_err().contains("'w.whl'"));
    assert!(
      Whitelist::from_value(json!({"w.whl": {"m": 1}}))
        .unwrap_err()
        .contains("'w.whl.m'")
    );
  }

  #[test]
  fn load_reports_invalid_shape_with_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("whitelist.json");
    std::fs::write(&path, "[]").unwrap();

    let err = Whitelist::load(&path).unwrap_err();
    assert!(matches!(err, CheckerError::InvalidWhitelist { .. }));
    assert!(err.to_string().contains("whitelist.json"));
  }

  #[test]
  fn load_reports_syntax_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("whitelist.json");
    std::fs::write(&path, "{").unwrap();
    assert!(matches!(Whitelist::load(&path).unwrap_err(), CheckerError::Parse { .. }));
  }

  #[cfg(unix)]
  mod invocation {
    use super::*;
    use crate::util::testutil::write_script;

    #[tokio::test]
    async fn passes_script_and_whitelist() {
      let temp = TempDir::new().unwrap();
      let python = write_script(temp.path(), "python3", "echo \"$@\"");
      let script = temp.path().join("check_native_imports.py");
      let whitelist = temp.path().join("whitelist.json");
      std::fs::write(&whitelist, "{}").unwrap();

      let output = run_import_check(&python, &script, Some(&whitelist), None).await.unwrap();
      assert_eq!(
        output.stdout.trim(),
        format!("{} {}", script.display(), whitelist.display())
      );
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure() {
      let temp = TempDir::new().unwrap();
      let python = write_script(temp.path(), "python3", "echo '2 wheel(s) failed' >&2\nexit 1");

      let err = run_import_check(&python, Path::new("check.py"), None, None)
        .await
        .unwrap_err();
      assert!(matches!(err, CheckerError::Failed { code: 1, ref message } if message == "2 wheel(s) failed"));
    }

    #[tokio::test]
    async fn missing_whitelist_runs_without_it() {
      let temp = TempDir::new().unwrap();
      let python = write_script(temp.path(), "python3", "echo \"$@\"");
      let script = temp.path().join("check_native_imports.py");
      let whitelist = temp.path().join("whitelist.json");

      let output = run_import_check(&python, &script, Some(&whitelist), None).await.unwrap();
      assert_eq!(output.stdout.trim(), script.display().to_string());
    }

    #[tokio::test]
    async fn invalid_whitelist_fails_before_running() {
      let temp = TempDir::new().unwrap();
      let marker = temp.path().join("ran");
      let python = write_script(temp.path(), "python3", &format!("touch '{}'", marker.display()));
      let whitelist = temp.path().join("whitelist.json");
      std::fs::write(&whitelist, "{\"w.whl\": []}").unwrap();

      let err = run_import_check(&python, Path::new("check.py"), Some(&whitelist), None)
        .await
        .unwrap_err();
      assert!(matches!(err, CheckerError::InvalidWhitelist { .. }));
      assert!(!marker.exists());
    }
  }
}
