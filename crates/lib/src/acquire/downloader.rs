//! The package downloader capability and its pip-backed implementation.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::package::PackageName;
use crate::process::{ToolError, run_tool};

/// Which artifact kind a download is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadMode {
  /// Prebuilt wheels only, for the package and all its dependencies.
  Binary,
  /// Source distribution for this package only; its dependencies may still
  /// resolve to wheels.
  Source,
}

impl fmt::Display for DownloadMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DownloadMode::Binary => f.write_str("binary-only"),
      DownloadMode::Source => f.write_str("source-only"),
    }
  }
}

/// One downloader invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
  /// Raw dependency spec, e.g. `numpy==2.1.0`.
  pub spec: String,
  pub package: PackageName,
  pub mode: DownloadMode,
  /// Wheel platform tag for supplementary downloads.
  pub platform_tag: Option<String>,
}

#[derive(Debug, Error)]
pub enum DownloadError {
  /// The downloader ran and exited non-zero.
  #[error("downloader exited with code {code}: {message}")]
  Failed { code: i32, message: String },

  /// The downloader could not be run at all.
  #[error(transparent)]
  Tool(#[from] ToolError),
}

/// Fetches package artifacts into the distribution's packages directory.
pub trait Downloader {
  fn download(&self, request: &DownloadRequest) -> impl Future<Output = Result<(), DownloadError>>;
}

/// Downloader backed by `python -m pip download`.
#[derive(Debug, Clone)]
pub struct PipDownloader {
  python: String,
  dest: PathBuf,
  extra_index_urls: Vec<String>,
  timeout: Option<Duration>,
}

impl PipDownloader {
  pub fn new(python: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
    Self {
      python: python.into(),
      dest: dest.into(),
      extra_index_urls: Vec::new(),
      timeout: None,
    }
  }

  pub fn with_extra_index_urls(mut self, urls: &[String]) -> Self {
    self.extra_index_urls = urls.to_vec();
    self
  }

  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  /// Arguments passed to the interpreter for this request.
  pub fn args(&self, request: &DownloadRequest) -> Vec<String> {
    let mut args = vec![
      "-m".to_string(),
      "pip".to_string(),
      "download".to_string(),
      request.spec.clone(),
      "--dest".to_string(),
      self.dest.to_string_lossy().into_owned(),
    ];

    match request.mode {
      DownloadMode::Binary => {
        args.push("--only-binary".to_string());
        args.push(":all:".to_string());
      }
      DownloadMode::Source => {
        args.push("--no-binary".to_string());
        args.push(request.package.to_string());
      }
    }

    if let Some(tag) = &request.platform_tag {
      args.push("--platform".to_string());
      args.push(tag.clone());
    }

    for url in &self.extra_index_urls {
      args.push(format!("--extra-index-url={}", url));
    }

    args
  }
}

impl Downloader for PipDownloader {
  async fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
    let output = run_tool(&self.python, self.args(request), self.timeout).await?;
    if output.success() {
      Ok(())
    } else {
      Err(DownloadError::Failed {
        code: output.code,
        message: output.error_line().to_string(),
      })
    }
  }
}
