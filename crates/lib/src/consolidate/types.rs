use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::process::ToolError;

/// Consolidation failures. All of them abort the build.
#[derive(Debug, Error)]
pub enum ConsolidateError {
  #[error("no python executable found in {}", .root.display())]
  MissingInterpreter { root: PathBuf },

  #[error("{}: required library '{library}' not found", .binary.display())]
  MissingLibrary { binary: PathBuf, library: String },

  #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
  CopyFailed {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{tool} failed on {} with exit code {code}: {message}", .binary.display())]
  ToolFailed {
    tool: String,
    binary: PathBuf,
    code: i32,
    message: String,
  },

  #[error("{}: load paths of this format can only be changed one library at a time", .binary.display())]
  UnsupportedRewrite { binary: PathBuf },

  #[error("I/O error at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Walk(#[from] walkdir::Error),

  #[error(transparent)]
  Tool(#[from] ToolError),
}

/// A load path rewritten in one binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryRelocationRecord {
  pub binary: PathBuf,
  /// The install name replaced, or `None` when the whole rpath was cleared.
  pub old_load_path: Option<String>,
  pub new_load_path: String,
}

/// What a consolidation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
  /// Libraries newly copied into the lib dir.
  pub copied: Vec<PathBuf>,
  /// Libraries whose basename was already present in the lib dir.
  pub reused: Vec<PathBuf>,
  pub relocations: Vec<BinaryRelocationRecord>,
}

impl ConsolidationReport {
  pub fn is_empty(&self) -> bool {
    self.copied.is_empty() && self.reused.is_empty() && self.relocations.is_empty()
  }
}
