use std::path::{Component, Path, PathBuf};

/// Relative path from directory `from` to `to`.
///
/// Both paths must be absolute and normalized; `..` components are emitted
/// for every segment of `from` below their common prefix. Returns an empty
/// path when they are the same directory.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
  let from: Vec<Component> = from.components().collect();
  let to: Vec<Component> = to.components().collect();

  let common = from.iter().zip(to.iter()).take_while(|(a, b)| a == b).count();

  let mut rel = PathBuf::new();
  for _ in common..from.len() {
    rel.push("..");
  }
  for part in &to[common..] {
    rel.push(part.as_os_str());
  }
  rel
}

/// Join a relative path onto a loader token using forward slashes.
///
/// Loader strings (`$ORIGIN/..`, `@executable_path/..`) are not host paths,
/// so they never use the platform separator.
pub fn loader_path(token: &str, rel: &Path) -> String {
  let parts: Vec<String> = rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect();
  if parts.is_empty() {
    token.to_string()
  } else {
    format!("{}/{}", token, parts.join("/"))
  }
}

/// Whether `path` resolves to a location inside `dir`.
///
/// The parent of `path` is canonicalized rather than `path` itself so that a
/// symlinked soname (`libffi.so.8 -> libffi.so.8.1.2`) is still judged by the
/// directory it lives in. `dir` must already be canonical.
pub fn is_within(path: &Path, dir: &Path) -> bool {
  let parent = match path.parent() {
    Some(p) => p,
    None => return false,
  };
  match dunce::canonicalize(parent) {
    Ok(parent) => parent.starts_with(dir),
    Err(_) => path.starts_with(dir),
  }
}
