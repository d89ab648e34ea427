//! Libraries that belong to the host OS and are never bundled.

use std::path::Path;

use crate::platform::Os;

/// Basename patterns of Linux libraries every target system provides.
///
/// A trailing `*` matches any suffix; otherwise the pattern must be followed
/// by `.so` in the basename.
const LINUX_PATTERNS: &[&str] = &[
  // glibc core
  "libc",
  "libm",
  "libdl",
  "libpthread",
  "librt",
  "libutil",
  "libresolv",
  "libnsl",
  "libcrypt",
  "libanl",
  "libgcc_s",
  "libstdc++",
  // dynamic loader
  "ld-linux*",
  "ld64",
  "linux-vdso",
  "linux-gate",
  // PAM
  "libpam*",
  // systemd
  "libsystemd",
  "libudev",
  // audit
  "libaudit",
  "libcap-ng",
  // security
  "libselinux",
  "libsepol",
  "libkeyutils",
  // filesystem metadata
  "libattr",
  "libacl",
];

/// Path prefixes of macOS libraries that live in the OS image.
const MACOS_PREFIXES: &[&str] = &["/System/Library/", "/usr/lib/"];

/// Matcher for system libraries on one OS.
#[derive(Debug, Clone, Copy)]
pub struct SystemLibraries {
  os: Os,
}

impl SystemLibraries {
  pub fn for_os(os: Os) -> Self {
    Self { os }
  }

  pub fn is_system(&self, path: &Path) -> bool {
    match self.os {
      Os::Linux => path
        .file_name()
        .map(|name| is_linux_system_name(&name.to_string_lossy()))
        .unwrap_or(false),
      Os::MacOsx => {
        let path = path.to_string_lossy();
        !path.starts_with('/') || MACOS_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
      }
      Os::Windows => false,
    }
  }
}

fn is_linux_system_name(name: &str) -> bool {
  LINUX_PATTERNS.iter().any(|pattern| match pattern.strip_suffix('*') {
    Some(prefix) => name.starts_with(prefix),
    None => name
      .strip_prefix(pattern)
      .is_some_and(|rest| rest.starts_with(".so") || rest.starts_with("-")),
  })
}
