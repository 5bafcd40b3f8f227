//! Package and target identifiers.
//!
//! A target is addressed as `PACKAGE:NAME`. A leading `//` roots the package
//! at the workspace root; otherwise the package is relative to the caller's
//! working directory and re-anchored to the workspace. The root package is
//! the empty string.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::checksum::Fingerprint;

/// A package name: a filesystem-like path relative to the workspace root.
/// The empty string denotes the root package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageName(pub String);

/// A target name: non-empty, without `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetName(pub String);

impl std::fmt::Display for PackageName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl std::fmt::Display for TargetName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Identifies a declared target within the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TargetId {
  pub package: PackageName,
  pub target: TargetName,
}

impl TargetId {
  pub fn new(package: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      package: PackageName(package.into()),
      target: TargetName(target.into()),
    }
  }
}

impl std::fmt::Display for TargetId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "//{}:{}", self.package, self.target)
  }
}

/// Identifies one artifact in the cache: a frozen target's identity, or a
/// file group's when `target` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactId {
  pub package: PackageName,
  pub target: TargetName,
  pub fingerprint: Fingerprint,
}

impl ArtifactId {
  /// The file-group form, with an empty target name.
  pub fn file_group(package: PackageName, fingerprint: Fingerprint) -> Self {
    Self {
      package,
      target: TargetName(String::new()),
      fingerprint,
    }
  }

  pub fn is_file_group(&self) -> bool {
    self.target.0.is_empty()
  }
}

impl std::fmt::Display for ArtifactId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.is_file_group() {
      write!(f, "//{}@{}", self.package, self.fingerprint)
    } else {
      write!(f, "//{}:{}@{}", self.package, self.target, self.fingerprint)
    }
  }
}

impl Serialize for ArtifactId {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// Errors from parsing a target reference.
#[derive(Debug, Error)]
pub enum TargetIdError {
  /// The reference does not follow the `PACKAGE:NAME` grammar.
  #[error("invalid target ref '{0}'")]
  InvalidTargetId(String),

  /// The reference resolves to a package outside the workspace.
  #[error(
    "package '{package}' (relative to '{}') is outside workspace '{}'",
    cwd.display(),
    workspace.display()
  )]
  PackageOutsideWorkspace {
    workspace: PathBuf,
    cwd: PathBuf,
    package: String,
  },
}

/// Parse a target reference relative to `cwd`, re-anchoring it to
/// `workspace`.
///
/// Accepted forms: `//absolute/package:name`, `relative/package:name`, and
/// `:name` (the package of `cwd` itself). `//./pkg:name`, references without
/// a colon, empty names, names containing `/`, and packages escaping the
/// workspace are rejected.
pub fn parse_target_id(workspace: &Path, cwd: &Path, s: &str) -> Result<TargetId, TargetIdError> {
  let Some((package_part, name)) = s.split_once(':') else {
    return Err(TargetIdError::InvalidTargetId(s.to_string()));
  };
  if name.is_empty() || name.contains('/') {
    return Err(TargetIdError::InvalidTargetId(s.to_string()));
  }

  let package = if let Some(rooted) = package_part.strip_prefix("//") {
    if rooted == "." || rooted.starts_with("./") {
      return Err(TargetIdError::InvalidTargetId(s.to_string()));
    }
    rooted.trim_end_matches('/').to_string()
  } else {
    let absolute = normalize(&cwd.join(package_part));
    let workspace = normalize(workspace);
    match absolute.strip_prefix(&workspace) {
      Ok(relative) => relative.to_string_lossy().into_owned(),
      Err(_) => {
        return Err(TargetIdError::PackageOutsideWorkspace {
          workspace,
          cwd: cwd.to_path_buf(),
          package: package_part.to_string(),
        });
      }
    }
  };

  Ok(TargetId::new(package, name))
}

/// Lexically normalize a path: resolve `.` and `..` components without
/// touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          out.push(Component::ParentDir);
        }
      }
      other => out.push(other),
    }
  }
  out
}
