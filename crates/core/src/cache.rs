//! The content-addressed artifact cache.
//!
//! The cache maps an [`ArtifactId`] to a deterministic filesystem path and
//! offers scoped staging with atomic publish: work happens in a temporary
//! directory inside the cache root and the finished artifact is renamed to
//! its canonical location, so observers never see a half-written artifact.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/packages/<package or __ROOT__>/targets/<name>/<fingerprint>
//! <root>/packages/<package>/filegroups/<fingerprint>
//! ```
//!
//! An artifact may be a file or a directory. Entries outlive invocations
//! and are only displaced when an identical id is re-published.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::target::ArtifactId;

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("artifact not found: {0}")]
  NotFound(ArtifactId),

  #[error("{}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The staging callback reported success but left nothing at the path it
  /// promised to populate.
  #[error("staged artifact missing at {}", path.display())]
  MissingStaged { path: PathBuf },
}

impl CacheError {
  fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    CacheError::Io {
      path: path.into(),
      source,
    }
  }
}

/// A local, content-addressed artifact cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct Cache {
  root: PathBuf,
}

impl Cache {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// The canonical path of an artifact. Deterministic and stable across
  /// runs; injective in the id.
  pub fn path(&self, id: &ArtifactId) -> PathBuf {
    let mut path = self.root.join("packages");
    if id.is_file_group() {
      if !id.package.0.is_empty() {
        path.push(&id.package.0);
      }
      path.push("filegroups");
    } else {
      if id.package.0.is_empty() {
        path.push("__ROOT__");
      } else {
        path.push(&id.package.0);
      }
      path.push("targets");
      path.push(&id.target.0);
    }
    path.push(id.fingerprint.to_string());
    path
  }

  /// Whether the artifact is present. Does not read the content.
  pub fn exists(&self, id: &ArtifactId) -> Result<bool, CacheError> {
    let path = self.path(id);
    match fs::symlink_metadata(&path) {
      Ok(_) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(CacheError::io(path, e)),
    }
  }

  /// Open a file artifact for streaming reads.
  pub fn open(&self, id: &ArtifactId) -> Result<File, CacheError> {
    let path = self.path(id);
    File::open(&path).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        CacheError::NotFound(id.clone())
      } else {
        CacheError::io(path, e)
      }
    })
  }

  /// Read a file artifact through a callback.
  pub fn read<T>(&self, id: &ArtifactId, f: impl FnOnce(&mut dyn Read) -> io::Result<T>) -> Result<T, CacheError> {
    let mut file = self.open(id)?;
    f(&mut file).map_err(|e| CacheError::io(self.path(id), e))
  }

  /// Write a file artifact. Parent directories are created; an existing
  /// entry is overwritten.
  pub fn write(&self, id: &ArtifactId, f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<(), CacheError> {
    let path = self.path(id);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|e| CacheError::io(parent.to_path_buf(), e))?;
    }
    let mut file = File::create(&path).map_err(|e| CacheError::io(path.clone(), e))?;
    f(&mut file).map_err(|e| CacheError::io(path, e))
  }

  /// Scoped staging with atomic publish.
  ///
  /// `f` receives a fresh staging directory inside the cache root (so the
  /// final rename never crosses filesystems) and returns the path it
  /// populated, relative to that directory, together with the artifact id
  /// to publish it under. On success the staged entry is moved to
  /// `path(id)`, displacing any stale entry. The staging directory is
  /// removed on every exit path.
  pub fn temp_dir<E, F>(&self, f: F) -> Result<ArtifactId, E>
  where
    F: FnOnce(&Path) -> Result<(PathBuf, ArtifactId), E>,
    E: From<CacheError>,
  {
    let staging_root = self.root.join("tmp");
    fs::create_dir_all(&staging_root).map_err(|e| CacheError::io(staging_root.clone(), e))?;
    // Dropping `staging` removes it, on the error path included.
    let staging = tempfile::TempDir::new_in(&staging_root).map_err(|e| CacheError::io(staging_root, e))?;

    let (relative, id) = f(staging.path())?;

    let staged = staging.path().join(relative);
    if !staged.exists() {
      return Err(CacheError::MissingStaged { path: staged }.into());
    }

    let dest = self.path(&id);
    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).map_err(|e| CacheError::io(parent.to_path_buf(), e))?;
    }
    match fs::symlink_metadata(&dest) {
      Ok(meta) => {
        let removed = if meta.is_dir() {
          fs::remove_dir_all(&dest)
        } else {
          fs::remove_file(&dest)
        };
        removed.map_err(|e| CacheError::io(dest.clone(), e))?;
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => return Err(CacheError::io(dest, e).into()),
    }
    fs::rename(&staged, &dest).map_err(|e| CacheError::io(dest, e))?;
    Ok(id)
  }
}
