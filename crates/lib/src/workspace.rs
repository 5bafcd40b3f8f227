//! Workspace discovery.
//!
//! A workspace is the tree rooted at the nearest ancestor directory that
//! contains a regular file named `WORKSPACE`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The marker file that identifies a workspace root.
pub const WORKSPACE_MARKER: &str = "WORKSPACE";

#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("no WORKSPACE file found in '{}' or any parent directory", start.display())]
  NotFound { start: PathBuf },

  #[error("{}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Ascend from `start` until a directory containing a regular `WORKSPACE`
/// file is found.
pub fn find_root(start: &Path) -> Result<PathBuf, WorkspaceError> {
  let mut dir = start;
  loop {
    let marker = dir.join(WORKSPACE_MARKER);
    match fs::symlink_metadata(&marker) {
      Ok(meta) if meta.is_file() => return Ok(dir.to_path_buf()),
      Ok(_) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => return Err(WorkspaceError::Io { path: marker, source: e }),
    }
    match dir.parent() {
      Some(parent) => dir = parent,
      None => {
        return Err(WorkspaceError::NotFound {
          start: start.to_path_buf(),
        });
      }
    }
  }
}
