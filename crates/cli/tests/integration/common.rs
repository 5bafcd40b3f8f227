//! Shared test helpers for CLI integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Isolated test environment: a workspace and a cache of its own.
pub struct TestEnv {
  pub workspace: TempDir,
  pub cache: TempDir,
}

impl TestEnv {
  /// Create a workspace containing the given files (plus the `WORKSPACE`
  /// marker) and an empty cache.
  pub fn new(files: &[(&str, &str)]) -> Self {
    let workspace = TempDir::new().unwrap();
    fs::write(workspace.path().join("WORKSPACE"), "").unwrap();
    for (path, content) in files {
      let full = workspace.path().join(path);
      fs::create_dir_all(full.parent().unwrap()).unwrap();
      fs::write(full, content).unwrap();
    }
    Self {
      workspace,
      cache: TempDir::new().unwrap(),
    }
  }

  pub fn write(&self, path: &str, content: &str) {
    fs::write(self.workspace.path().join(path), content).unwrap();
  }

  pub fn cache_path(&self) -> &Path {
    self.cache.path()
  }

  /// A `kiln` command running inside the workspace with the isolated
  /// cache.
  pub fn kiln(&self) -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.current_dir(self.workspace.path());
    cmd.env("KILN_CACHE_DIR", self.cache.path());
    cmd
  }

  /// Same, but running from a subdirectory of the workspace.
  pub fn kiln_in(&self, subdir: &str) -> Command {
    let dir = self.workspace.path().join(subdir);
    fs::create_dir_all(&dir).unwrap();
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.current_dir(dir);
    cmd.env("KILN_CACHE_DIR", self.cache.path());
    cmd
  }
}

/// A `kiln` command in a directory that is not a workspace.
pub fn kiln_outside_workspace() -> (TempDir, Command) {
  let dir = TempDir::new().unwrap();
  let mut cmd = Command::cargo_bin("kiln").unwrap();
  cmd.current_dir(dir.path());
  (dir, cmd)
}

/// Every artifact path currently present in a cache directory.
pub fn cache_entries(root: &Path) -> Vec<PathBuf> {
  let mut out = Vec::new();
  let mut stack = vec![root.to_path_buf()];
  while let Some(dir) = stack.pop() {
    let Ok(entries) = fs::read_dir(&dir) else { continue };
    for entry in entries.flatten() {
      let path = entry.path();
      if path.is_dir() {
        stack.push(path);
      } else {
        out.push(path);
      }
    }
  }
  out
}
