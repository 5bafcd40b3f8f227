//! Shared command context: workspace discovery, cache location, and the
//! evaluator wired with the bundled builtin modules.

use std::env;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use kiln_core::{Cache, Dag, TargetId, parse_target_id};
use kiln_lib::eval::Evaluator;
use kiln_lib::freeze;

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "KILN_CACHE_DIR";

pub struct Context {
  pub workspace: PathBuf,
  pub cwd: PathBuf,
  pub cache: Cache,
  pub evaluator: Evaluator,
}

impl Context {
  /// Discover the workspace from the current directory and wire up the
  /// cache and evaluator.
  pub fn discover() -> Result<Self> {
    let cwd = env::current_dir().context("resolving current directory")?;
    let workspace = kiln_lib::find_root(&cwd)?;

    let mut evaluator = Evaluator::new(&workspace);
    for (name, source) in kiln_lib::plugins::builtin_modules() {
      evaluator.register_builtin(name, source);
    }

    Ok(Self {
      workspace,
      cwd,
      cache: Cache::new(cache_root()),
      evaluator,
    })
  }

  /// Parse a target reference relative to the invocation directory.
  pub fn parse_target(&self, reference: &str) -> Result<TargetId> {
    Ok(parse_target_id(&self.workspace, &self.cwd, reference)?)
  }

  /// Freeze a target reference into its DAG.
  pub fn freeze(&self, reference: &str) -> Result<Dag> {
    let id = self.parse_target(reference)?;
    let dag = freeze::freeze(&self.workspace, &self.cache, &self.evaluator, &id)?;
    Ok(dag)
  }
}

/// The cache root: `KILN_CACHE_DIR` if set, else the per-user cache
/// directory.
fn cache_root() -> PathBuf {
  if let Ok(dir) = env::var(CACHE_DIR_ENV) {
    return PathBuf::from(dir);
  }
  dirs::cache_dir()
    .map(|dir| dir.join("kiln"))
    .unwrap_or_else(|| PathBuf::from(".kiln-cache"))
}
