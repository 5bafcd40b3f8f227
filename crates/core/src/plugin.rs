//! The contract implemented by build extensions.
//!
//! A plugin pairs a builder type with a build script. The executor invokes
//! the script once per unsatisfied DAG node, after every child node's
//! artifact exists in the cache. On success the script must have left a
//! file or directory at `cache.path(&node.target.id)`; intermediate data
//! belongs in cache-managed staging directories (`Cache::temp_dir`).

use std::io::Write;

use crate::cache::Cache;
use crate::frozen::Dag;

/// Errors a build script may fail with. Scripts run external toolchains,
/// so the error type is open.
pub type BuildError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The operation a plugin implements. Human-readable progress goes to the
/// provided `stdout`/`stderr`; the executor buffers both and flushes them
/// only when the script fails.
pub type BuildScript =
  Box<dyn Fn(&Dag, &Cache, &mut dyn Write, &mut dyn Write) -> Result<(), BuildError> + Send + Sync>;

/// A build extension: one builder type and the script that materializes
/// artifacts of that type.
pub struct Plugin {
  pub builder_type: String,
  pub build: BuildScript,
}

impl Plugin {
  pub fn new(
    builder_type: impl Into<String>,
    build: impl Fn(&Dag, &Cache, &mut dyn Write, &mut dyn Write) -> Result<(), BuildError> + Send + Sync + 'static,
  ) -> Self {
    Self {
      builder_type: builder_type.into(),
      build: Box::new(build),
    }
  }
}

impl std::fmt::Debug for Plugin {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Plugin").field("builder_type", &self.builder_type).finish()
  }
}
