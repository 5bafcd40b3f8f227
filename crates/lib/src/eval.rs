//! `BUILD` file evaluation.
//!
//! An [`Evaluator`] interprets the macro surface of one package and yields
//! the targets it declares. The evaluator does not select a specific
//! target; callers filter by [`TargetId`](kiln_core::TargetId).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use kiln_core::{PackageName, Target};

use crate::lua::{EvalState, ModuleFrame, loaders, runtime};

/// Errors that can occur during evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
  /// A Lua-level failure: syntax errors, intrinsic misuse (invalid target
  /// names, `mktarget` from a builtin module), or a cycle in the load
  /// graph.
  #[error("lua error: {0}")]
  Lua(#[from] mlua::Error),

  /// The package's `BUILD` file could not be read.
  #[error("reading {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Evaluates `BUILD` files under one workspace root.
///
/// Builtin modules are library snippets bundled with the engine; `load()`
/// resolves them by name before falling back to package paths.
#[derive(Debug, Clone)]
pub struct Evaluator {
  root: PathBuf,
  builtins: BTreeMap<String, String>,
}

impl Evaluator {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      builtins: BTreeMap::new(),
    }
  }

  /// Register a builtin module under `name`, shadowing any package at the
  /// same path in `load()` resolution.
  pub fn register_builtin(&mut self, name: impl Into<String>, source: impl Into<String>) {
    self.builtins.insert(name.into(), source.into());
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Interpret `<root>/<package>/BUILD` and return every target registered
  /// during execution (targets of transitively loaded packages included),
  /// in registration order.
  pub fn evaluate(&self, package: &PackageName) -> Result<Vec<Target>, EvalError> {
    let path = self.root.join(&package.0).join("BUILD");
    let source = fs::read_to_string(&path).map_err(|e| EvalError::Io {
      path: path.clone(),
      source: e,
    })?;

    let state = Rc::new(RefCell::new(EvalState::default()));
    let lua = runtime::create_runtime(&self.root, &self.builtins, state.clone())?;
    loaders::exec_module(
      &lua,
      &state,
      &source,
      &format!("@{}", path.display()),
      ModuleFrame::Package(package.clone()),
    )?;

    let targets = std::mem::take(&mut state.borrow_mut().targets);
    debug!(package = %package, targets = targets.len(), "evaluated package");
    Ok(targets)
  }
}
