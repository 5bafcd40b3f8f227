//! The embedded Lua macro surface.
//!
//! `BUILD` files are Lua chunks executed in sandboxed per-module
//! environments with four intrinsics injected: `mktarget`, `glob`,
//! `reftarget`, and `load`. Builtin modules (library snippets bundled with
//! the engine) see only `mktarget`; they exist to define macros invoked
//! from user `BUILD` files, not to create targets themselves.

pub(crate) mod globals;
pub(crate) mod loaders;
pub(crate) mod runtime;

use std::collections::HashMap;

use mlua::prelude::*;

use kiln_core::{PackageName, Target};

/// Identity of the module whose chunk is currently executing. `mktarget`
/// and `glob` read the top of the frame stack to attribute declarations to
/// the calling package and to reject calls made at builtin-module load
/// time.
#[derive(Debug, Clone)]
pub(crate) enum ModuleFrame {
  Package(PackageName),
  Builtin(String),
}

/// A memoized `load()` result. `InProgress` marks a load already on the
/// stack; hitting it again is a cycle in the load graph.
#[derive(Clone)]
pub(crate) enum ModuleSlot {
  InProgress,
  Loaded(LuaTable),
}

/// Mutable evaluation state shared with the intrinsic closures.
#[derive(Default)]
pub(crate) struct EvalState {
  /// Targets registered by `mktarget`, in call order.
  pub targets: Vec<Target>,

  /// Stack of module identities; the top frame is the executing module.
  pub frames: Vec<ModuleFrame>,

  /// Load memoization, keyed by the `load()` argument.
  pub modules: HashMap<String, ModuleSlot>,
}
