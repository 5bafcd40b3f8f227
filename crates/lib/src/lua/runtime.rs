use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;

use crate::lua::{EvalState, globals, loaders};

/// Create a Lua runtime for one evaluation.
///
/// The intrinsics are not installed as process-wide globals; they live in a
/// registry table and `loaders::exec_module` injects the subset each module
/// kind is allowed to see.
pub(crate) fn create_runtime(
  root: &Path,
  builtins: &BTreeMap<String, String>,
  state: Rc<RefCell<EvalState>>,
) -> LuaResult<Lua> {
  let lua = Lua::new();

  let intrinsics = lua.create_table()?;
  globals::register(&lua, &intrinsics, root, state.clone())?;
  loaders::register(&lua, &intrinsics, root, builtins, state)?;
  lua.set_named_registry_value(loaders::INTRINSICS_KEY, intrinsics)?;

  Ok(lua)
}
