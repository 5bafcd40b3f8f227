//! Module execution environments and the `load()` intrinsic.
//!
//! Every module (the `BUILD` file under evaluation, loaded packages, and
//! builtin modules) executes in a fresh environment table. Reads fall
//! through to a scope table holding the intrinsics the module kind is
//! allowed to see, and from there to the Lua globals; writes stay in the
//! environment, which doubles as the module's export table.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

use kiln_core::PackageName;

use crate::lua::{EvalState, ModuleFrame, ModuleSlot};

/// Registry key for the intrinsics table.
pub(crate) const INTRINSICS_KEY: &str = "kiln.intrinsics";

/// Execute a module chunk in a fresh environment and return that
/// environment as the module's export table.
pub(crate) fn exec_module(
  lua: &Lua,
  state: &Rc<RefCell<EvalState>>,
  source: &str,
  chunk_name: &str,
  frame: ModuleFrame,
) -> LuaResult<LuaTable> {
  let intrinsics: LuaTable = lua.named_registry_value(INTRINSICS_KEY)?;

  // Builtin modules see only mktarget.
  let scope = lua.create_table()?;
  scope.set("mktarget", intrinsics.get::<LuaFunction>("mktarget")?)?;
  if matches!(frame, ModuleFrame::Package(_)) {
    for name in ["glob", "reftarget", "load"] {
      scope.set(name, intrinsics.get::<LuaFunction>(name)?)?;
    }
  }
  let scope_mt = lua.create_table()?;
  scope_mt.set("__index", lua.globals())?;
  scope.set_metatable(Some(scope_mt))?;

  let env = lua.create_table()?;
  let env_mt = lua.create_table()?;
  env_mt.set("__index", scope)?;
  env.set_metatable(Some(env_mt))?;

  state.borrow_mut().frames.push(frame);
  let result = lua
    .load(source)
    .set_name(chunk_name)
    .set_environment(env.clone())
    .exec();
  state.borrow_mut().frames.pop();
  result?;

  Ok(env)
}

/// Register the `load()` intrinsic.
///
/// `load("mod")` executes a registered builtin module's embedded source, or
/// else `<root>/<mod>/BUILD`, and returns the module's export table. With
/// explicit names, `load("mod", "a", "b")` returns those members instead.
/// Loads are memoized per evaluation; a module whose load is already in
/// progress fails with a cycle error.
pub(crate) fn register(
  lua: &Lua,
  intrinsics: &LuaTable,
  root: &Path,
  builtins: &BTreeMap<String, String>,
  state: Rc<RefCell<EvalState>>,
) -> LuaResult<()> {
  let root = root.to_path_buf();
  let builtins = builtins.clone();

  let load = lua.create_function(move |lua, (module, names): (String, LuaVariadic<String>)| {
    let slot = state.borrow().modules.get(&module).cloned();
    let env = match slot {
      Some(ModuleSlot::Loaded(env)) => env,
      Some(ModuleSlot::InProgress) => {
        return Err(LuaError::external(format!(
          "cycle in load graph: '{}' is already being loaded",
          module
        )));
      }
      None => {
        state
          .borrow_mut()
          .modules
          .insert(module.clone(), ModuleSlot::InProgress);
        match load_module(lua, &state, &root, &builtins, &module) {
          Ok(env) => {
            state
              .borrow_mut()
              .modules
              .insert(module.clone(), ModuleSlot::Loaded(env.clone()));
            env
          }
          Err(e) => {
            state.borrow_mut().modules.remove(&module);
            return Err(e);
          }
        }
      }
    };

    if names.is_empty() {
      return Ok(LuaMultiValue::from_iter([LuaValue::Table(env)]));
    }
    let mut values = Vec::with_capacity(names.len());
    for name in names.iter() {
      let value: LuaValue = env.raw_get(name.as_str())?;
      if value == LuaValue::Nil {
        return Err(LuaError::external(format!(
          "module '{}' does not define '{}'",
          module, name
        )));
      }
      values.push(value);
    }
    Ok(LuaMultiValue::from_iter(values))
  })?;
  intrinsics.set("load", load)?;

  Ok(())
}

fn load_module(
  lua: &Lua,
  state: &Rc<RefCell<EvalState>>,
  root: &Path,
  builtins: &BTreeMap<String, String>,
  module: &str,
) -> LuaResult<LuaTable> {
  if let Some(source) = builtins.get(module) {
    debug!(module, "loading builtin module");
    return exec_module(
      lua,
      state,
      source,
      &format!("builtin://{}", module),
      ModuleFrame::Builtin(module.to_string()),
    );
  }

  // Not a builtin: interpret as a package path relative to the workspace.
  let path = root.join(module).join("BUILD");
  debug!(module, path = %path.display(), "loading package module");
  let source = fs::read_to_string(&path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", path.display(), e)))?;
  exec_module(
    lua,
    state,
    &source,
    &format!("@{}", path.display()),
    ModuleFrame::Package(PackageName(module.to_string())),
  )
}
