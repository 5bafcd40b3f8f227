//! The `mktarget`, `glob`, and `reftarget` intrinsics, and conversion
//! between Lua values and the input value model.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;

use kiln_core::{Field, FileGroup, Input, Object, PackageName, Target, TargetId, TargetName, parse_target_id};

use crate::lua::{EvalState, ModuleFrame};

/// A target reference value as seen by Lua code. Returned by `mktarget`
/// and `reftarget`, consumed wherever an input is expected.
#[derive(Debug, Clone)]
pub(crate) struct TargetRef(pub TargetId);

impl LuaUserData for TargetRef {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.0.to_string()));
  }
}

/// An unresolved file group as seen by Lua code. Returned by `glob`.
#[derive(Debug, Clone)]
pub(crate) struct FileGroupRef(pub FileGroup);

impl LuaUserData for FileGroupRef {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.0.to_string()));
  }
}

/// The package of the currently executing module, or an error naming
/// `intrinsic` when called from a builtin module or outside evaluation.
fn current_package(state: &Rc<RefCell<EvalState>>, intrinsic: &str) -> LuaResult<PackageName> {
  match state.borrow().frames.last() {
    Some(ModuleFrame::Package(package)) => Ok(package.clone()),
    Some(ModuleFrame::Builtin(module)) => Err(LuaError::external(format!(
      "{} may not be called while loading builtin module '{}'",
      intrinsic, module
    ))),
    None => Err(LuaError::external(format!("{} called outside a module", intrinsic))),
  }
}

pub(crate) fn register(
  lua: &Lua,
  intrinsics: &LuaTable,
  root: &Path,
  state: Rc<RefCell<EvalState>>,
) -> LuaResult<()> {
  let mktarget_state = state.clone();
  let mktarget = lua.create_function(move |_, spec: LuaTable| {
    let package = current_package(&mktarget_state, "mktarget")?;

    let name = match spec.get::<LuaValue>("name")? {
      LuaValue::String(s) => s.to_str()?.to_string(),
      LuaValue::Nil => return Err(LuaError::external("mktarget requires a 'name' field")),
      other => {
        return Err(LuaError::external(format!(
          "'name' must be a string, got {}",
          other.type_name()
        )));
      }
    };
    if name.is_empty() || name.contains('/') {
      return Err(LuaError::external(format!("invalid value for 'name': '{}'", name)));
    }

    let builder_type = match spec.get::<LuaValue>("type")? {
      LuaValue::String(s) => s.to_str()?.to_string(),
      LuaValue::Nil => return Err(LuaError::external("mktarget requires a 'type' field")),
      other => {
        return Err(LuaError::external(format!(
          "'type' must be a string, got {}",
          other.type_name()
        )));
      }
    };

    let inputs = match spec.get::<LuaValue>("args")? {
      LuaValue::Table(args) => table_to_object(&args)?,
      LuaValue::Nil => return Err(LuaError::external("mktarget requires an 'args' table")),
      other => {
        return Err(LuaError::external(format!(
          "'args' must be a table, got {}",
          other.type_name()
        )));
      }
    };

    let id = TargetId {
      package,
      target: TargetName(name),
    };
    mktarget_state.borrow_mut().targets.push(Target {
      id: id.clone(),
      inputs,
      builder_type,
    });
    Ok(TargetRef(id))
  })?;
  intrinsics.set("mktarget", mktarget)?;

  let glob_state = state.clone();
  let glob = lua.create_function(move |_, patterns: LuaVariadic<String>| {
    let package = current_package(&glob_state, "glob")?;
    Ok(FileGroupRef(FileGroup {
      package,
      patterns: patterns.into_iter().collect(),
    }))
  })?;
  intrinsics.set("glob", glob)?;

  let reftarget_state = state;
  let reftarget_root = root.to_path_buf();
  let reftarget = lua.create_function(move |_, reference: String| {
    let package = current_package(&reftarget_state, "reftarget")?;
    let cwd = reftarget_root.join(&package.0);
    let id = parse_target_id(&reftarget_root, &cwd, &reference).map_err(LuaError::external)?;
    Ok(TargetRef(id))
  })?;
  intrinsics.set("reftarget", reftarget)?;

  Ok(())
}

/// Convert a Lua value into an [`Input`].
///
/// Tables with a non-empty array part become arrays; all other tables
/// become objects keyed by string.
pub(crate) fn lua_value_to_input(value: LuaValue) -> LuaResult<Input> {
  match value {
    LuaValue::Boolean(b) => Ok(Input::Bool(b)),
    LuaValue::Integer(i) => Ok(Input::Int(i)),
    LuaValue::Number(n) => {
      if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Ok(Input::Int(n as i64))
      } else {
        Err(LuaError::external(format!(
          "unsupported input value {}: only integers are allowed",
          n
        )))
      }
    }
    LuaValue::String(s) => Ok(Input::String(s.to_str()?.to_string())),
    LuaValue::Table(table) => table_to_input(&table),
    LuaValue::UserData(ud) => {
      if let Ok(target) = ud.borrow::<TargetRef>() {
        Ok(Input::Target(target.0.clone()))
      } else if let Ok(group) = ud.borrow::<FileGroupRef>() {
        Ok(Input::FileGroup(group.0.clone()))
      } else {
        Err(LuaError::external("unsupported input type: foreign userdata"))
      }
    }
    other => Err(LuaError::external(format!(
      "unsupported input type: {}",
      other.type_name()
    ))),
  }
}

fn table_to_input(table: &LuaTable) -> LuaResult<Input> {
  let len = table.raw_len();
  if len > 0 {
    let mut items = Vec::with_capacity(len);
    for i in 1..=len {
      let value: LuaValue = table.raw_get(i)?;
      let item =
        lua_value_to_input(value).map_err(|e| LuaError::external(format!("at index {}: {}", i, e)))?;
      items.push(item);
    }
    Ok(Input::Array(items))
  } else {
    Ok(Input::Object(table_to_object(table)?))
  }
}

/// Convert a Lua table into an [`Object`].
///
/// Lua tables expose no insertion order, so fields are canonicalized by
/// sorting on key; the stored order is what hashing folds.
pub(crate) fn table_to_object(table: &LuaTable) -> LuaResult<Object> {
  let mut fields = Vec::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    let LuaValue::String(key) = key else {
      return Err(LuaError::external(format!(
        "object keys must be strings, got {}",
        key.type_name()
      )));
    };
    let key = key.to_str()?.to_string();
    let value =
      lua_value_to_input(value).map_err(|e| LuaError::external(format!("at key '{}': {}", key, e)))?;
    fields.push(Field { key, value });
  }
  fields.sort_by(|a, b| a.key.cmp(&b.key));
  Ok(fields)
}
