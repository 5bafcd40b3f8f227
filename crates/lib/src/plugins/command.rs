//! The `command` plugin: run an arbitrary program that writes its artifact
//! to the path named by the `OUTPUT` environment variable.
//!
//! Inputs:
//! - `command` — the program; a string or an artifact reference.
//! - `args` — array of arguments; strings or artifact references.
//! - `environment` — object of extra environment variables; values are
//!   strings or artifact references.
//!
//! Artifact references resolve to their cache paths, which is how command
//! targets consume the outputs of the targets they depend on. The command
//! runs inside a cache staging directory; its output is published with the
//! stage-then-rename discipline.

use std::process::Command;

use kiln_core::cache::Cache;
use kiln_core::frozen::{FrozenInput, InputError, KeySpec, visit_keys};
use kiln_core::plugin::Plugin;

use super::stage_artifact;

/// Resolve a string-or-artifact input to a plain string.
fn string_or_path(value: &FrozenInput, cache: &Cache) -> Result<String, InputError> {
  match value {
    FrozenInput::String(s) => Ok(s.clone()),
    FrozenInput::Artifact(id) => Ok(cache.path(id).to_string_lossy().into_owned()),
    other => Err(InputError::Type {
      wanted: "String or Artifact",
      got: other.type_name(),
    }),
  }
}

pub fn plugin() -> Plugin {
  Plugin::new("command", |dag, cache, stdout, stderr| {
    let mut command = String::new();
    let mut args: Vec<String> = Vec::new();
    let mut environment: Vec<(String, String)> = Vec::new();

    visit_keys(
      &dag.target.inputs,
      &mut [
        KeySpec::new("command", |value| {
          command = string_or_path(value, cache)?;
          Ok(())
        }),
        KeySpec::new("args", |value| {
          for (index, element) in value.expect_array()?.iter().enumerate() {
            args.push(string_or_path(element, cache).map_err(|e| e.at_index(index))?);
          }
          Ok(())
        }),
        KeySpec::new("environment", |value| {
          for field in value.expect_object()? {
            let resolved = string_or_path(&field.value, cache).map_err(|e| e.at_key(&field.key))?;
            environment.push((field.key.clone(), resolved));
          }
          Ok(())
        }),
      ],
    )?;

    stage_artifact(dag, cache, |staging, output| {
      let result = Command::new(&command)
        .args(&args)
        .envs(environment)
        .env("OUTPUT", output)
        .current_dir(staging)
        .output()
        .map_err(|e| format!("spawning '{}': {}", command, e))?;

      stdout.write_all(&result.stdout)?;
      stderr.write_all(&result.stderr)?;

      if !result.status.success() {
        return Err(format!("'{}' exited with {}", command, result.status).into());
      }
      Ok(())
    })
  })
}

/// The Lua macro module `load("command")` resolves to.
pub const BUILTIN_MODULE: &str = r#"
function bash(spec)
  return mktarget({
    name = spec.name,
    type = "command",
    args = {
      command = "bash",
      args = { "-c", "set -e\n" .. spec.script },
      environment = spec.environment or {},
    },
  })
end
"#;
