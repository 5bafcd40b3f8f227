//! Bundled plugins and the helpers plugin authors build on.
//!
//! A plugin materializes one builder type. The helpers here cover the two
//! things every build script ends up doing: staging its output for atomic
//! publication, and locating the artifacts of its declared dependencies.

pub mod command;
pub mod noop;

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kiln_core::cache::Cache;
use kiln_core::frozen::{self, Dag, InputError};
use kiln_core::plugin::{BuildError, Plugin};
use kiln_core::target::ArtifactId;

/// The plugins bundled with the engine.
pub fn registry() -> Vec<Plugin> {
  vec![noop::plugin(), command::plugin()]
}

/// The builtin macro modules bundled with the engine, keyed by the name
/// `load()` resolves them under.
pub fn builtin_modules() -> BTreeMap<String, String> {
  BTreeMap::from([("command".to_string(), command::BUILTIN_MODULE.to_string())])
}

/// Errors from walking a node's declared dependencies.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
  #[error("target {id}: {source}")]
  Input {
    id: ArtifactId,
    #[source]
    source: InputError,
  },

  #[error("dependency {dependency} of target {id} is not among its children")]
  UnknownDependency { id: ArtifactId, dependency: ArtifactId },

  #[error("target {id} (type '{builder_type}') is not a valid dependency here")]
  InvalidDependencyType { id: ArtifactId, builder_type: String },
}

/// Gather the cache paths of `dag` and its transitive dependencies.
///
/// Follows the conventional `dependencies` input field: each declared
/// artifact id is matched against the node's children and the walk recurses
/// into the match. Paths come back in topological order (dependencies
/// before dependents) with duplicates eliminated. `is_valid` filters the
/// builder types acceptable as dependencies; the root node is checked too.
pub fn dependency_paths(
  dag: &Dag,
  cache: &Cache,
  is_valid: &dyn Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, DependencyError> {
  let mut paths = Vec::new();
  let mut seen = HashSet::new();
  collect_dependency_paths(dag, cache, is_valid, &mut paths, &mut seen)?;
  Ok(paths)
}

fn collect_dependency_paths(
  dag: &Dag,
  cache: &Cache,
  is_valid: &dyn Fn(&str) -> bool,
  paths: &mut Vec<PathBuf>,
  seen: &mut HashSet<ArtifactId>,
) -> Result<(), DependencyError> {
  if !is_valid(&dag.target.builder_type) {
    return Err(DependencyError::InvalidDependencyType {
      id: dag.target.id.clone(),
      builder_type: dag.target.builder_type.clone(),
    });
  }

  if let Ok(declared) = frozen::get(&dag.target.inputs, "dependencies") {
    let declared = declared.expect_array().map_err(|e| DependencyError::Input {
      id: dag.target.id.clone(),
      source: e.at_key("dependencies"),
    })?;

    for (index, element) in declared.iter().enumerate() {
      let dependency = element.expect_artifact().map_err(|e| DependencyError::Input {
        id: dag.target.id.clone(),
        source: e.at_index(index).at_key("dependencies"),
      })?;

      let child = dag
        .dependencies
        .iter()
        .find(|child| child.target.id == *dependency)
        .ok_or_else(|| DependencyError::UnknownDependency {
          id: dag.target.id.clone(),
          dependency: dependency.clone(),
        })?;
      collect_dependency_paths(child, cache, is_valid, paths, seen)?;
    }
  }

  if seen.insert(dag.target.id.clone()) {
    paths.push(cache.path(&dag.target.id));
  }
  Ok(())
}

/// Run a build script body against a staging directory and publish its
/// output atomically.
///
/// The script receives the staging directory (its working area) and the
/// path it must leave the finished artifact at. Publication happens via the
/// cache's stage-then-rename discipline, so a failed script leaves nothing
/// behind at the artifact's canonical location.
pub fn stage_artifact(
  dag: &Dag,
  cache: &Cache,
  script: impl FnOnce(&Path, &Path) -> Result<(), BuildError>,
) -> Result<(), BuildError> {
  cache.temp_dir(|staging| {
    let output = staging.join("out");
    script(staging, &output)?;
    Ok::<_, BuildError>((PathBuf::from("out"), dag.target.id.clone()))
  })?;
  Ok(())
}
