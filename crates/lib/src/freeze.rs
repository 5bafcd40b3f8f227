//! Target freezing: lowering declarations into a fingerprinted DAG.
//!
//! Freezing walks a target's input tree, materializes file groups into the
//! cache, recurses into referenced targets, and produces immutable frozen
//! targets addressed by `(package, name, fingerprint)`. The same frozen
//! input tree always yields the same fingerprint, and every artifact id
//! embedded in a frozen input is reachable as a node in the returned DAG.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use kiln_core::cache::{Cache, CacheError};
use kiln_core::checksum::{checksum_bytes, checksum_string, join_checksums};
use kiln_core::frozen::{self, Dag, FrozenField, FrozenInput, FrozenTarget};
use kiln_core::input::{FileGroup, Input, Object, Target};
use kiln_core::target::{ArtifactId, PackageName, TargetId};

use crate::eval::{EvalError, Evaluator};

/// Errors that can occur during freezing.
#[derive(Debug, thiserror::Error)]
pub enum FreezeError {
  #[error("target not found: {0}")]
  TargetNotFound(TargetId),

  #[error("dependency cycle detected at {0}")]
  DependencyCycle(TargetId),

  #[error(transparent)]
  Eval(#[from] EvalError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error("invalid glob pattern '{pattern}': {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("glob '{pattern}': {source}")]
  Glob {
    pattern: String,
    #[source]
    source: glob::GlobError,
  },

  #[error("glob match {} is outside its package directory", path.display())]
  MatchOutsidePackage { path: PathBuf },

  #[error("reading {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("freezing target {id}: {source}")]
  Target {
    id: TargetId,
    #[source]
    source: Box<FreezeError>,
  },
}

/// Freeze one target into a DAG.
pub fn freeze(
  root: &Path,
  cache: &Cache,
  evaluator: &Evaluator,
  id: &TargetId,
) -> Result<Dag, FreezeError> {
  Freezer::new(root, cache, evaluator).freeze_target_id(id)
}

/// Freezes targets, memoizing per [`TargetId`] so repeated references
/// within one invocation become shared nodes and reference cycles become
/// errors. Single-threaded by design: output is deterministic and the memo
/// is not synchronized.
pub struct Freezer<'a> {
  root: &'a Path,
  cache: &'a Cache,
  evaluator: &'a Evaluator,
  memo: HashMap<TargetId, Dag>,
  in_progress: HashSet<TargetId>,
  packages: HashMap<PackageName, Vec<Target>>,
}

impl<'a> Freezer<'a> {
  pub fn new(root: &'a Path, cache: &'a Cache, evaluator: &'a Evaluator) -> Self {
    Self {
      root,
      cache,
      evaluator,
      memo: HashMap::new(),
      in_progress: HashSet::new(),
      packages: HashMap::new(),
    }
  }

  /// Resolve a target reference by evaluating its package, then freeze it.
  pub fn freeze_target_id(&mut self, id: &TargetId) -> Result<Dag, FreezeError> {
    if let Some(dag) = self.memo.get(id) {
      return Ok(dag.clone());
    }
    if self.in_progress.contains(id) {
      return Err(FreezeError::DependencyCycle(id.clone()));
    }

    let target = self.lookup(id)?.clone();

    self.in_progress.insert(id.clone());
    let result = self.freeze_target(&target);
    self.in_progress.remove(id);

    let dag = result.map_err(|e| FreezeError::Target {
      id: id.clone(),
      source: Box::new(e),
    })?;
    self.memo.insert(id.clone(), dag.clone());
    Ok(dag)
  }

  fn lookup(&mut self, id: &TargetId) -> Result<&Target, FreezeError> {
    if !self.packages.contains_key(&id.package) {
      let targets = self.evaluator.evaluate(&id.package)?;
      self.packages.insert(id.package.clone(), targets);
    }
    self.packages[&id.package]
      .iter()
      .find(|t| t.id == *id)
      .ok_or_else(|| FreezeError::TargetNotFound(id.clone()))
  }

  /// Freeze an evaluated target directly.
  pub fn freeze_target(&mut self, target: &Target) -> Result<Dag, FreezeError> {
    let (dependencies, inputs) = self.freeze_object(&target.inputs)?;

    let fingerprint = join_checksums(&[
      checksum_string(&target.id.package.0),
      checksum_string(&target.id.target.0),
      checksum_string(&target.builder_type),
      frozen::checksum_object(&inputs),
    ]);

    let id = ArtifactId {
      package: target.id.package.clone(),
      target: target.id.target.clone(),
      fingerprint,
    };
    debug!(id = %id, "froze target");

    Ok(Dag {
      target: FrozenTarget {
        id,
        inputs,
        builder_type: target.builder_type.clone(),
      },
      dependencies,
    })
  }

  fn freeze_input(&mut self, input: &Input) -> Result<(Vec<Dag>, FrozenInput), FreezeError> {
    match input {
      Input::Int(i) => Ok((Vec::new(), FrozenInput::Int(*i))),
      Input::String(s) => Ok((Vec::new(), FrozenInput::String(s.clone()))),
      Input::Bool(b) => Ok((Vec::new(), FrozenInput::Bool(*b))),
      Input::Target(id) => {
        let dag = self.freeze_target_id(id)?;
        let artifact = dag.target.id.clone();
        Ok((vec![dag], FrozenInput::Artifact(artifact)))
      }
      Input::FileGroup(group) => {
        let artifact = self.freeze_file_group(group)?;
        Ok((Vec::new(), FrozenInput::Artifact(artifact)))
      }
      Input::Object(fields) => {
        let (dependencies, frozen) = self.freeze_object(fields)?;
        Ok((dependencies, FrozenInput::Object(frozen)))
      }
      Input::Array(items) => {
        let mut dependencies = Vec::new();
        let mut frozen = Vec::with_capacity(items.len());
        for item in items {
          let (item_deps, value) = self.freeze_input(item)?;
          dependencies.extend(item_deps);
          frozen.push(value);
        }
        Ok((dependencies, FrozenInput::Array(frozen)))
      }
    }
  }

  fn freeze_object(&mut self, fields: &Object) -> Result<(Vec<Dag>, Vec<FrozenField>), FreezeError> {
    let mut dependencies = Vec::new();
    let mut frozen = Vec::with_capacity(fields.len());
    for field in fields {
      let (field_deps, value) = self.freeze_input(&field.value)?;
      dependencies.extend(field_deps);
      frozen.push(FrozenField {
        key: field.key.clone(),
        value,
      });
    }
    Ok((dependencies, frozen))
  }

  /// Expand a file group's patterns, hash the matched files in match
  /// order, and publish the staged tree to the cache.
  ///
  /// Each matched file is staged at its workspace-relative path and
  /// contributes `combine(hash(relpath), hash(bytes))`; the group
  /// fingerprint is `combine(hash(package), h1, ..., hn)`. A group
  /// matching zero files is tolerated and publishes an empty tree.
  fn freeze_file_group(&mut self, group: &FileGroup) -> Result<ArtifactId, FreezeError> {
    let dir = self.root.join(&group.package.0);

    let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
    for pattern in &group.patterns {
      // Anchor the pattern at the package directory so matches come back
      // as absolute paths, then strip the prefix off again.
      let anchored = dir.join(pattern);
      let matches = glob::glob(&anchored.to_string_lossy()).map_err(|e| FreezeError::Pattern {
        pattern: pattern.clone(),
        source: e,
      })?;
      for entry in matches {
        let path = entry.map_err(|e| FreezeError::Glob {
          pattern: pattern.clone(),
          source: e,
        })?;
        if !path.is_file() {
          continue;
        }
        let relative = match path.strip_prefix(&dir) {
          Ok(relative) => relative.to_path_buf(),
          Err(_) => return Err(FreezeError::MatchOutsidePackage { path }),
        };
        files.push((path, relative));
      }
    }

    let id = self.cache.temp_dir(|stage| {
      let tree = stage.join("files");
      fs::create_dir_all(&tree).map_err(|e| FreezeError::Io {
        path: tree.clone(),
        source: e,
      })?;

      let mut checksums = vec![checksum_string(&group.package.0)];
      for (path, relative) in &files {
        let data = fs::read(path).map_err(|e| FreezeError::Io {
          path: path.clone(),
          source: e,
        })?;
        checksums.push(join_checksums(&[
          checksum_string(&relative.to_string_lossy()),
          checksum_bytes(&data),
        ]));

        let dest = tree.join(&group.package.0).join(relative);
        if let Some(parent) = dest.parent() {
          fs::create_dir_all(parent).map_err(|e| FreezeError::Io {
            path: parent.to_path_buf(),
            source: e,
          })?;
        }
        fs::write(&dest, &data).map_err(|e| FreezeError::Io { path: dest, source: e })?;
      }

      let fingerprint = join_checksums(&checksums);
      debug!(group = %group, fingerprint, files = files.len(), "froze file group");
      Ok::<_, FreezeError>((
        PathBuf::from("files"),
        ArtifactId::file_group(group.package.clone(), fingerprint),
      ))
    })?;
    Ok(id)
  }
}
