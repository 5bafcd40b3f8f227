//! The post-freeze value model.
//!
//! Freezing collapses target references and file groups into [`ArtifactId`]s
//! and stamps every target with a content-derived fingerprint. Frozen values
//! are immutable for the lifetime of a build invocation.

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeStruct};
use thiserror::Error;

use crate::checksum::{Fingerprint, checksum_bool, checksum_int, checksum_string, join_checksums};
use crate::target::ArtifactId;

/// One key/value pair of a [`FrozenObject`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenField {
  pub key: String,
  pub value: FrozenInput,
}

/// An ordered sequence of frozen fields.
pub type FrozenObject = Vec<FrozenField>;

/// An ordered sequence of frozen inputs.
pub type FrozenArray = Vec<FrozenInput>;

/// A value appearing in a frozen target's inputs. Target references and
/// file groups have collapsed into [`ArtifactId`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum FrozenInput {
  Int(i64),
  String(String),
  Bool(bool),
  Artifact(ArtifactId),
  Object(FrozenObject),
  Array(FrozenArray),
}

/// Errors from shape-checking frozen inputs, carrying field-path context.
#[derive(Debug, Error)]
pub enum InputError {
  #[error("key not found: '{0}'")]
  KeyNotFound(String),

  #[error("expected {wanted}, found {got}")]
  Type { wanted: &'static str, got: &'static str },

  #[error("at key '{key}': {source}")]
  AtKey {
    key: String,
    #[source]
    source: Box<InputError>,
  },

  #[error("at index {index}: {source}")]
  AtIndex {
    index: usize,
    #[source]
    source: Box<InputError>,
  },
}

impl InputError {
  pub fn at_key(self, key: &str) -> Self {
    InputError::AtKey {
      key: key.to_string(),
      source: Box::new(self),
    }
  }

  pub fn at_index(self, index: usize) -> Self {
    InputError::AtIndex {
      index,
      source: Box::new(self),
    }
  }
}

impl FrozenInput {
  /// The variant name used in type errors.
  pub fn type_name(&self) -> &'static str {
    match self {
      FrozenInput::Int(_) => "Int",
      FrozenInput::String(_) => "String",
      FrozenInput::Bool(_) => "Bool",
      FrozenInput::Artifact(_) => "Artifact",
      FrozenInput::Object(_) => "Object",
      FrozenInput::Array(_) => "Array",
    }
  }

  fn type_error(&self, wanted: &'static str) -> InputError {
    InputError::Type {
      wanted,
      got: self.type_name(),
    }
  }

  pub fn expect_string(&self) -> Result<&str, InputError> {
    match self {
      FrozenInput::String(s) => Ok(s),
      other => Err(other.type_error("String")),
    }
  }

  pub fn expect_int(&self) -> Result<i64, InputError> {
    match self {
      FrozenInput::Int(i) => Ok(*i),
      other => Err(other.type_error("Int")),
    }
  }

  pub fn expect_bool(&self) -> Result<bool, InputError> {
    match self {
      FrozenInput::Bool(b) => Ok(*b),
      other => Err(other.type_error("Bool")),
    }
  }

  pub fn expect_artifact(&self) -> Result<&ArtifactId, InputError> {
    match self {
      FrozenInput::Artifact(id) => Ok(id),
      other => Err(other.type_error("Artifact")),
    }
  }

  pub fn expect_array(&self) -> Result<&FrozenArray, InputError> {
    match self {
      FrozenInput::Array(items) => Ok(items),
      other => Err(other.type_error("Array")),
    }
  }

  pub fn expect_object(&self) -> Result<&FrozenObject, InputError> {
    match self {
      FrozenInput::Object(fields) => Ok(fields),
      other => Err(other.type_error("Object")),
    }
  }

  /// The per-variant hash. Artifact ids contribute their fingerprint
  /// verbatim: a referenced artifact's identity *is* its contribution to
  /// the parent's fingerprint, which makes change propagation exact.
  pub fn checksum(&self) -> Fingerprint {
    match self {
      FrozenInput::Int(i) => checksum_int(*i),
      FrozenInput::String(s) => checksum_string(s),
      FrozenInput::Bool(b) => checksum_bool(*b),
      FrozenInput::Artifact(id) => id.fingerprint,
      FrozenInput::Object(fields) => checksum_object(fields),
      FrozenInput::Array(items) => checksum_array(items),
    }
  }
}

/// Fold an object's fields in declaration order: key, value, key, value.
pub fn checksum_object(fields: &FrozenObject) -> Fingerprint {
  let mut checksums = Vec::with_capacity(fields.len() * 2);
  for field in fields {
    checksums.push(checksum_string(&field.key));
    checksums.push(field.value.checksum());
  }
  join_checksums(&checksums)
}

/// Fold an array's elements in order.
pub fn checksum_array(items: &FrozenArray) -> Fingerprint {
  let checksums: Vec<Fingerprint> = items.iter().map(FrozenInput::checksum).collect();
  join_checksums(&checksums)
}

/// A named field with a validator, for declarative argument parsing.
///
/// Plugins declare the fields they consume as `(key, validator)` pairs and
/// get structured, field-annotated errors on mismatch.
pub struct KeySpec<'a> {
  pub key: &'static str,
  pub parse: Box<dyn FnMut(&FrozenInput) -> Result<(), InputError> + 'a>,
}

impl<'a> KeySpec<'a> {
  pub fn new(key: &'static str, parse: impl FnMut(&FrozenInput) -> Result<(), InputError> + 'a) -> Self {
    Self {
      key,
      parse: Box::new(parse),
    }
  }
}

/// Lookup by key: the first matching pair wins.
pub fn get<'o>(object: &'o FrozenObject, key: &str) -> Result<&'o FrozenInput, InputError> {
  object
    .iter()
    .find(|field| field.key == key)
    .map(|field| &field.value)
    .ok_or_else(|| InputError::KeyNotFound(key.to_string()))
}

/// Apply each spec's validator to its named field, returning the first
/// error annotated with the field it occurred at.
pub fn visit_keys(object: &FrozenObject, specs: &mut [KeySpec]) -> Result<(), InputError> {
  for spec in specs {
    let value = get(object, spec.key).map_err(|e| e.at_key(spec.key))?;
    (spec.parse)(value).map_err(|e| e.at_key(spec.key))?;
  }
  Ok(())
}

impl Serialize for FrozenInput {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      FrozenInput::Int(i) => serializer.serialize_i64(*i),
      FrozenInput::String(s) => serializer.serialize_str(s),
      FrozenInput::Bool(b) => serializer.serialize_bool(*b),
      FrozenInput::Artifact(id) => id.serialize(serializer),
      FrozenInput::Object(fields) => {
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields {
          map.serialize_entry(&field.key, &field.value)?;
        }
        map.end()
      }
      FrozenInput::Array(items) => serializer.collect_seq(items),
    }
  }
}

/// An immutable target snapshot with all inputs resolved to primitives and
/// artifact ids.
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenTarget {
  pub id: ArtifactId,
  pub inputs: FrozenObject,
  pub builder_type: String,
}

/// A frozen target plus its child nodes: the unit the executor walks.
#[derive(Debug, Clone, PartialEq)]
pub struct Dag {
  pub target: FrozenTarget,
  pub dependencies: Vec<Dag>,
}

impl Serialize for Dag {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_struct("Dag", 4)?;
    out.serialize_field("id", &self.target.id)?;
    out.serialize_field("type", &self.target.builder_type)?;
    out.serialize_field("inputs", &FrozenInput::Object(self.target.inputs.clone()))?;
    out.serialize_field("dependencies", &self.dependencies)?;
    out.end()
  }
}
