//! The pre-freeze input value model.
//!
//! Evaluation lowers `BUILD` declarations into `Target` values whose inputs
//! are `Input` trees. These exist only between evaluation and freezing; the
//! freezer collapses target references and file groups into artifact ids,
//! producing the `frozen` model.

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeStruct};

use crate::target::{PackageName, TargetId};

/// An unresolved glob set rooted at a package directory.
///
/// Patterns are recorded verbatim at evaluation time; expansion is deferred
/// to freezing so that file contents contribute to the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileGroup {
  pub package: PackageName,
  pub patterns: Vec<String>,
}

impl std::fmt::Display for FileGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:[{}]", self.package, self.patterns.join(", "))
  }
}

/// One key/value pair of an [`Object`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  pub key: String,
  pub value: Input,
}

/// An ordered sequence of fields with unique keys. Order is preserved so
/// hashing is deterministic.
pub type Object = Vec<Field>;

/// An ordered sequence of inputs.
pub type Array = Vec<Input>;

/// A value appearing in a target's inputs before freezing.
///
/// Inline target definitions and string references both normalize to
/// `Target` at ingestion: the evaluator registers inline definitions as it
/// sees them and yields only the reference here.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
  Int(i64),
  String(String),
  Bool(bool),
  Target(TargetId),
  FileGroup(FileGroup),
  Object(Object),
  Array(Array),
}

impl Serialize for Input {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Input::Int(i) => serializer.serialize_i64(*i),
      Input::String(s) => serializer.serialize_str(s),
      Input::Bool(b) => serializer.serialize_bool(*b),
      Input::Target(tid) => serializer.collect_str(tid),
      Input::FileGroup(fg) => fg.serialize(serializer),
      Input::Object(fields) => {
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields {
          map.serialize_entry(&field.key, &field.value)?;
        }
        map.end()
      }
      Input::Array(items) => serializer.collect_seq(items),
    }
  }
}

/// A declarative build node: identity, inputs, and the builder type that
/// knows how to materialize it.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
  pub id: TargetId,
  pub inputs: Object,
  pub builder_type: String,
}

impl std::fmt::Display for Target {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Target({})", self.id)
  }
}

impl Serialize for Target {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_struct("Target", 4)?;
    out.serialize_field("package", &self.id.package)?;
    out.serialize_field("name", &self.id.target)?;
    out.serialize_field("type", &self.builder_type)?;
    out.serialize_field("inputs", &SerializeObject(&self.inputs))?;
    out.end()
  }
}

struct SerializeObject<'a>(&'a Object);

impl Serialize for SerializeObject<'_> {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for field in self.0 {
      map.serialize_entry(&field.key, &field.value)?;
    }
    map.end()
  }
}
