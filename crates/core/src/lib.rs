//! kiln-core: core types and logic for kiln.
//!
//! This crate provides the fundamental pieces shared by every stage of the
//! build pipeline:
//! - `checksum`: the 32-bit fingerprint primitives
//! - `target`: package/target identifiers and the target-reference grammar
//! - `input`: the pre-freeze input value model produced by evaluation
//! - `frozen`: the post-freeze value model, frozen targets, and the DAG
//! - `cache`: the content-addressed artifact cache
//! - `plugin`: the contract implemented by build extensions
//!
//! The types are macro-runtime agnostic; `kiln-lib` handles conversion
//! between Lua values and these types.

pub mod cache;
pub mod checksum;
pub mod frozen;
pub mod input;
pub mod plugin;
pub mod target;

pub use cache::{Cache, CacheError};
pub use checksum::{Fingerprint, checksum_bytes, checksum_string, join_checksums};
pub use frozen::{Dag, FrozenArray, FrozenField, FrozenInput, FrozenObject, FrozenTarget, InputError, KeySpec};
pub use input::{Array, Field, FileGroup, Input, Object, Target};
pub use plugin::{BuildError, BuildScript, Plugin};
pub use target::{ArtifactId, PackageName, TargetId, TargetIdError, TargetName, parse_target_id};
