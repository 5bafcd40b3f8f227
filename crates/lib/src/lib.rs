//! kiln-lib: the kiln engine.
//!
//! Turns declarative `BUILD` files into materialized artifacts in three
//! stages:
//! 1. `eval` interprets the Lua macro surface per package, yielding target
//!    declarations.
//! 2. `freeze` snapshots file groups into the cache, fingerprints every
//!    input, and lowers the requested target into an immutable DAG.
//! 3. `execute` walks the DAG across a worker pool, skipping artifacts the
//!    cache already holds and dispatching the rest to plugins.
//!
//! `plugins` carries the bundled build extensions and the helpers plugin
//! authors use; `workspace` finds the workspace root.

pub mod eval;
pub mod execute;
pub mod freeze;
pub mod plugins;
pub mod workspace;

mod lua;

pub use eval::{EvalError, Evaluator};
pub use execute::{ExecuteError, execute, execute_with_workers};
pub use freeze::{FreezeError, Freezer, freeze};
pub use workspace::{WorkspaceError, find_root};
