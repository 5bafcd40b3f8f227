use anyhow::Result;

use kiln_lib::execute;
use kiln_lib::plugins;

use crate::context::Context;

/// Freeze the target and execute its DAG against the bundled plugins.
pub fn cmd_build(ctx: &Context, target: &str) -> Result<()> {
  let dag = ctx.freeze(target)?;
  execute::execute(&dag, &ctx.cache, &plugins::registry())?;
  Ok(())
}
