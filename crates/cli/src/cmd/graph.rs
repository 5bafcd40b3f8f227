use anyhow::Result;

use crate::context::Context;

/// Freeze the target and print the resulting DAG as JSON.
pub fn cmd_graph(ctx: &Context, target: &str) -> Result<()> {
  let dag = ctx.freeze(target)?;
  println!("{}", serde_json::to_string_pretty(&dag)?);
  Ok(())
}
