use anyhow::{Result, bail};

use crate::context::Context;

/// Print the evaluated target as JSON, without freezing it.
pub fn cmd_show(ctx: &Context, target: &str) -> Result<()> {
  let id = ctx.parse_target(target)?;
  let targets = ctx.evaluator.evaluate(&id.package)?;
  let Some(found) = targets.iter().find(|t| t.id == id) else {
    bail!("target not found: {}", id);
  };
  println!("{}", serde_json::to_string_pretty(found)?);
  Ok(())
}
