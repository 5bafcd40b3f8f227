use anyhow::Result;

use crate::context::Context;

/// Freeze the target and print where its artifact lives, without building.
pub fn cmd_cache_path(ctx: &Context, target: &str) -> Result<()> {
  let dag = ctx.freeze(target)?;
  println!("{}", ctx.cache.path(&dag.target.id).display());
  Ok(())
}
