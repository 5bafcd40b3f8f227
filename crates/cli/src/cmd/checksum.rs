use anyhow::Result;

use crate::context::Context;

/// Freeze the target and print its fingerprint.
pub fn cmd_checksum(ctx: &Context, target: &str) -> Result<()> {
  let dag = ctx.freeze(target)?;
  println!("{}", dag.target.id.fingerprint);
  Ok(())
}
