use std::process::Command;

use anyhow::{Context as _, Result};

use kiln_lib::execute;
use kiln_lib::plugins;

use crate::context::Context;

/// Build the target, then execute its artifact as a process with
/// inherited stdio, exiting with the child's status.
pub fn cmd_run(ctx: &Context, target: &str, args: &[String]) -> Result<()> {
  let dag = ctx.freeze(target)?;
  execute::execute(&dag, &ctx.cache, &plugins::registry())?;

  let artifact = ctx.cache.path(&dag.target.id);
  let status = Command::new(&artifact)
    .args(args)
    .status()
    .with_context(|| format!("executing {}", artifact.display()))?;

  std::process::exit(status.code().unwrap_or(1));
}
