//! The `noop` plugin: writes a fixed payload. Exists so wiring can be
//! exercised end-to-end without any external toolchain.

use kiln_core::plugin::Plugin;

pub fn plugin() -> Plugin {
  Plugin::new("noop", |dag, cache, stdout, _stderr| {
    writeln!(stdout, "noop {}", dag.target.id)?;
    cache.write(&dag.target.id, |w| w.write_all(b"noop\n"))?;
    Ok(())
  })
}
