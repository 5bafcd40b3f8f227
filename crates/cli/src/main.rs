//! kiln: a hermetic, content-addressed build orchestrator.
//!
//! Targets are declared in per-package `BUILD` files; kiln resolves every
//! target's transitive inputs, fingerprints them, and materializes the
//! corresponding artifacts in a local content-addressed cache. Repeat
//! invocations with unchanged inputs are no-ops.

mod cmd;
mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::{OwoColorize, Stream};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use context::Context;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(version, about = "Hermetic, content-addressed builds")]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Freeze a target and build its DAG
  Build {
    /// Target reference, e.g. //pkg:name
    target: String,
  },

  /// Print the evaluated target as JSON
  #[command(alias = "eval")]
  Show { target: String },

  /// Print the artifact's cache path without building
  #[command(name = "cache-path", alias = "path")]
  CachePath { target: String },

  /// Print the target's fingerprint
  Checksum { target: String },

  /// Print the frozen DAG as JSON
  Graph { target: String },

  /// Build a target, then execute its artifact
  Run {
    target: String,

    /// Arguments passed through to the artifact
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },
}

fn main() {
  let cli = Cli::parse();

  let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
  FmtSubscriber::builder()
    .with_max_level(level)
    .with_target(false)
    .without_time()
    .init();

  if let Err(e) = dispatch(cli.command) {
    let line = format!("error: {:#}", e);
    eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.red()));
    std::process::exit(1);
  }
}

fn dispatch(command: Commands) -> Result<()> {
  let ctx = Context::discover()?;
  match command {
    Commands::Build { target } => cmd::cmd_build(&ctx, &target),
    Commands::Show { target } => cmd::cmd_show(&ctx, &target),
    Commands::CachePath { target } => cmd::cmd_cache_path(&ctx, &target),
    Commands::Checksum { target } => cmd::cmd_checksum(&ctx, &target),
    Commands::Graph { target } => cmd::cmd_graph(&ctx, &target),
    Commands::Run { target, args } => cmd::cmd_run(&ctx, &target, &args),
  }
}
