//! DAG execution.
//!
//! The executor walks a frozen DAG bottom-up across a worker pool of
//! `2 × CPU` threads, probing the cache before dispatching each node to the
//! plugin registered for its builder type. Satisfied nodes are skipped with
//! a "found" progress line; unsatisfied nodes run their plugin with
//! buffered output, flushed (stderr in red) only on failure.
//!
//! Ordering guarantee: for any edge child → parent, the parent's plugin is
//! invoked strictly after the child's invocation has returned successfully.
//! Cancellation is cooperative: after the first error no new node work
//! begins, in-flight plugin invocations complete, and the last observed
//! error is returned.

mod node;

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use owo_colors::{OwoColorize, Stream};

use kiln_core::cache::{Cache, CacheError};
use kiln_core::frozen::Dag;
use kiln_core::plugin::{BuildError, Plugin};
use kiln_core::target::ArtifactId;

use node::Node;

/// Errors that can occur during execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
  #[error("no plugin for builder type '{builder_type}' (target {id})")]
  PluginNotFound { builder_type: String, id: ArtifactId },

  #[error("building target {id}: {source}")]
  Plugin {
    id: ArtifactId,
    #[source]
    source: BuildError,
  },

  #[error(transparent)]
  Cache(#[from] CacheError),
}

/// Execute a DAG with the default worker pool of `2 × CPU` threads.
pub fn execute(dag: &Dag, cache: &Cache, plugins: &[Plugin]) -> Result<(), ExecuteError> {
  let cpus = thread::available_parallelism().map(|p| p.get()).unwrap_or(4);
  execute_with_workers(dag, cache, plugins, 2 * cpus)
}

/// Execute a DAG with an explicit worker count.
pub fn execute_with_workers(
  dag: &Dag,
  cache: &Cache,
  plugins: &[Plugin],
  workers: usize,
) -> Result<(), ExecuteError> {
  let reporter = Reporter::default();
  let mut nodes = HashMap::new();
  let root = build_node(dag, cache, plugins, &reporter, &mut nodes);
  node::process_concurrently(&root, workers)
}

/// Lower the DAG into executable nodes, deduplicating by artifact id so
/// that shared subgraphs become shared nodes and run exactly once.
fn build_node<'a>(
  dag: &Dag,
  cache: &'a Cache,
  plugins: &'a [Plugin],
  reporter: &'a Reporter,
  nodes: &mut HashMap<ArtifactId, Arc<Node<'a, ExecuteError>>>,
) -> Arc<Node<'a, ExecuteError>> {
  if let Some(existing) = nodes.get(&dag.target.id) {
    return existing.clone();
  }

  let mut children = Vec::new();
  let mut child_ids = Vec::new();
  for dependency in &dag.dependencies {
    if child_ids.contains(&dependency.target.id) {
      continue;
    }
    child_ids.push(dependency.target.id.clone());
    children.push(build_node(dependency, cache, plugins, reporter, nodes));
  }

  let work_dag = dag.clone();
  let node = Node::new(dag.target.id.to_string(), children, move || {
    execute_node(&work_dag, cache, plugins, reporter)
  });
  nodes.insert(dag.target.id.clone(), node.clone());
  node
}

fn execute_node(dag: &Dag, cache: &Cache, plugins: &[Plugin], reporter: &Reporter) -> Result<(), ExecuteError> {
  let id = &dag.target.id;
  let plugin = plugins
    .iter()
    .find(|p| p.builder_type == dag.target.builder_type)
    .ok_or_else(|| ExecuteError::PluginNotFound {
      builder_type: dag.target.builder_type.clone(),
      id: id.clone(),
    })?;

  if cache.exists(id)? {
    reporter.found(id);
    return Ok(());
  }
  reporter.building(id);

  let mut stdout = Vec::new();
  let mut stderr = Vec::new();
  match (plugin.build)(dag, cache, &mut stdout, &mut stderr) {
    Ok(()) => Ok(()),
    Err(source) => {
      reporter.flush_failure(&stdout, &stderr);
      Err(ExecuteError::Plugin {
        id: id.clone(),
        source,
      })
    }
  }
}

/// Serializes progress lines from concurrent workers.
#[derive(Default)]
struct Reporter {
  lock: Mutex<()>,
}

impl Reporter {
  fn found(&self, id: &ArtifactId) {
    let _guard = self.lock.lock();
    let line = format!("Found artifact {}", id);
    println!("{}", line.if_supports_color(Stream::Stdout, |s| s.green()));
  }

  fn building(&self, id: &ArtifactId) {
    let _guard = self.lock.lock();
    let line = format!("Building {}", id);
    println!("{}", line.if_supports_color(Stream::Stdout, |s| s.yellow()));
  }

  /// On plugin failure, copy the plugin's stdout to our stderr verbatim and
  /// its stderr after it in red.
  fn flush_failure(&self, stdout: &[u8], stderr: &[u8]) {
    let _guard = self.lock.lock();
    let mut sink = io::stderr();
    let _ = sink.write_all(stdout);
    let text = String::from_utf8_lossy(stderr);
    if !text.is_empty() {
      eprintln!("{}", text.if_supports_color(Stream::Stderr, |s| s.red()));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use kiln_core::frozen::{FrozenField, FrozenInput, FrozenTarget};
  use kiln_core::target::{PackageName, TargetName};
  use std::sync::atomic::{AtomicU32, Ordering};
  use tempfile::TempDir;

  fn frozen(name: &str, builder_type: &str, dependencies: Vec<Dag>) -> Dag {
    let fields: Vec<FrozenField> = dependencies
      .iter()
      .enumerate()
      .map(|(i, dep)| FrozenField {
        key: format!("dep{}", i),
        value: FrozenInput::Artifact(dep.target.id.clone()),
      })
      .collect();
    Dag {
      target: FrozenTarget {
        id: ArtifactId {
          package: PackageName("p".to_string()),
          target: TargetName(name.to_string()),
          fingerprint: kiln_core::checksum_string(name),
        },
        inputs: fields,
        builder_type: builder_type.to_string(),
      },
      dependencies,
    }
  }

  fn counting_plugin(builder_type: &str, counter: Arc<AtomicU32>) -> Plugin {
    Plugin::new(builder_type, move |dag, cache, _stdout, _stderr| {
      counter.fetch_add(1, Ordering::SeqCst);
      cache.write(&dag.target.id, |w| w.write_all(b"built"))?;
      Ok(())
    })
  }

  #[test]
  fn builds_dependencies_before_parents() {
    let temp = TempDir::new().unwrap();
    let cache = Cache::new(temp.path());

    let child = frozen("child", "probe", Vec::new());
    let child_id = child.target.id.clone();
    let dag = frozen("parent", "probe", vec![child]);

    let cache_probe = cache.clone();
    let plugin = Plugin::new("probe", move |dag, cache, _stdout, _stderr| {
      if dag.target.id.target.0 == "parent" {
        // The child's postcondition must hold before the parent runs.
        assert!(cache_probe.exists(&child_id).unwrap());
      }
      cache.write(&dag.target.id, |w| w.write_all(b"ok"))?;
      Ok(())
    });

    execute_with_workers(&dag, &cache, &[plugin], 4).unwrap();
    assert!(cache.exists(&dag.target.id).unwrap());
  }

  #[test]
  fn shared_dependency_builds_once() {
    let temp = TempDir::new().unwrap();
    let cache = Cache::new(temp.path());

    let shared = frozen("shared", "count", Vec::new());
    let x = frozen("x", "count", vec![shared.clone()]);
    let y = frozen("y", "count", vec![shared]);
    let root = frozen("root", "count", vec![x, y]);

    let counter = Arc::new(AtomicU32::new(0));
    let plugin = counting_plugin("count", counter.clone());

    execute_with_workers(&root, &cache, &[plugin], 8).unwrap();
    // shared, x, y, root: each exactly once.
    assert_eq!(counter.load(Ordering::SeqCst), 4);
  }

  #[test]
  fn satisfied_nodes_are_skipped() {
    let temp = TempDir::new().unwrap();
    let cache = Cache::new(temp.path());

    let dag = frozen("t", "count", Vec::new());
    cache.write(&dag.target.id, |w| w.write_all(b"cached")).unwrap();

    let counter = Arc::new(AtomicU32::new(0));
    let plugin = counting_plugin("count", counter.clone());

    execute_with_workers(&dag, &cache, &[plugin], 2).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn second_run_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let cache = Cache::new(temp.path());

    let dag = frozen("t", "count", Vec::new());
    let counter = Arc::new(AtomicU32::new(0));

    execute_with_workers(&dag, &cache, &[counting_plugin("count", counter.clone())], 2).unwrap();
    execute_with_workers(&dag, &cache, &[counting_plugin("count", counter.clone())], 2).unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn missing_plugin_is_an_error() {
    let temp = TempDir::new().unwrap();
    let cache = Cache::new(temp.path());
    let dag = frozen("t", "exotic", Vec::new());

    let err = execute_with_workers(&dag, &cache, &[], 2).unwrap_err();
    match err {
      ExecuteError::PluginNotFound { builder_type, .. } => assert_eq!(builder_type, "exotic"),
      other => panic!("expected PluginNotFound, got {:?}", other),
    }
  }

  #[test]
  fn failed_dependency_skips_all_dependents() {
    let temp = TempDir::new().unwrap();
    let cache = Cache::new(temp.path());

    let z = frozen("z", "fail", Vec::new());
    let x = frozen("x", "count", vec![z.clone()]);
    let y = frozen("y", "count", vec![z]);
    let root = frozen("root", "count", vec![x, y]);

    let counter = Arc::new(AtomicU32::new(0));
    let plugins = vec![
      counting_plugin("count", counter.clone()),
      Plugin::new("fail", |_, _, _stdout, stderr| {
        writeln!(stderr, "z exploded")?;
        Err("z failed".into())
      }),
    ];

    let err = execute_with_workers(&root, &cache, &plugins, 4).unwrap_err();
    match err {
      ExecuteError::Plugin { id, .. } => assert_eq!(id.target.0, "z"),
      other => panic!("expected Plugin error, got {:?}", other),
    }
    assert_eq!(counter.load(Ordering::SeqCst), 0, "no dependent may run");
  }
}
