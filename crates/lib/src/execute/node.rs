//! Concurrent bottom-up traversal of a node graph.
//!
//! Each node carries two atomic flags. A worker walking the graph recurses
//! into unacquired children first; once every child of a node is finished,
//! exactly one worker wins the compare-and-swap on `acquired`, runs the
//! node's work, and sets `finished`. There is no global queue: workers
//! coordinate purely through the per-node flags and a shared cancel flag.
//!
//! On error the cancel flag is set; workers finish their in-flight call and
//! unwind, and the last observed error is returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::trace;

/// A node in the graph, ready to be executed by [`process_concurrently`].
///
/// Children may be shared between parents; a shared child is claimed and
/// run once, and every parent observes its `finished` flag.
pub(crate) struct Node<'a, E> {
  /// Identifies the node in trace logs; unique within the graph.
  id: String,
  children: Vec<Arc<Node<'a, E>>>,
  work: Box<dyn Fn() -> Result<(), E> + Send + Sync + 'a>,
  acquired: AtomicBool,
  finished: AtomicBool,
}

impl<'a, E> Node<'a, E> {
  pub fn new(
    id: impl Into<String>,
    children: Vec<Arc<Node<'a, E>>>,
    work: impl Fn() -> Result<(), E> + Send + Sync + 'a,
  ) -> Arc<Self> {
    Arc::new(Self {
      id: id.into(),
      children,
      work: Box::new(work),
      acquired: AtomicBool::new(false),
      finished: AtomicBool::new(false),
    })
  }
}

/// Visit every node bottom-up across `concurrency` workers such that a
/// node's work never begins before all of its children's work has
/// finished, and each node's work runs exactly once.
pub(crate) fn process_concurrently<'a, E: Send>(root: &Arc<Node<'a, E>>, concurrency: usize) -> Result<(), E> {
  let cancel = AtomicBool::new(false);
  let last_error: Mutex<Option<E>> = Mutex::new(None);

  thread::scope(|scope| {
    for worker in 0..concurrency.max(1) {
      let root = Arc::clone(root);
      let cancel = &cancel;
      let last_error = &last_error;
      scope.spawn(move || {
        if let Err(e) = process_node(worker, &root, cancel) {
          // Cancel the others; they drain their in-flight work. Workers
          // racing here overwrite each other, so the caller sees the last
          // observed error.
          cancel.store(true, Ordering::SeqCst);
          *last_error.lock().expect("worker poisoned the error slot") = Some(e);
        }
      });
    }
  });

  match last_error.into_inner().expect("worker poisoned the error slot") {
    Some(e) => Err(e),
    None => Ok(()),
  }
}

fn next_free_child<'n, 'a, E>(node: &'n Node<'a, E>) -> Option<&'n Arc<Node<'a, E>>> {
  node.children.iter().find(|child| !child.acquired.load(Ordering::SeqCst))
}

fn process_node<E>(worker: usize, node: &Node<'_, E>, cancel: &AtomicBool) -> Result<(), E> {
  // For as long as there are free children, descend into them.
  loop {
    if cancel.load(Ordering::SeqCst) {
      trace!(worker, node = %node.id, "canceled; unwinding");
      return Ok(());
    }
    match next_free_child(node) {
      Some(child) => process_node(worker, child, cancel)?,
      None => break,
    }
  }

  // Only claim the current node once no child is in flight. Otherwise move
  // on; the worker that finishes the last child will come back up and
  // claim this node.
  if node.children.iter().any(|child| !child.finished.load(Ordering::SeqCst)) {
    trace!(worker, node = %node.id, "children in flight; moving on");
    return Ok(());
  }

  if node
    .acquired
    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
    .is_ok()
  {
    trace!(worker, node = %node.id, "acquired node");
    (node.work)()?;
    node.finished.store(true, Ordering::SeqCst);
  }

  Ok(())
}
