/*!
 * Thread-Local Cache
 * Per-thread, lock-free dedup tier holding weak node references
 */

use super::node::Node;
use crate::core::limits::THREAD_LOCAL_CACHE_CAPACITY;
use crate::core::types::Pid;
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Per-thread cache of recently seen nodes; the fast path of `add`.
///
/// Implementations are consulted before any lock is taken, so they must be
/// cheap and must never block.
pub trait ThreadLocalCache: Send + Sync {
    /// Whether this thread has recently seen a node for the pid.
    ///
    /// Does not imply `get` will return one. Must not upgrade the weak
    /// reference (refcount churn on the hot path) and must not refresh
    /// recency.
    fn has(&self, pid: Pid, now: Duration) -> bool;

    /// The node, if it is still alive; records an access on hit
    fn get(&self, pid: Pid, now: Duration) -> Option<Arc<Node>>;

    /// Remember a node for this thread. Bounded; evicting an entry never
    /// destroys the node (the cache map still owns it).
    fn put(&self, pid: Pid, node: Arc<Node>);
}

thread_local! {
    static NODES: RefCell<LruCache<Pid, Weak<Node>>> =
        RefCell::new(LruCache::new(NonZeroUsize::new(THREAD_LOCAL_CACHE_CAPACITY).unwrap()));
}

/// Default implementation backed by a per-thread bounded LRU.
///
/// One instance per thread, created lazily on first touch; entries go
/// silently stale when the cache map drops the node elsewhere.
pub struct LocalNodeCache;

impl ThreadLocalCache for LocalNodeCache {
    fn has(&self, pid: Pid, _now: Duration) -> bool {
        // contains() leaves recency alone and never touches the weak ref
        NODES.with(|nodes| nodes.borrow().contains(&pid))
    }

    fn get(&self, pid: Pid, now: Duration) -> Option<Arc<Node>> {
        NODES.with(|nodes| {
            let mut nodes = nodes.borrow_mut();
            let node = nodes.get(&pid)?.upgrade()?;
            node.record_access(now);
            Some(node)
        })
    }

    fn put(&self, pid: Pid, node: Arc<Node>) {
        NODES.with(|nodes| {
            nodes.borrow_mut().put(pid, Arc::downgrade(&node));
        });
    }
}
