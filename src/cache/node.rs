/*!
 * Node and Handle
 * Per-pid resolution state and the caller-facing reference to it
 */

use crate::core::clock::Clock;
use crate::core::errors::CacheError;
use crate::core::sync::OnceFuture;
use crate::core::types::{CacheResult, Pid};
use crate::info::ProcessInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cached state for one pid: the eventual info and the last time anything
/// observed it.
///
/// Strongly owned by the cache's map and by outstanding handles; weakly
/// referenced by thread-local caches so those never extend its life.
/// The future resolves at most once and never reverts.
pub struct Node {
    pid: Pid,
    info: OnceFuture<ProcessInfo>,
    /// Nanoseconds since the clock's epoch; updated outside any lock
    last_access: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Node {
    pub(crate) fn new(
        pid: Pid,
        info: OnceFuture<ProcessInfo>,
        now: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pid,
            info,
            last_access: AtomicU64::new(now.as_nanos() as u64),
            clock,
        }
    }

    /// Refresh the access time, keeping the node alive past the next sweep
    #[inline]
    pub(crate) fn record_access(&self, now: Duration) {
        self.last_access.store(now.as_nanos() as u64, Ordering::Release);
    }

    #[inline]
    pub(crate) fn last_access(&self) -> Duration {
        Duration::from_nanos(self.last_access.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn info(&self) -> &OnceFuture<ProcessInfo> {
        &self.info
    }

    #[inline]
    pub(crate) fn clock(&self) -> &dyn Clock {
        &*self.clock
    }
}

/// Strong interest in one pid's info.
///
/// A handle does not keep the entry in the cache, but the info it resolves
/// to is available for as long as the handle is held and never changes —
/// even after the cache has expired the pid and re-resolved it into a new
/// node.
#[derive(Clone)]
pub struct ProcessInfoHandle {
    node: Arc<Node>,
}

impl ProcessInfoHandle {
    pub(crate) fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Non-blocking read: the info if resolution has completed, else `None`
    pub fn get_optional(&self) -> Option<ProcessInfo> {
        let now = self.node.clock().now();
        self.node.record_access(now);
        self.node.info.try_value().cloned()
    }

    /// Block until the info is available.
    ///
    /// Must not be called from a thread the resolver's own progress depends
    /// on (e.g. a filesystem request handler the resolver's syscalls can
    /// re-enter) — resolution happens on the cache's worker thread, and
    /// this call waits for it.
    ///
    /// Fails only if the cache was dropped before this pid resolved.
    pub fn get(&self) -> CacheResult<ProcessInfo> {
        let now = self.node.clock().now();
        self.node.record_access(now);
        self.node
            .info
            .wait()
            .map(Clone::clone)
            .map_err(|_| CacheError::LookupAborted(self.node.pid))
    }

    /// The underlying resolution future, for observing completion without
    /// blocking
    pub fn future(&self) -> &OnceFuture<ProcessInfo> {
        &self.node.info
    }
}
