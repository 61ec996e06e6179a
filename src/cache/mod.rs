/*!
 * Process Info Cache
 * Non-blocking pid→info resolution with background refresh and expiry
 */

mod local;
mod node;
mod state;
mod worker;

pub use local::{LocalNodeCache, ThreadLocalCache};
pub use node::{Node, ProcessInfoHandle};
pub use state::Snapshot;
pub use worker::WORKER_CHECKPOINT;

use crate::core::clock::{Clock, SystemClock};
use crate::core::faults::FaultInjector;
use crate::core::limits::DEFAULT_EXPIRY;
use crate::core::sync::{self, Semaphore};
use crate::core::types::Pid;
use crate::info::{self, ProcessInfo};
use log::warn;
use parking_lot::RwLock;
use state::State;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Injected pid→info resolution function. Potentially slow; invoked only
/// on the worker thread. Must synthesize a placeholder on failure rather
/// than error, so every queued lookup resolves.
pub type ProcessInfoResolver = Arc<dyn Fn(Pid) -> ProcessInfo + Send + Sync>;

pub(crate) struct CacheInner {
    expiry: Duration,
    clock: Arc<dyn Clock>,
    local: Arc<dyn ThreadLocalCache>,
    resolver: ProcessInfoResolver,
    faults: Option<Arc<FaultInjector>>,
    state: RwLock<State>,
    work_sem: Semaphore,
}

impl CacheInner {
    /// Drop every node whose last access is at least `expiry` old.
    /// Returns how many were removed; their memory is reclaimed once the
    /// last handle and weak upgrade let go.
    pub(crate) fn clear_expired(&self, now: Duration, state: &mut State) -> usize {
        let before = state.infos.len();
        let expiry = self.expiry;
        state
            .infos
            .retain(|_, node| now.saturating_sub(node.last_access()) < expiry);
        before - state.infos.len()
    }
}

/// Builder with injectable seams for clock, thread-local tier, resolver,
/// and fault injection
pub struct ProcessInfoCacheBuilder {
    expiry: Duration,
    clock: Option<Arc<dyn Clock>>,
    local_cache: Option<Arc<dyn ThreadLocalCache>>,
    resolver: Option<ProcessInfoResolver>,
    fault_injector: Option<Arc<FaultInjector>>,
}

impl ProcessInfoCacheBuilder {
    pub fn new() -> Self {
        Self {
            expiry: DEFAULT_EXPIRY,
            clock: None,
            local_cache: None,
            resolver: None,
            fault_injector: None,
        }
    }

    /// How long an entry survives without being referenced or observed
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_thread_local_cache(mut self, cache: Arc<dyn ThreadLocalCache>) -> Self {
        self.local_cache = Some(cache);
        self
    }

    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(Pid) -> ProcessInfo + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_fault_injector(mut self, faults: Arc<FaultInjector>) -> Self {
        self.fault_injector = Some(faults);
        self
    }

    /// Build the cache and start its worker thread
    pub fn build(self) -> ProcessInfoCache {
        let inner = Arc::new(CacheInner {
            expiry: self.expiry,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            local: self.local_cache.unwrap_or_else(|| Arc::new(LocalNodeCache)),
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(info::read_process_info)),
            faults: self.fault_injector,
            state: RwLock::new(State::new()),
            work_sem: Semaphore::new(),
        });

        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("procinfo-cache-worker".to_string())
            .spawn(move || worker::run(worker_inner))
            .expect("failed to spawn process info cache worker");

        ProcessInfoCache {
            inner,
            worker: Some(worker),
        }
    }
}

impl Default for ProcessInfoCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrent, self-expiring cache mapping pids to human-readable process
/// info.
///
/// `add` and `lookup` never perform I/O; resolution happens on one
/// dedicated worker thread. Entries expire after going unreferenced for
/// the configured duration, after which a new lookup re-resolves from
/// scratch (the pid may have been reused by then). Cache state reflects
/// some recent, not necessarily the latest, activity.
pub struct ProcessInfoCache {
    inner: Arc<CacheInner>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ProcessInfoCache {
    /// Cache with the default five-minute expiry
    pub fn new() -> Self {
        ProcessInfoCacheBuilder::new().build()
    }

    /// Cache that keeps entries until `expiry` elapses without a reference
    pub fn with_expiry(expiry: Duration) -> Self {
        ProcessInfoCacheBuilder::new().with_expiry(expiry).build()
    }

    pub fn builder() -> ProcessInfoCacheBuilder {
        ProcessInfoCacheBuilder::new()
    }

    /// Non-blocking lookup request for a pid's info.
    ///
    /// Concurrent lookups for the same pid share one node: at most one
    /// resolution is ever outstanding per pid.
    pub fn lookup(&self, pid: Pid) -> ProcessInfoHandle {
        let now = self.inner.clock.now();

        if let Some(node) = self.inner.local.get(pid, now) {
            return ProcessInfoHandle::new(node);
        }

        let mut state = self.inner.state.write();
        if let Some(node) = state.infos.get(&pid) {
            return ProcessInfoHandle::new(Arc::clone(node));
        }

        let (promise, future) = sync::channel();
        state.lookup_queue.push((pid, promise));
        let node = Arc::new(Node::new(pid, future, now, Arc::clone(&self.inner.clock)));
        state.infos.insert(pid, Arc::clone(&node));
        self.inner.local.put(pid, Arc::clone(&node));
        drop(state);
        self.inner.work_sem.post();
        ProcessInfoHandle::new(node)
    }

    /// Record a reference to a pid, refreshing its expiry.
    ///
    /// Called from high-throughput, latency-critical code on every unit of
    /// work, so the common paths take no lock (thread-local hit) or only a
    /// briefly-held read lock (tracked pid). The info itself is read
    /// asynchronously on the worker thread: resolving here could make a
    /// syscall that contends with kernel locks the caller's own execution
    /// path holds.
    pub fn add(&self, pid: Pid) {
        let now = self.inner.clock.now();

        // Same thread re-touching the same pid is the overwhelmingly
        // common case. A hit here accepts slight staleness to avoid any
        // shared-state contention.
        if self.inner.local.has(pid, now) {
            return;
        }

        {
            let state = self.inner.state.read();
            if let Some(node) = state.infos.get(&pid) {
                node.record_access(now);
                return;
            }
        }

        // Re-check under the exclusive lock: another thread may have
        // inserted in the window between the probes.
        let mut state = self.inner.state.write();
        if let Some(node) = state.infos.get(&pid) {
            node.record_access(now);
            return;
        }

        let (promise, future) = sync::channel();
        state.lookup_queue.push((pid, promise));
        let node = Arc::new(Node::new(pid, future, now, Arc::clone(&self.inner.clock)));
        state.infos.insert(pid, Arc::clone(&node));
        self.inner.local.put(pid, node);
        drop(state);
        self.inner.work_sem.post();
    }

    /// Every non-expired pid with resolved info. Blocks until the worker
    /// completes a full drain cycle, so it observes all lookups enqueued
    /// before the call.
    pub fn get_all_process_infos(&self) -> Snapshot {
        let (promise, future) = sync::channel();
        self.inner.state.write().snapshot_queue.push(promise);
        self.inner.work_sem.post();

        // Teardown needs exclusive ownership while this call borrows the
        // cache, and the worker refuses to exit with snapshot requests
        // pending, so the promise is always fulfilled.
        future
            .wait()
            .expect("worker never abandons snapshot requests")
            .clone()
    }

    /// Every non-expired pid, mapped to its command line
    pub fn get_all_process_names(&self) -> BTreeMap<Pid, String> {
        self.get_all_process_infos()
            .into_iter()
            .map(|(pid, info)| (pid, info.name))
            .collect()
    }

    /// Best-effort synchronous read: the info if it has already resolved.
    /// Never enqueues a lookup, never blocks on I/O.
    pub fn get_process_info(&self, pid: Pid) -> Option<ProcessInfo> {
        let state = self.inner.state.read();
        state
            .infos
            .get(&pid)
            .and_then(|node| node.info().try_value().cloned())
    }

    /// Best-effort synchronous read of the pid's command line
    pub fn get_process_name(&self, pid: Pid) -> Option<String> {
        self.get_process_info(pid).map(|info| info.name)
    }
}

impl Default for ProcessInfoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessInfoCache {
    fn drop(&mut self) {
        self.inner.state.write().shutting_down = true;
        self.inner.work_sem.post();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("process info cache worker panicked during shutdown");
            }
        }
        // Dropping the state abandons any still-queued lookup promises,
        // failing (not hanging) handles blocked in get().
    }
}
