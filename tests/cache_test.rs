/*!
 * Process Info Cache Integration Tests
 * Dedup, expiry, sweeps, shutdown, and snapshot behavior under a fake clock
 */

use parking_lot::RwLock;
use procinfo_cache::{
    CacheError, Clock, FaultInjector, Node, Pid, ProcessInfo, ProcessInfoCache, ProcessInfoHandle,
    ThreadLocalCache, WORKER_CHECKPOINT,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ADD_THREAD_COUNT: usize = 32;
const SWEEP_WAIT_MAX: Duration = Duration::from_secs(5);

// ============================================================================
// Fixture: fake clock, map-backed resolver, disabled thread-local tier
// ============================================================================

/// Manually advanced clock; stores nanos since its epoch in an atomic
#[derive(Default)]
struct FakeClock {
    nanos: AtomicU64,
}

impl FakeClock {
    fn advance_minutes(&self, minutes: u64) {
        self.nanos
            .fetch_add(minutes * 60 * 1_000_000_000, Ordering::Release);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

/// Thread-local tier that caches nothing, forcing every call through the
/// shared state
struct NullThreadLocalCache;

impl ThreadLocalCache for NullThreadLocalCache {
    fn has(&self, _pid: Pid, _now: Duration) -> bool {
        false
    }
    fn get(&self, _pid: Pid, _now: Duration) -> Option<Arc<Node>> {
        None
    }
    fn put(&self, _pid: Pid, _node: Arc<Node>) {}
}

fn named(name: &str) -> ProcessInfo {
    ProcessInfo {
        ppid: Pid(0),
        name: name.to_string(),
        simple_name: name.to_string(),
        user: None,
    }
}

struct Fixture {
    clock: Arc<FakeClock>,
    infos: Arc<RwLock<HashMap<Pid, ProcessInfo>>>,
    resolve_count: Arc<AtomicUsize>,
    faults: Arc<FaultInjector>,
    cache: ProcessInfoCache,
}

impl Fixture {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let clock = Arc::new(FakeClock::default());
        let infos: Arc<RwLock<HashMap<Pid, ProcessInfo>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let resolve_count = Arc::new(AtomicUsize::new(0));
        let faults = Arc::new(FaultInjector::new());

        let resolver_infos = Arc::clone(&infos);
        let resolver_count = Arc::clone(&resolve_count);
        let cache = ProcessInfoCache::builder()
            .with_expiry(Duration::from_secs(5 * 60))
            .with_clock(clock.clone())
            .with_thread_local_cache(Arc::new(NullThreadLocalCache))
            .with_fault_injector(Arc::clone(&faults))
            .with_resolver(move |pid| {
                resolver_count.fetch_add(1, Ordering::SeqCst);
                resolver_infos
                    .read()
                    .get(&pid)
                    .cloned()
                    .unwrap_or_else(|| named("<missing>"))
            })
            .build();

        Self {
            clock,
            infos,
            resolve_count,
            faults,
            cache,
        }
    }

    fn set_info(&self, pid: Pid, name: &str) {
        self.infos.write().insert(pid, named(name));
    }

    /// Poll until the pid drops out of the best-effort view, i.e. a sweep
    /// removed it
    fn wait_for_eviction(&self, pid: Pid) {
        let deadline = std::time::Instant::now() + SWEEP_WAIT_MAX;
        while self.cache.get_process_info(pid).is_some() {
            assert!(
                std::time::Instant::now() < deadline,
                "pid {} was never swept",
                pid
            );
            thread::sleep(Duration::from_millis(1));
        }
    }
}

// ============================================================================
// Real-resolver smoke tests
// ============================================================================

#[cfg(target_os = "linux")]
#[test]
fn test_read_my_pids_name() {
    let cache = ProcessInfoCache::new();
    cache.add(Pid::current());
    let names = cache.get_all_process_names();
    let own = names.get(&Pid::current()).expect("own pid must be tracked");
    assert_ne!("", own);
}

#[test]
fn test_expire_my_pids_name() {
    let cache = ProcessInfoCache::with_expiry(Duration::ZERO);
    cache.add(Pid::current());
    let results = cache.get_all_process_infos();
    assert_eq!(0, results.len());
}

#[test]
fn test_add_from_multiple_threads() {
    let cache = Arc::new(ProcessInfoCache::new());

    let threads: Vec<_> = (0..ADD_THREAD_COUNT)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.add(Pid::current()))
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let results = cache.get_all_process_infos();
    assert_eq!(1, results.len());
}

// ============================================================================
// Dedup and resolution sharing
// ============================================================================

#[test]
fn test_concurrent_lookups_share_one_resolution() {
    let fixture = Fixture::new();
    fixture.set_info(Pid(10), "watchman");

    // Freeze the worker before it can drain anything
    fixture.faults.block(WORKER_CHECKPOINT);

    let handles: Vec<ProcessInfoHandle> = (0..4).map(|_| fixture.cache.lookup(Pid(10))).collect();

    // Nothing can have resolved yet
    for handle in &handles {
        assert!(!handle.future().is_ready());
        assert_eq!(None, handle.get_optional());
    }
    assert_eq!(0, fixture.resolve_count.load(Ordering::SeqCst));

    fixture.faults.unblock(WORKER_CHECKPOINT);

    for handle in &handles {
        assert_eq!("watchman", handle.get().unwrap().name);
    }
    // One node, one queued promise, one resolver call
    assert_eq!(1, fixture.resolve_count.load(Ordering::SeqCst));
}

#[test]
fn test_concurrent_adds_converge_to_one_node() {
    let fixture = Fixture::new();
    fixture.set_info(Pid(20), "edenfs");

    let cache = Arc::new(fixture.cache);
    let threads: Vec<_> = (0..ADD_THREAD_COUNT)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.add(Pid(20)))
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let results = cache.get_all_process_infos();
    assert_eq!(1, results.len());
    assert_eq!("edenfs", results.get(&Pid(20)).unwrap().name);
    assert_eq!(1, fixture.resolve_count.load(Ordering::SeqCst));
}

// ============================================================================
// Best-effort synchronous reads
// ============================================================================

#[test]
fn test_get_process_info_never_triggers_lookup() {
    let fixture = Fixture::new();
    fixture.set_info(Pid(30), "watchman");

    assert_eq!(None, fixture.cache.get_process_info(Pid(30)));
    assert_eq!(None, fixture.cache.get_process_name(Pid(30)));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(0, fixture.resolve_count.load(Ordering::SeqCst));

    fixture.cache.lookup(Pid(30)).get().unwrap();
    assert_eq!(
        "watchman",
        fixture.cache.get_process_info(Pid(30)).unwrap().name
    );
    assert_eq!(
        Some("watchman".to_string()),
        fixture.cache.get_process_name(Pid(30))
    );
}

// ============================================================================
// Expiry, sweeps, and stale handles
// ============================================================================

#[test]
fn test_lookup_expires_and_old_handles_stay_stable() {
    let fixture = Fixture::new();

    fixture.set_info(Pid(10), "watchman");
    let original = fixture.cache.lookup(Pid(10));
    assert_eq!("watchman", original.get().unwrap().name);

    fixture.clock.advance_minutes(10);

    // For pid 10 to expire we need new pids to trip the water level
    fixture.set_info(Pid(11), "new");
    fixture.set_info(Pid(12), "newer");
    assert_eq!("new", fixture.cache.lookup(Pid(11)).get().unwrap().name);
    assert_eq!("newer", fixture.cache.lookup(Pid(12)).get().unwrap().name);
    fixture.wait_for_eviction(Pid(10));

    // A fresh lookup builds a new node and re-resolves from scratch
    fixture.set_info(Pid(10), "edenfs");
    assert_eq!("edenfs", fixture.cache.lookup(Pid(10)).get().unwrap().name);

    // But the old handle still has the old info
    assert_eq!("watchman", original.get().unwrap().name);
}

#[test]
fn test_sweep_self_triggers_without_snapshot_calls() {
    let fixture = Fixture::new();

    fixture.set_info(Pid(10), "watchman");
    fixture.cache.lookup(Pid(10)).get().unwrap();

    fixture.clock.advance_minutes(10);

    // Sequential adds alone must eventually evict the expired pid
    for raw in 11..=20 {
        fixture.set_info(Pid(raw), "filler");
        fixture.cache.lookup(Pid(raw)).get().unwrap();
    }
    fixture.wait_for_eviction(Pid(10));
}

#[test]
fn test_snapshot_observes_prior_lookups() {
    let fixture = Fixture::new();
    fixture.set_info(Pid(40), "watchman");
    fixture.set_info(Pid(41), "edenfs");
    fixture.cache.lookup(Pid(40)).get().unwrap();

    // Freeze the worker, then queue a lookup that cannot resolve yet
    fixture.faults.block(WORKER_CHECKPOINT);
    let pending = fixture.cache.lookup(Pid(41));
    assert!(!pending.future().is_ready());
    fixture.faults.unblock(WORKER_CHECKPOINT);

    // The drain resolves every queued lookup before computing the
    // snapshot, so 41 appears even though it was pending moments ago
    let results = fixture.cache.get_all_process_infos();
    assert_eq!("watchman", results.get(&Pid(40)).unwrap().name);
    assert_eq!("edenfs", results.get(&Pid(41)).unwrap().name);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_shutdown_fails_blocked_get_instead_of_hanging() {
    let fixture = Fixture::new();
    fixture.set_info(Pid(50), "watchman");
    fixture.set_info(Pid(51), "edenfs");

    // Stall the resolver itself so pid 51 stays queued behind pid 50
    fixture.faults.block("resolver_gate");
    let gate = Arc::clone(&fixture.faults);
    let infos = Arc::clone(&fixture.infos);
    let cache = ProcessInfoCache::builder()
        .with_clock(fixture.clock.clone() as Arc<dyn Clock>)
        .with_thread_local_cache(Arc::new(NullThreadLocalCache))
        .with_resolver(move |pid| {
            gate.check("resolver_gate");
            infos.read().get(&pid).cloned().unwrap_or_else(|| named("?"))
        })
        .build();

    let first = cache.lookup(Pid(50));
    thread::sleep(Duration::from_millis(50));
    let second = cache.lookup(Pid(51));

    let waiter = thread::spawn(move || second.get());

    // Release the resolver just after teardown begins; the worker then
    // observes the shutdown flag and exits without draining pid 51
    let release = {
        let faults = Arc::clone(&fixture.faults);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            faults.unblock("resolver_gate");
        })
    };
    drop(cache);
    release.join().unwrap();

    // The first lookup resolved before shutdown finished
    assert_eq!("watchman", first.get().unwrap().name);

    // The second never resolved and must fail, not hang
    let err = waiter.join().unwrap().unwrap_err();
    assert_eq!(CacheError::LookupAborted(Pid(51)), err);
}

#[test]
fn test_handles_outlive_the_cache() {
    let fixture = Fixture::new();
    fixture.set_info(Pid(60), "watchman");

    let handle = fixture.cache.lookup(Pid(60));
    assert_eq!("watchman", handle.get().unwrap().name);

    drop(fixture.cache);
    assert_eq!("watchman", handle.get().unwrap().name);
    assert_eq!(Some("watchman".to_string()), handle.get_optional().map(|i| i.name));
}
