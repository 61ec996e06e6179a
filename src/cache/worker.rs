/*!
 * Background Worker
 * Single thread draining the work queues, resolving pids, sweeping expiry
 */

use super::state::Snapshot;
use super::CacheInner;
use crate::core::limits::SWEEP_WATER_LEVEL_FACTOR;
use crate::core::sync::Promise;
use crate::core::types::Pid;
use crate::info::ProcessInfo;
use log::{debug, info, trace};
use std::mem;
use std::sync::Arc;

/// Fault-injection checkpoint hit once per wake, before the queue drain
pub const WORKER_CHECKPOINT: &str = "worker_thread";

/// Worker loop. Runs on its own named thread for the cache's lifetime;
/// the only place the resolver is ever invoked.
pub(crate) fn run(inner: Arc<CacheInner>) {
    info!("process info cache worker started");

    // Double-buffered work queues: swapped with the state's under the
    // lock, drained outside it.
    let mut lookups: Vec<(Pid, Promise<ProcessInfo>)> = Vec::new();
    let mut snapshots: Vec<Promise<Snapshot>> = Vec::new();

    // Sweep amortization. The counter grows faster than the map can, so a
    // sweep eventually triggers even under a steady stream of new pids.
    let mut water_level: usize = 0;

    loop {
        inner.work_sem.wait();
        if let Some(faults) = &inner.faults {
            faults.check(WORKER_CHECKPOINT);
        }

        let tracked;
        {
            let mut state = inner.state.write();
            if state.shutting_down {
                // Shutdown comes only from Drop, and snapshot reads block
                // their caller, so none can be outstanding here.
                assert!(
                    state.snapshot_queue.is_empty(),
                    "cache dropped while snapshot requests were pending"
                );
                debug!("process info cache worker stopping");
                return;
            }
            mem::swap(&mut lookups, &mut state.lookup_queue);
            mem::swap(&mut snapshots, &mut state.snapshot_queue);
            tracked = state.infos.len();
        }

        // Every enqueue posted once but this wake drains the whole batch;
        // absorb the surplus so the next wait really blocks.
        let drained = lookups.len() + snapshots.len();
        if drained > 0 {
            inner.work_sem.try_wait_many(drained - 1);
        }

        // All lookups resolve before any snapshot is computed, so a
        // snapshot reflects every add/lookup that happened-before it.
        // Resolution must stay outside the state lock: the resolver may
        // block on syscalls that contend with callers of add().
        let resolved = lookups.len();
        for (pid, promise) in lookups.drain(..) {
            promise.fulfill((inner.resolver)(pid));
        }

        let now = inner.clock.now();

        water_level += SWEEP_WATER_LEVEL_FACTOR * resolved;
        if water_level > tracked {
            let swept = inner.clear_expired(now, &mut inner.state.write());
            if swept > 0 {
                trace!("swept {} expired entries", swept);
            }
            water_level = 0;
        }

        if !snapshots.is_empty() {
            let snapshot: Snapshot = {
                let mut state = inner.state.write();
                inner.clear_expired(now, &mut state);
                state
                    .infos
                    .iter()
                    .filter_map(|(pid, node)| {
                        node.info().try_value().map(|value| (*pid, value.clone()))
                    })
                    .collect()
            };
            trace!("serving {} snapshot request(s)", snapshots.len());
            for promise in snapshots.drain(..) {
                promise.fulfill(snapshot.clone());
            }
        }
    }
}
