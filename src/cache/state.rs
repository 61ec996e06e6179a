/*!
 * Global State
 * The pid→node map, both work queues, and the shutdown flag, under one lock
 */

use super::node::Node;
use crate::core::sync::Promise;
use crate::core::types::Pid;
use crate::info::ProcessInfo;
use ahash::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Point-in-time view of every resolved entry, keyed by pid
pub type Snapshot = BTreeMap<Pid, ProcessInfo>;

/// Everything the cache's single RwLock guards.
///
/// The map, the queues, and the flag share one lock on purpose: the worker
/// swaps both queues and sizes the map in a single critical section, which
/// is what makes a snapshot observe every enqueue that happened before it.
///
/// At most one node is tracked per pid. The queues are intentionally
/// unbounded — `add` cannot block, so memory is the tradeoff. A high-water
/// drop policy could bound them later.
pub(crate) struct State {
    pub(crate) infos: HashMap<Pid, Arc<Node>, RandomState>,
    pub(crate) lookup_queue: Vec<(Pid, Promise<ProcessInfo>)>,
    pub(crate) snapshot_queue: Vec<Promise<Snapshot>>,
    pub(crate) shutting_down: bool,
}

impl State {
    pub(crate) fn new() -> Self {
        Self {
            infos: HashMap::with_hasher(RandomState::new()),
            lookup_queue: Vec::new(),
            snapshot_queue: Vec::new(),
            shutting_down: false,
        }
    }
}
