/*!
 * Fault Injection
 * Named-checkpoint blocking for deterministic race tests
 */

use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;

/// Test-only hook that lets a test freeze a thread at a named checkpoint.
///
/// Production code runs with no injector installed, making every
/// `check` a no-op. Tests install one, `block` a checkpoint before
/// triggering the code path, observe the frozen state, then `unblock`.
pub struct FaultInjector {
    blocked: Mutex<HashSet<String>>,
    released: Condvar,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self {
            blocked: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Block the calling thread while `checkpoint` is marked blocked
    pub fn check(&self, checkpoint: &str) {
        let mut blocked = self.blocked.lock();
        while blocked.contains(checkpoint) {
            self.released.wait(&mut blocked);
        }
    }

    /// Mark a checkpoint blocked; threads reaching it will stall
    pub fn block(&self, checkpoint: &str) {
        self.blocked.lock().insert(checkpoint.to_string());
    }

    /// Release a checkpoint, waking every thread stalled on it
    pub fn unblock(&self, checkpoint: &str) {
        let mut blocked = self.blocked.lock();
        blocked.remove(checkpoint);
        self.released.notify_all();
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new()
    }
}
