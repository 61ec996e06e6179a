/*!
 * Counting Semaphore
 * Blocking work gate for the single background worker
 */

use parking_lot::{Condvar, Mutex};

/// Counting semaphore built from parking_lot parts.
///
/// Producers `post()` once per enqueued work item; the single consumer
/// `wait()`s for the first item, drains everything it finds, then absorbs
/// the surplus permits with `try_wait_many` so it wakes once per batch
/// rather than once per item.
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new() -> Self {
        Self {
            permits: Mutex::new(0),
            available: Condvar::new(),
        }
    }

    /// Release one permit, waking a waiter if any
    pub fn post(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.available.notify_one();
    }

    /// Block until a permit is available, then consume it
    pub fn wait(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Consume up to `n` permits without blocking; returns how many were taken
    pub fn try_wait_many(&self, n: usize) -> usize {
        let mut permits = self.permits.lock();
        let taken = n.min(*permits);
        *permits -= taken;
        taken
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_post_then_wait() {
        let sem = Semaphore::new();
        sem.post();
        sem.wait();
    }

    #[test]
    fn test_wait_blocks_until_post() {
        let sem = Arc::new(Semaphore::new());
        let sem2 = Arc::clone(&sem);

        let waiter = thread::spawn(move || {
            sem2.wait();
        });

        sem.post();
        waiter.join().unwrap();
    }

    #[test]
    fn test_try_wait_many_absorbs_surplus() {
        let sem = Semaphore::new();
        for _ in 0..5 {
            sem.post();
        }
        sem.wait();
        // 4 permits left; asking for more than available takes what's there
        assert_eq!(4, sem.try_wait_many(10));
        assert_eq!(0, sem.try_wait_many(1));
    }
}
