/*!
 * One-Shot Future
 * Write-once, read-many resolution cell with blocking wait
 */

use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Signalled when a `Promise` is dropped without being fulfilled.
///
/// The owning cache abandons queued promises on teardown; waiters must see
/// an error rather than block forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromiseAbandoned;

struct Shared<T> {
    value: OnceCell<T>,
    abandoned: Mutex<bool>,
    ready: Condvar,
}

/// Create a connected promise/future pair.
pub fn channel<T>() -> (Promise<T>, OnceFuture<T>) {
    let shared = Arc::new(Shared {
        value: OnceCell::new(),
        abandoned: Mutex::new(false),
        ready: Condvar::new(),
    });
    (
        Promise {
            shared: Arc::clone(&shared),
            fulfilled: false,
        },
        OnceFuture { shared },
    )
}

/// Single-use writer side. Fulfilled at most once; dropping an unfulfilled
/// promise wakes and fails every waiter.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    fulfilled: bool,
}

impl<T> Promise<T> {
    /// Resolve the future. Consumes the promise.
    pub fn fulfill(mut self, value: T) {
        // set before notify: waiters re-check the cell under the lock
        let _ = self.shared.value.set(value);
        self.fulfilled = true;
        let _guard = self.shared.abandoned.lock();
        self.shared.ready.notify_all();
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.fulfilled {
            let mut abandoned = self.shared.abandoned.lock();
            *abandoned = true;
            self.shared.ready.notify_all();
        }
    }
}

/// Shared reader side. Cheap to clone; all clones observe the same
/// resolution.
pub struct OnceFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for OnceFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> OnceFuture<T> {
    /// Non-blocking peek; lock-free once resolved
    #[inline]
    pub fn try_value(&self) -> Option<&T> {
        self.shared.value.get()
    }

    /// Whether the value has been resolved
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.shared.value.get().is_some()
    }

    /// Block until resolved, or fail if the promise was dropped unfulfilled
    pub fn wait(&self) -> Result<&T, PromiseAbandoned> {
        if let Some(value) = self.shared.value.get() {
            return Ok(value);
        }
        let mut abandoned = self.shared.abandoned.lock();
        loop {
            if let Some(value) = self.shared.value.get() {
                return Ok(value);
            }
            if *abandoned {
                return Err(PromiseAbandoned);
            }
            self.shared.ready.wait(&mut abandoned);
        }
    }
}
