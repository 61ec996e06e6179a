/*!
 * Core Types
 * Common types used across the cache
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID (matches the platform's signed pid width)
///
/// Pids are assigned by the OS and reused over time; a `Pid` identifies a
/// process only as of the moment it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub i32);

impl Pid {
    /// Pid of the calling process
    pub fn current() -> Self {
        Pid(std::process::id() as i32)
    }

    #[inline]
    pub fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Pid {
    fn from(raw: i32) -> Self {
        Pid(raw)
    }
}

/// Common result type for cache operations
pub type CacheResult<T> = Result<T, super::errors::CacheError>;
