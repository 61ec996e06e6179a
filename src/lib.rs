/*!
 * procinfo-cache
 * Concurrent, self-expiring cache mapping pids to human-readable process info
 */

pub mod cache;
pub mod core;
pub mod info;

// Re-exports
pub use cache::{
    LocalNodeCache, Node, ProcessInfoCache, ProcessInfoCacheBuilder, ProcessInfoHandle,
    ProcessInfoResolver, Snapshot, ThreadLocalCache, WORKER_CHECKPOINT,
};
pub use core::clock::{Clock, SystemClock};
pub use core::errors::CacheError;
pub use core::faults::FaultInjector;
pub use core::types::{CacheResult, Pid};
pub use info::{
    clean_process_commandline, read_process_info, read_user_info, uid_to_username, ProcessInfo,
    ProcessUserInfo, ReadUserInfoConfig,
};
