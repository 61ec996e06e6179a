/*!
 * Limits and Constants
 * Centralized location for the cache's capacities, thresholds, and defaults
 */

use std::time::Duration;

/// Per-thread cache capacity (entries)
/// One slot per pid a thread has recently touched; 256 covers the working
/// set of a request-processing thread without measurable memory cost
/// [PERF] probed on every add(), must stay O(1)
pub const THREAD_LOCAL_CACHE_CAPACITY: usize = 256;

/// Default entry expiry
/// An entry that has not been referenced or observed for this long is
/// eligible for the next sweep
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(5 * 60);

/// Maximum bytes read from /proc/<pid>/cmdline
/// Longer command lines are truncated; fewer syscalls beats completeness
/// for diagnostic output
pub const CMDLINE_READ_MAX: usize = 1024;

/// Water-level growth per resolved lookup
/// The sweep counter must grow faster than the map can, or a steady stream
/// of new pids would never trip a sweep. Tunable; 2 matches the map's
/// maximum growth rate plus headroom.
pub const SWEEP_WATER_LEVEL_FACTOR: usize = 2;
