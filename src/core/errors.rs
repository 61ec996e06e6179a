/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::Pid;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cache errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum CacheError {
    #[error("lookup for pid {0} aborted: cache shut down before the info resolved")]
    #[diagnostic(
        code(procinfo_cache::lookup_aborted),
        help("The cache was dropped while this pid's resolution was still queued. Re-create the cache and look the pid up again.")
    )]
    LookupAborted(Pid),
}
