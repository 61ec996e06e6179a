/*!
 * Fallback Resolver
 * Synthesized placeholders for platforms without a /proc filesystem
 */

use super::{ProcessInfo, ProcessUserInfo, ReadUserInfoConfig, UNKNOWN_NAME};
use crate::core::types::Pid;

/// Placeholder info; this platform has no supported process query path
pub fn read_process_info(_pid: Pid) -> ProcessInfo {
    ProcessInfo {
        ppid: Pid(0),
        name: UNKNOWN_NAME.to_string(),
        simple_name: UNKNOWN_NAME.to_string(),
        user: None,
    }
}

/// Not supported on this platform
pub fn read_user_info(_pid: Pid, _config: ReadUserInfoConfig) -> Option<ProcessUserInfo> {
    None
}
