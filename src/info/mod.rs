/*!
 * Process Info Types
 * Human-readable process identity for diagnostic tools and logging
 */

use crate::core::types::Pid;
use serde::{Deserialize, Serialize};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{proc_cmdline_path, read_process_info, read_user_info};

#[cfg(not(target_os = "linux"))]
mod fallback;
#[cfg(not(target_os = "linux"))]
pub use fallback::{read_process_info, read_user_info};

/// Placeholder used when a process attribute cannot be determined
pub const UNKNOWN_NAME: &str = "<unknown>";

/// Information collected about a process.
///
/// `name` holds the raw command line as read from the OS and may contain
/// embedded NUL argument separators and trailing NUL padding; run it
/// through [`clean_process_commandline`] before display. `simple_name` is
/// the short comm-style name. Both may be truncated or contain arbitrary
/// bytes the process put there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessInfo {
    pub ppid: Pid,
    pub name: String,
    pub simple_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ProcessUserInfo>,
}

/// Controls how [`read_user_info`] attributes a process to a user
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadUserInfoConfig {
    /// Walk up parent processes to find the real user when the effective
    /// user is root
    pub resolve_root_user: bool,
    /// Resolve usernames for the uids during the read
    pub fetch_usernames: bool,
}

/// Identity of the user a process runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessUserInfo {
    pub ruid: u32,
    pub euid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    real_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    effective_username: Option<String>,
}

impl ProcessUserInfo {
    pub fn new(ruid: u32, euid: u32) -> Self {
        Self {
            ruid,
            euid,
            real_username: None,
            effective_username: None,
        }
    }

    /// Username for the real uid; resolved on demand if not cached
    pub fn real_username(&self) -> String {
        self.real_username
            .clone()
            .unwrap_or_else(|| uid_to_username(self.ruid))
    }

    /// Username for the effective uid; shares the real username when the
    /// uids match
    pub fn effective_username(&self) -> String {
        if let Some(name) = &self.effective_username {
            return name.clone();
        }
        if self.ruid == self.euid {
            self.real_username()
        } else {
            uid_to_username(self.euid)
        }
    }

    /// Resolve and cache both usernames
    pub(crate) fn fetch_usernames(&mut self) {
        let real = uid_to_username(self.ruid);
        self.effective_username = Some(if self.ruid == self.euid {
            real.clone()
        } else {
            uid_to_username(self.euid)
        });
        self.real_username = Some(real);
    }
}

/// Resolve a uid to a username, `<unknown>` when the lookup fails
#[cfg(unix)]
pub fn uid_to_username(uid: u32) -> String {
    match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => UNKNOWN_NAME.to_string(),
    }
}

#[cfg(not(unix))]
pub fn uid_to_username(_uid: u32) -> String {
    UNKNOWN_NAME.to_string()
}

/// Prepare a raw command line for display.
///
/// The OS reports command lines as NUL-separated argument lists, often
/// padded with trailing NULs. Strips the padding and turns the interior
/// separators into spaces. Pure function; safe on already-clean input.
pub fn clean_process_commandline(raw: &str) -> String {
    raw.trim_end_matches('\0').replace('\0', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_commandline_strips_nul_padding() {
        let mut raw = String::from("pfc[worker/663504]");
        raw.push_str(&"\0".repeat(112 - raw.len()));
        assert_eq!(112, raw.len());
        assert_eq!("pfc[worker/663504]", clean_process_commandline(&raw));
    }

    #[test]
    fn test_clean_commandline_converts_separators() {
        let raw = "buck2d[fbsource]\0--isolation-dir\0v2\0daemon\0{\"buck_config\":\"somevalue\"}\0";
        assert_eq!(
            "buck2d[fbsource] --isolation-dir v2 daemon {\"buck_config\":\"somevalue\"}",
            clean_process_commandline(raw)
        );
    }

    #[test]
    fn test_clean_commandline_plain_input_unchanged() {
        assert_eq!("edenfs --daemon", clean_process_commandline("edenfs --daemon"));
        assert_eq!("", clean_process_commandline(""));
    }

    #[test]
    fn test_user_info_effective_shares_real_when_uids_match() {
        let mut user = ProcessUserInfo::new(1000, 1000);
        user.real_username = Some("alice".to_string());
        // ruid == euid and no cached effective name: falls through to real
        assert_eq!("alice", user.effective_username());
    }

    #[test]
    fn test_user_info_distinct_euid_resolves_separately() {
        let mut user = ProcessUserInfo::new(1000, 0);
        user.real_username = Some("alice".to_string());
        user.effective_username = Some("root".to_string());
        assert_eq!("alice", user.real_username());
        assert_eq!("root", user.effective_username());
    }
}
