/*!
 * Linux Resolver
 * Reads process identity from /proc; failures synthesize placeholder values
 */

use super::{ProcessInfo, ProcessUserInfo, ReadUserInfoConfig, UNKNOWN_NAME};
use crate::core::limits::CMDLINE_READ_MAX;
use crate::core::types::Pid;
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Path of a pid's raw command line file
pub fn proc_cmdline_path(pid: Pid) -> PathBuf {
    PathBuf::from(format!("/proc/{}/cmdline", pid.as_raw()))
}

/// Read a pid's info via /proc. Never fails: unreadable attributes come
/// back as synthesized `<err:N>` / `<unknown>` placeholders so the result
/// is always cacheable.
///
/// Does not fill `user`; call [`read_user_info`] for that.
pub fn read_process_info(pid: Pid) -> ProcessInfo {
    let name = read_process_name(pid);
    let (ppid, simple_name) = match process_status(pid) {
        Some(status) => (status.ppid, status.name),
        None => (Pid(0), UNKNOWN_NAME.to_string()),
    };
    ProcessInfo {
        ppid,
        name,
        simple_name,
        user: None,
    }
}

/// Raw command line, capped at `CMDLINE_READ_MAX` bytes.
///
/// Embedded NUL separators and trailing padding are preserved; display
/// code cleans them up with `clean_process_commandline`. Truncating one
/// read beats looping for completeness here.
fn read_process_name(pid: Pid) -> String {
    let mut file = match File::open(proc_cmdline_path(pid)) {
        Ok(file) => file,
        Err(err) => return format!("<err:{}>", err.raw_os_error().unwrap_or(0)),
    };
    let mut raw = Vec::with_capacity(CMDLINE_READ_MAX);
    match file.take(CMDLINE_READ_MAX as u64).read_to_end(&mut raw) {
        Ok(_) => String::from_utf8_lossy(&raw).into_owned(),
        Err(err) => format!("<err:{}>", err.raw_os_error().unwrap_or(0)),
    }
}

/// Identity of the user running `pid`, or `None` if its status cannot be
/// read.
///
/// With `resolve_root_user`, walks up the parent chain while the owner is
/// root (stopping at pid 1) so daemons spawned via sudo attribute to the
/// invoking user. The effective uid is always the starting process's.
pub fn read_user_info(pid: Pid, config: ReadUserInfoConfig) -> Option<ProcessUserInfo> {
    let mut user: Option<ProcessUserInfo> = None;
    let mut current = pid;
    loop {
        let status = match process_status(current) {
            Some(status) => status,
            None => break,
        };
        let info = user.get_or_insert_with(|| ProcessUserInfo::new(status.uid, status.uid));
        info.ruid = status.uid;

        if !(config.resolve_root_user && status.uid == 0 && status.pid != Pid(1)) {
            break;
        }
        current = status.ppid;
    }

    if config.fetch_usernames {
        if let Some(info) = &mut user {
            info.fetch_usernames();
        }
    }
    user
}

struct StatusSnapshot {
    pid: Pid,
    ppid: Pid,
    uid: u32,
    name: String,
}

fn process_status(pid: Pid) -> Option<StatusSnapshot> {
    let status = procfs::process::Process::new(pid.as_raw())
        .and_then(|process| process.status())
        .map_err(|err| {
            debug!("failed to read status for pid {}: {}", pid, err);
            err
        })
        .ok()?;
    Some(StatusSnapshot {
        pid: Pid(status.pid),
        ppid: Pid(status.ppid),
        uid: status.ruid,
        name: status.name,
    })
}
