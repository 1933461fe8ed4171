//! Process-group handling so a timeout or an interrupt can take down the
//! whole process tree.
//!
//! Each child leads its own group, so its pid is also the group id. The id is
//! recorded at spawn time and stays reserved while any member of the group is
//! alive: the kernel does not hand out a pid that is still in use as a process
//! group id. Signalling it right after a deadline therefore reaches the
//! original tree, or nothing at all.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::process::Command;

/// Start the child as leader of its own process group.
#[cfg(unix)]
pub fn isolate(command: &mut Command) {
    // SAFETY: setpgid is async-signal-safe and touches no parent state.
    unsafe {
        command.pre_exec(|| {
            if libc::setpgid(0, 0) == 0 {
                Ok(())
            } else {
                Err(std::io::Error::last_os_error())
            }
        });
    }
}

#[cfg(not(unix))]
pub fn isolate(_command: &mut Command) {}

/// Send SIGKILL to every process in the group `pgid`.
#[cfg(unix)]
pub fn kill_tree(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions; failure (ESRCH) is ignored.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

/// Only the direct child can be killed here; the caller does that.
#[cfg(not(unix))]
pub fn kill_tree(_pgid: u32) {}

/// Process groups of the children currently running, shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct ProcessGroups {
    live: Arc<Mutex<BTreeSet<u32>>>,
}

impl ProcessGroups {
    fn lock(&self) -> MutexGuard<'_, BTreeSet<u32>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `pgid` until the returned guard is dropped.
    pub fn register(&self, pgid: u32) -> GroupGuard {
        self.lock().insert(pgid);
        GroupGuard {
            groups: self.clone(),
            pgid,
        }
    }

    pub fn live(&self) -> Vec<u32> {
        self.lock().iter().copied().collect()
    }

    /// Kill every tracked group. Returns how many were signalled.
    pub fn kill_all(&self) -> usize {
        let groups = std::mem::take(&mut *self.lock());
        for &pgid in &groups {
            kill_tree(pgid);
        }
        groups.len()
    }
}

/// Keeps a group registered while its child runs.
#[derive(Debug)]
pub struct GroupGuard {
    groups: ProcessGroups,
    pgid: u32,
}

impl GroupGuard {
    pub fn pgid(&self) -> u32 {
        self.pgid
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.groups.lock().remove(&self.pgid);
    }
}
