//! Handle to one in-flight isolated run.
//!
//! Workers are spawned as process-group leaders, so every signal here is
//! delivered to the whole group: the worker and whatever collaborator process
//! it started go down together.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct ChildProcessHandle {
    pid: u32,
    run_id: Uuid,
    target: String,
    spawned_at: Instant,
}

impl ChildProcessHandle {
    /// Wraps a freshly spawned process-group leader.
    ///
    /// Pids `0` and `1` are rejected: signalling group 0 would hit the
    /// supervisor's own group.
    pub fn new(pid: u32, target: impl Into<String>) -> Result<Self, CoreError> {
        if pid <= 1 || i32::try_from(pid).is_err() {
            return Err(CoreError::InvalidPid(pid));
        }
        Ok(Self {
            pid,
            run_id: Uuid::new_v4(),
            target: target.into(),
            spawned_at: Instant::now(),
        })
    }

    #[inline]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    #[inline]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub fn uptime(&self) -> Duration {
        self.spawned_at.elapsed()
    }

    /// Returns `true` while any process of the group still exists.
    ///
    /// An exited but not yet reaped worker still counts as alive.
    pub fn is_alive(&self) -> bool {
        sys::probe(self.pid)
    }

    /// Politely asks the group to stop (`SIGTERM`).
    ///
    /// A group that is already gone is not an error.
    pub fn terminate(&self) -> Result<(), CoreError> {
        sys::terminate(self.pid)
    }

    /// Forcefully stops the group (`SIGKILL`).
    pub fn kill(&self) -> Result<(), CoreError> {
        sys::kill(self.pid)
    }
}

#[cfg(unix)]
mod sys {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    use crate::error::CoreError;

    pub fn probe(pid: u32) -> bool {
        killpg(Pid::from_raw(pid as i32), None::<Signal>).is_ok()
    }

    pub fn terminate(pid: u32) -> Result<(), CoreError> {
        send(pid, Signal::SIGTERM)
    }

    pub fn kill(pid: u32) -> Result<(), CoreError> {
        send(pid, Signal::SIGKILL)
    }

    fn send(pid: u32, sig: Signal) -> Result<(), CoreError> {
        match killpg(Pid::from_raw(pid as i32), sig) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(CoreError::Signal {
                pid,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use crate::error::CoreError;

    pub fn probe(_pid: u32) -> bool {
        false
    }

    pub fn terminate(_pid: u32) -> Result<(), CoreError> {
        Err(CoreError::Unsupported)
    }

    pub fn kill(_pid: u32) -> Result<(), CoreError> {
        Err(CoreError::Unsupported)
    }
}
