//! Process-wide run/stop flag and registry of live children.
//!
//! ## Rules
//! - `running` starts `true` and only ever flips to `false`
//! - registry mutations (register, deregister, drain) take the same lock
//! - `register` re-checks `running` under that lock, so a child spawned while
//!   a stop is in progress is never silently left behind

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::handle::ChildProcessHandle;

/// Shared supervisor state, passed by `Arc` to the scheduler, the runner and
/// the shutdown coordinator.
#[derive(Debug)]
pub struct SupervisorState {
    running: AtomicBool,
    stop: CancellationToken,
    children: Mutex<HashMap<u32, ChildProcessHandle>>,
}

impl SupervisorState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(true),
            stop: CancellationToken::new(),
            children: Mutex::new(HashMap::new()),
        })
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flips the state to "not running" and wakes every pending [`wait`](Self::wait).
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn request_stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        self.stop.cancel();
        if was_running {
            debug!(target: "pace.core.state", "stop requested");
        }
        was_running
    }

    /// Token cancelled once a stop has been requested.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Waits for `interval` unless a stop arrives first.
    ///
    /// Returns `true` when the full interval elapsed and the state is still
    /// running, `false` as soon as a stop is observed.
    pub async fn wait(&self, interval: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => self.is_running(),
            _ = self.stop.cancelled() => false,
        }
    }

    /// Adds a freshly spawned child to the registry.
    ///
    /// Fails with the handle when a stop has already been requested; the
    /// caller then owns the child and must terminate it.
    pub fn register(&self, handle: ChildProcessHandle) -> Result<(), ChildProcessHandle> {
        let mut children = self.children.lock();
        if !self.is_running() {
            return Err(handle);
        }
        trace!(target: "pace.core.state", pid = handle.pid(), run_id = %handle.run_id(), "child registered");
        children.insert(handle.pid(), handle);
        Ok(())
    }

    /// Removes a child from the registry. Safe to call for unknown pids.
    pub fn deregister(&self, pid: u32) -> Option<ChildProcessHandle> {
        let removed = self.children.lock().remove(&pid);
        if removed.is_some() {
            trace!(target: "pace.core.state", pid, "child deregistered");
        }
        removed
    }

    /// Atomically takes every registered child out of the registry.
    pub fn drain(&self) -> Vec<ChildProcessHandle> {
        let mut handles: Vec<ChildProcessHandle> =
            self.children.lock().drain().map(|(_, h)| h).collect();
        handles.sort_unstable_by_key(ChildProcessHandle::pid);
        handles
    }

    /// Snapshot of registered children, sorted by pid.
    pub fn live_children(&self) -> Vec<ChildProcessHandle> {
        let mut handles: Vec<ChildProcessHandle> =
            self.children.lock().values().cloned().collect();
        handles.sort_unstable_by_key(ChildProcessHandle::pid);
        handles
    }

    pub fn live_count(&self) -> usize {
        self.children.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn handle(pid: u32) -> ChildProcessHandle {
        ChildProcessHandle::new(pid, "target").unwrap()
    }

    #[test]
    fn starts_running_and_empty() {
        let state = SupervisorState::new();
        assert!(state.is_running());
        assert_eq!(state.live_count(), 0);
    }

    #[test]
    fn stop_is_one_way_and_reports_transition_once() {
        let state = SupervisorState::new();
        assert!(state.request_stop());
        assert!(!state.request_stop());
        assert!(!state.is_running());
        assert!(state.stop_token().is_cancelled());
    }

    #[test]
    fn register_and_deregister() {
        let state = SupervisorState::new();
        state.register(handle(100)).unwrap();
        state.register(handle(200)).unwrap();
        assert_eq!(state.live_count(), 2);

        assert_eq!(state.deregister(100).map(|h| h.pid()), Some(100));
        assert!(state.deregister(100).is_none());
        assert_eq!(
            state.live_children().iter().map(|h| h.pid()).collect::<Vec<_>>(),
            vec![200]
        );
    }

    #[test]
    fn register_after_stop_hands_the_child_back() {
        let state = SupervisorState::new();
        state.request_stop();
        let rejected = state.register(handle(300)).unwrap_err();
        assert_eq!(rejected.pid(), 300);
        assert_eq!(state.live_count(), 0);
    }

    #[test]
    fn drain_empties_the_registry() {
        let state = SupervisorState::new();
        state.register(handle(30)).unwrap();
        state.register(handle(10)).unwrap();

        let drained: Vec<u32> = state.drain().iter().map(|h| h.pid()).collect();
        assert_eq!(drained, vec![10, 30]);
        assert_eq!(state.live_count(), 0);
        assert!(state.drain().is_empty());
    }

    #[tokio::test]
    async fn wait_runs_full_interval_when_not_stopped() {
        let state = SupervisorState::new();
        let started = Instant::now();
        assert!(state.wait(Duration::from_millis(50)).await);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn wait_returns_early_on_stop() {
        let state = SupervisorState::new();
        let stopper = Arc::clone(&state);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.request_stop();
        });

        let started = Instant::now();
        assert!(!state.wait(Duration::from_secs(10)).await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn wait_after_stop_returns_immediately() {
        let state = SupervisorState::new();
        state.request_stop();
        assert!(!state.wait(Duration::from_secs(10)).await);
    }
}
