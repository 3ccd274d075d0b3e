//! # Shutdown coordinator.
//!
//! Turns termination requests into a stopped [`SupervisorState`] and makes
//! sure no child outlives the supervisor.
//!
//! ```text
//! SIGINT/SIGTERM/SIGQUIT ──► stop(reason)
//!                               ├─► state.request_stop()   (wakes the scheduler wait)
//!                               └─► cleanup()
//!                                     ├─► drain registry (under lock)
//!                                     ├─► SIGTERM every group
//!                                     ├─► poll liveness until grace elapses
//!                                     └─► SIGKILL survivors
//! ```
//!
//! `cleanup` is synchronous and idempotent; it also runs from [`ExitGuard`]'s
//! `Drop` so every exit path of the supervisor reaps its children.

mod signals;
pub use signals::{ShutdownSignal, SignalListener};

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, warn};

use crate::{error::CoreError, handle::ChildProcessHandle, state::SupervisorState};

/// Timing of the terminate → kill escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownConfig {
    /// How long terminated children get before they are killed.
    pub grace: Duration,
    /// Liveness polling step while waiting out the grace period.
    pub poll: Duration,
}

impl Default for ShutdownConfig {
    /// `grace = 1s`, `poll = 25ms`.
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(1),
            poll: Duration::from_millis(25),
        }
    }
}

/// Outcome of one [`ShutdownCoordinator::cleanup`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Children that were asked to terminate.
    pub terminated: usize,
    /// Children still alive after the grace period and force-killed.
    pub killed: usize,
}

#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    state: Arc<SupervisorState>,
    cfg: ShutdownConfig,
}

impl ShutdownCoordinator {
    pub fn new(state: Arc<SupervisorState>, cfg: ShutdownConfig) -> Self {
        Self { state, cfg }
    }

    pub fn state(&self) -> &Arc<SupervisorState> {
        &self.state
    }

    /// Handles one stop request. Safe to call any number of times.
    pub fn stop(&self, reason: &str) -> CleanupReport {
        if self.state.request_stop() {
            info!(target: "pace.core.shutdown", reason, "shutdown requested");
        } else {
            debug!(target: "pace.core.shutdown", reason, "shutdown already in progress");
        }
        self.cleanup()
    }

    /// Terminates every registered child, escalating to kill after the grace
    /// period. Leaves the registry empty.
    pub fn cleanup(&self) -> CleanupReport {
        let handles = self.state.drain();
        if handles.is_empty() {
            return CleanupReport::default();
        }

        for h in &handles {
            debug!(target: "pace.core.shutdown", pid = h.pid(), run_id = %h.run_id(), "terminating child");
            log_signal_error(h, h.terminate());
        }

        let survivors = self.wait_for_exit(&handles);
        for h in &survivors {
            warn!(
                target: "pace.core.shutdown",
                pid = h.pid(),
                grace_ms = self.cfg.grace.as_millis() as u64,
                "child ignored terminate; killing"
            );
            log_signal_error(h, h.kill());
        }

        let report = CleanupReport {
            terminated: handles.len(),
            killed: survivors.len(),
        };
        info!(
            target: "pace.core.shutdown",
            terminated = report.terminated,
            killed = report.killed,
            "children cleaned up"
        );
        report
    }

    /// Spawns the OS signal listener and returns the exit guard.
    ///
    /// Every delivered signal triggers [`stop`](Self::stop) on a blocking
    /// thread. Stops run one at a time: a signal that arrives during a cleanup
    /// is picked up after it finishes, and finds an already drained registry.
    pub fn install(&self) -> Result<ExitGuard, CoreError> {
        let mut listener = SignalListener::install()?;
        let me = self.clone();

        tokio::spawn(async move {
            while let Some(sig) = listener.recv().await {
                let coordinator = me.clone();
                let stop = tokio::task::spawn_blocking(move || coordinator.stop(sig.as_str()));
                if let Err(e) = stop.await {
                    error!(target: "pace.core.shutdown", signal = %sig, error = %e, "stop handler panicked");
                }
            }
        });

        Ok(ExitGuard {
            coordinator: self.clone(),
        })
    }

    fn wait_for_exit(&self, handles: &[ChildProcessHandle]) -> Vec<ChildProcessHandle> {
        let deadline = std::time::Instant::now() + self.cfg.grace;
        loop {
            let alive: Vec<ChildProcessHandle> =
                handles.iter().filter(|h| h.is_alive()).cloned().collect();
            if alive.is_empty() || std::time::Instant::now() >= deadline {
                return alive;
            }
            std::thread::sleep(self.cfg.poll);
        }
    }
}

fn log_signal_error(h: &ChildProcessHandle, res: Result<(), CoreError>) {
    if let Err(e) = res {
        warn!(target: "pace.core.shutdown", pid = h.pid(), error = %e, "signal delivery failed");
    }
}

/// Runs a final [`ShutdownCoordinator::cleanup`] when dropped.
///
/// Keep it alive for the whole `main`; dropping happens on normal return,
/// on `?` error returns and while unwinding a panic.
#[must_use = "dropping the guard immediately runs the exit cleanup"]
#[derive(Debug)]
pub struct ExitGuard {
    coordinator: ShutdownCoordinator,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let report = self.coordinator.cleanup();
        if report.terminated > 0 {
            debug!(target: "pace.core.shutdown", terminated = report.terminated, "exit cleanup reaped children");
        }
    }
}
