//! # Repeat-until-stopped scheduling loop.
//!
//! ```text
//! Starting ──► Running ──► Waiting ──► Running ──► … ──► Stopped
//!                 │  (repeat = false)                       ▲
//!                 └─────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - runs are strictly sequential: the next run starts only after
//!   [`IsolatedRunner::run_isolated`] returned, i.e. after the child exited
//! - a failed run never breaks the cadence
//! - the stop flag is checked at loop top, after every run and by the
//!   cancellable wait, so a stop during the wait is honoured immediately

use std::{fmt, sync::Arc};

use pace_model::RunConfig;
use tracing::{debug, info, warn};

use crate::{runner::IsolatedRunner, state::SupervisorState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Waiting,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Waiting => "waiting",
            Phase::Stopped => "stopped",
        })
    }
}

/// What happened during one scheduler lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Number of runs started.
    pub runs: u64,
    /// Number of runs that reported failure.
    pub failures: u64,
    /// Result of the most recent run, if any.
    pub last_success: Option<bool>,
    /// A stop request ended the loop.
    pub interrupted: bool,
}

impl SchedulerReport {
    /// Whether the process should exit with a success status.
    ///
    /// Only a run-once invocation whose run failed, without a stop request,
    /// counts as a failed process.
    pub fn exit_success(&self, repeat: bool) -> bool {
        if repeat || self.interrupted {
            return true;
        }
        self.last_success.unwrap_or(true)
    }
}

pub struct Scheduler<R> {
    runner: R,
    state: Arc<SupervisorState>,
    phase: Phase,
}

impl<R: IsolatedRunner> Scheduler<R> {
    pub fn new(runner: R, state: Arc<SupervisorState>) -> Self {
        Self {
            runner,
            state,
            phase: Phase::Starting,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Drives runs for `cfg` until the configuration or a stop request ends the loop.
    pub async fn run(&mut self, cfg: &RunConfig) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        info!(
            target: "pace.core.scheduler",
            target_id = %cfg.target,
            repeat = cfg.repeat,
            wait_secs = cfg.wait_interval.as_secs(),
            runner = self.runner.name(),
            "scheduler started"
        );

        loop {
            if !self.state.is_running() {
                break;
            }

            self.transition(Phase::Running);
            report.runs += 1;
            let run = report.runs;
            info!(target: "pace.core.scheduler", run, "run starting");

            let ok = self.runner.run_isolated(cfg).await;
            report.last_success = Some(ok);
            if ok {
                info!(target: "pace.core.scheduler", run, "run finished");
            } else {
                report.failures += 1;
                warn!(target: "pace.core.scheduler", run, "run failed");
            }

            if !cfg.repeat || !self.state.is_running() {
                break;
            }

            self.transition(Phase::Waiting);
            debug!(
                target: "pace.core.scheduler",
                wait_secs = cfg.wait_interval.as_secs(),
                "waiting before next run"
            );
            if !self.state.wait(cfg.wait_interval).await {
                break;
            }
        }

        report.interrupted = !self.state.is_running();
        self.transition(Phase::Stopped);
        info!(
            target: "pace.core.scheduler",
            runs = report.runs,
            failures = report.failures,
            interrupted = report.interrupted,
            "scheduler stopped"
        );
        report
    }

    fn transition(&mut self, next: Phase) {
        if self.phase != next {
            debug!(target: "pace.core.scheduler", from = %self.phase, to = %next, "phase transition");
            self.phase = next;
        }
    }
}
