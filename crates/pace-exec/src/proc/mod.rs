//! # Isolation runner.
//!
//! Executes one task run inside a dedicated worker process:
//!
//! ```text
//! spawn worker (own process group, payload as last arg)
//!   ├─► register handle in SupervisorState   (or terminate if already stopping)
//!   ├─► forward stdout/stderr line by line
//!   ├─► wait for exit                        (optional run timeout → terminate → kill)
//!   ├─► deregister                           (always, via drop guard)
//!   └─► exit status == 0
//! ```
//!
//! Only success/failure crosses the process boundary; metrics are visible in
//! the forwarded output.

use std::{
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use pace_core::{ChildProcessHandle, IsolatedRunner, ShutdownConfig, SupervisorState};
use pace_model::{RunConfig, TaskCommand, WorkerPayload};
use tokio::process::Child;
use tracing::{debug, error, info, warn};

use crate::{
    error::{ExecError, ExecResult},
    output::{LineSink, Stream, forward},
    util::{cmd_program, own_process_group},
    utils::limits::{RlimitConfig, attach_rlimits},
};

/// How long forwarded output may keep draining after the worker exited.
const OUTPUT_DRAIN: Duration = Duration::from_secs(1);

/// Program used to start a worker. The encoded payload is appended as the
/// last argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-launches the running executable.
    pub fn current_exe() -> Result<Self, ExecError> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

#[derive(Clone, Debug)]
pub struct ProcConfig {
    pub worker: WorkerCommand,
    /// Collaborator the worker should call.
    pub task: TaskCommand,
    /// Upper bound for one run; `None` lets a run take as long as it needs.
    pub run_timeout: Option<Duration>,
    /// Terminate → kill escalation used when a run times out.
    pub escalation: ShutdownConfig,
    pub limits: RlimitConfig,
}

impl ProcConfig {
    pub fn new(worker: WorkerCommand, task: TaskCommand) -> Self {
        Self {
            worker,
            task,
            run_timeout: None,
            escalation: ShutdownConfig::default(),
            limits: RlimitConfig::default(),
        }
    }
}

pub struct ProcRunner {
    name: &'static str,
    cfg: ProcConfig,
    state: Arc<SupervisorState>,
    sink: Arc<dyn LineSink>,
}

impl ProcRunner {
    pub fn new(cfg: ProcConfig, state: Arc<SupervisorState>, sink: Arc<dyn LineSink>) -> Self {
        Self {
            name: "proc",
            cfg,
            state,
            sink,
        }
    }

    async fn spawn_and_wait(&self, run: &RunConfig) -> ExecResult<bool> {
        let payload = WorkerPayload::new(run.clone(), self.cfg.task.clone()).encode()?;
        let worker = &self.cfg.worker;

        let mut cmd = cmd_program(&worker.program, &worker.args);
        cmd.arg(payload);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        own_process_group(&mut cmd);
        attach_rlimits(&mut cmd, &self.cfg.limits);

        let mut child = cmd
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{}: {e}", worker.program.display())))?;
        let pid = child
            .id()
            .ok_or_else(|| ExecError::Spawn("worker exited before registration".into()))?;
        let handle = ChildProcessHandle::new(pid, &run.target)?;
        let run_id = handle.run_id();

        let _registration = match self.register(handle.clone()) {
            Some(guard) => guard,
            None => {
                warn!(target: "pace.exec.proc", pid, "stop requested while spawning; killing worker");
                if let Err(e) = handle.kill() {
                    warn!(target: "pace.exec.proc", pid, error = %e, "signal delivery failed");
                }
                if let Err(e) = child.wait().await {
                    warn!(target: "pace.exec.proc", pid, error = %e, "failed to reap rejected worker");
                }
                return Ok(false);
            }
        };
        debug!(target: "pace.exec.proc", pid, %run_id, "worker spawned");

        let mut pumps = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            pumps.push(forward(out, Stream::Stdout, Arc::clone(&self.sink)));
        }
        if let Some(err) = child.stderr.take() {
            pumps.push(forward(err, Stream::Stderr, Arc::clone(&self.sink)));
        }

        let status = self.wait_child(&mut child, &handle).await;

        for mut pump in pumps {
            if tokio::time::timeout(OUTPUT_DRAIN, &mut pump).await.is_err() {
                debug!(target: "pace.exec.proc", pid, "output still open after exit; detaching");
                pump.abort();
            }
        }

        let status = status?;
        match ExecError::from_status(status) {
            None => {
                info!(target: "pace.exec.proc", pid, %run_id, elapsed_ms = handle.uptime().as_millis() as u64, "worker exited successfully");
                Ok(true)
            }
            Some(e) => {
                warn!(target: "pace.exec.proc", pid, %run_id, reason = %e, "worker failed");
                // A worker that exited on its own already printed its result.
                if matches!(e, ExecError::KilledBySignal) {
                    self.print_error(&e);
                }
                Ok(false)
            }
        }
    }

    /// Result line for runs whose worker could not print one.
    fn print_error(&self, e: &ExecError) {
        self.sink.line(Stream::Stdout, "");
        self.sink.line(Stream::Stdout, &format!("Error: {e}"));
    }

    fn register(&self, handle: ChildProcessHandle) -> Option<Registration<'_>> {
        let pid = handle.pid();
        self.state.register(handle).ok()?;
        Some(Registration {
            state: &self.state,
            pid,
        })
    }

    async fn wait_child(
        &self,
        child: &mut Child,
        handle: &ChildProcessHandle,
    ) -> ExecResult<ExitStatus> {
        let Some(limit) = self.cfg.run_timeout else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_elapsed) => {
                warn!(target: "pace.exec.proc", pid = handle.pid(), timeout_ms = limit.as_millis() as u64, "run timed out; terminating worker");
                handle.terminate()?;
                if tokio::time::timeout(self.cfg.escalation.grace, child.wait())
                    .await
                    .is_err()
                {
                    handle.kill()?;
                    child.wait().await?;
                }
                Err(ExecError::Timeout { timeout: limit })
            }
        }
    }
}

/// Removes the worker from the registry however the run ends.
struct Registration<'a> {
    state: &'a SupervisorState,
    pid: u32,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.state.deregister(self.pid);
    }
}

#[async_trait]
impl IsolatedRunner for ProcRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run_isolated(&self, cfg: &RunConfig) -> bool {
        match self.spawn_and_wait(cfg).await {
            Ok(ok) => ok,
            Err(e) => {
                error!(target: "pace.exec.proc", target_id = %cfg.target, error = %e, "isolated run failed");
                self.print_error(&e);
                false
            }
        }
    }
}
