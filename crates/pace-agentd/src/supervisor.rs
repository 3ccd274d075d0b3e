//! Supervisor mode: signal handling, the scheduler loop and worker spawning.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pace_core::{Scheduler, ShutdownConfig, ShutdownCoordinator, SupervisorState};
use pace_exec::{ConsoleSink, ProcConfig, ProcRunner, WorkerCommand};
use pace_model::ConfigError;
use tracing::{error, info};

use crate::EXIT_CONFIG;
use crate::cli::{LogArgs, RunArgs};

pub async fn run(args: RunArgs, log: LogArgs) -> anyhow::Result<ExitCode> {
    let cfg = args.run_config();
    let task = args.task_command();
    let checked = cfg.validate().and_then(|()| {
        if task.program.trim().is_empty() {
            Err(ConfigError::EmptyTaskCommand)
        } else {
            Ok(())
        }
    });
    if let Err(e) = checked {
        error!(target: "pace.agentd", error = %e, "invalid configuration");
        return Ok(ExitCode::from(EXIT_CONFIG));
    }

    let state = SupervisorState::new();
    let shutdown = ShutdownConfig {
        grace: Duration::from_millis(args.grace_ms),
        ..ShutdownConfig::default()
    };
    let coordinator = ShutdownCoordinator::new(Arc::clone(&state), shutdown);
    // Dropped last: kills whatever is still registered on every way out.
    let _guard = coordinator
        .install()
        .context("installing signal handlers")?;

    let worker = WorkerCommand::current_exe()
        .context("locating own executable")?
        .with_args(log.forward())
        .with_args(["worker", "--payload"]);

    let mut proc_cfg = ProcConfig::new(worker, task);
    proc_cfg.run_timeout = args.run_timeout_secs.map(Duration::from_secs);
    proc_cfg.escalation = shutdown;
    proc_cfg.limits = args.limits();

    let runner = ProcRunner::new(proc_cfg, Arc::clone(&state), Arc::new(ConsoleSink));
    let mut scheduler = Scheduler::new(runner, Arc::clone(&state));

    info!(
        target: "pace.agentd",
        target_id = %cfg.target,
        bucket = %cfg.bucket,
        repeat = cfg.repeat,
        wait_secs = cfg.wait_interval.as_secs(),
        "supervisor started"
    );
    let report = scheduler.run(&cfg).await;
    info!(
        target: "pace.agentd",
        runs = report.runs,
        failures = report.failures,
        interrupted = report.interrupted,
        "supervisor stopped"
    );

    Ok(if report.exit_success(cfg.repeat) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
