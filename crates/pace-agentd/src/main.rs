//! `pace-agentd`: supervisor for a periodic crawl-and-upload task.
//!
//! Without a subcommand the binary runs the scheduler loop and spawns itself
//! in `worker` mode for every run.

mod cli;
mod supervisor;
mod worker;

use std::process::ExitCode;

use clap::Parser;
use pace_observe::logger_init;
use tracing::error;

use crate::cli::{Cli, Command};

/// Exit code for configuration the supervisor refuses to start with.
pub(crate) const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Before the runtime exists: the local UTC offset is only readable while
    // the process is single-threaded.
    if let Err(e) = logger_init(&cli.log.logger_config()) {
        eprintln!("Error: {e}");
        return ExitCode::from(EXIT_CONFIG);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(target: "pace.agentd", error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async move {
        match cli.command {
            Some(Command::Worker(args)) => Ok(worker::run(args).await),
            None => supervisor::run(cli.run, cli.log).await,
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(target: "pace.agentd", error = %format!("{e:#}"), "supervisor failed");
            ExitCode::FAILURE
        }
    }
}
