//! Worker mode: one task run inside the process the supervisor spawned.
//!
//! The outcome leaves this process only as the exit status; everything
//! printed here is forwarded by the supervisor.

use std::process::ExitCode;
use std::sync::Arc;

use pace_exec::{CommandCollaborator, ConsoleSink, LineSink, Stream, execute};
use pace_model::WorkerPayload;
use tracing::{debug, error};

use crate::EXIT_CONFIG;
use crate::cli::WorkerArgs;

pub async fn run(args: WorkerArgs) -> ExitCode {
    let payload = match WorkerPayload::decode(&args.payload) {
        Ok(payload) => payload,
        Err(e) => {
            error!(target: "pace.agentd.worker", error = %e, "malformed worker payload");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    debug!(target: "pace.agentd.worker", target_id = %payload.run.target, program = %payload.task.program, "worker started");

    let sink: Arc<dyn LineSink> = Arc::new(ConsoleSink);
    let collaborator = CommandCollaborator::new(payload.task, Arc::clone(&sink));

    match execute(&collaborator, &payload.run, sink.as_ref()).await {
        Ok(outcome) if outcome.success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!(target: "pace.agentd.worker", error = %e, "task run failed");
            sink.line(Stream::Stdout, "");
            sink.line(Stream::Stdout, &format!("Error: {e}"));
            ExitCode::FAILURE
        }
    }
}
