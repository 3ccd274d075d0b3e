use std::{process::Stdio, sync::Arc};

use async_trait::async_trait;
use pace_model::{CrawlReport, CrawlRequest, TaskCommand};
use tracing::{debug, trace, warn};

use crate::{
    error::ExecError,
    output::{LineSink, LossyLines, Stream},
    task::Collaborator,
    util::cmd_program,
};

/// Collaborator backed by an external program.
///
/// The request is appended to the configured arguments as flags. Every stdout
/// line is forwarded to the sink except the last non-empty one, which must be
/// the JSON [`CrawlReport`]. Stderr is inherited.
pub struct CommandCollaborator {
    command: TaskCommand,
    sink: Arc<dyn LineSink>,
}

impl CommandCollaborator {
    pub fn new(command: TaskCommand, sink: Arc<dyn LineSink>) -> Self {
        Self { command, sink }
    }
}

/// Renders a request as the collaborator's command-line flags.
pub fn request_args(req: &CrawlRequest) -> Vec<String> {
    let mut args = vec![
        "--url".to_string(),
        req.target.clone(),
        "--max-pages".to_string(),
        req.max_pages.to_string(),
        "--max-depth".to_string(),
        req.max_depth.to_string(),
        "--bucket".to_string(),
        req.bucket.clone(),
    ];
    if !req.remove_local_files {
        args.push("--keep-local-files".to_string());
    }
    if !req.skip_existing {
        args.push("--no-skip-existing".to_string());
    }
    if !req.force_fresh_crawl {
        args.push("--no-force-fresh".to_string());
    }
    args
}

#[async_trait]
impl Collaborator for CommandCollaborator {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn crawl(&self, req: &CrawlRequest) -> Result<CrawlReport, ExecError> {
        if self.command.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let mut cmd = cmd_program(&self.command.program, &self.command.args);
        cmd.args(request_args(req));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        trace!(target: "pace.exec.task", program = %self.command.program, "spawn collaborator");
        let mut child = cmd
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{}: {e}", self.command.program)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Io("collaborator stdout is not piped".into()))?;
        let mut lines = LossyLines::new(stdout);

        // Hold back one line: the final one is the report, not progress.
        let mut last: Option<String> = None;
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(prev) = last.replace(line) {
                self.sink.line(Stream::Stdout, &prev);
            }
        }

        let status = child.wait().await?;
        let Some(last) = last else {
            return Err(ExecError::from_status(status).unwrap_or(ExecError::MissingReport));
        };

        match serde_json::from_str::<CrawlReport>(&last) {
            Ok(report) => {
                if !status.success() {
                    debug!(target: "pace.exec.task", ?status, "collaborator exited non-zero but produced a report");
                }
                Ok(report)
            }
            Err(e) => {
                self.sink.line(Stream::Stdout, &last);
                match ExecError::from_status(status) {
                    Some(exit) => Err(exit),
                    None => {
                        warn!(target: "pace.exec.task", error = %e, "collaborator report is not valid json");
                        Err(ExecError::InvalidReport(e.to_string()))
                    }
                }
            }
        }
    }
}
