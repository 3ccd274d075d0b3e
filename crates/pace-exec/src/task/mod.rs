//! Task executor: one call to the crawl-and-upload collaborator per run.
//!
//! The executor never retries and never swallows collaborator errors; they
//! propagate to the worker entrypoint, which turns them into a non-zero exit.

mod command;
pub use command::{CommandCollaborator, request_args};

use async_trait::async_trait;
use pace_model::{CrawlReport, CrawlRequest, RunConfig, RunOutcome};
use tracing::{debug, info};

use crate::{
    error::ExecError,
    output::{LineSink, Stream},
};

/// The external crawl-and-upload task.
#[async_trait]
pub trait Collaborator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn crawl(&self, req: &CrawlRequest) -> Result<CrawlReport, ExecError>;
}

/// Calls `collaborator` once for `cfg`, normalises its report and writes the
/// run summary to `sink`.
pub async fn execute<C>(
    collaborator: &C,
    cfg: &RunConfig,
    sink: &dyn LineSink,
) -> Result<RunOutcome, ExecError>
where
    C: Collaborator + ?Sized,
{
    let req = CrawlRequest::from(cfg);
    info!(
        target: "pace.exec.task",
        collaborator = collaborator.name(),
        target_id = %req.target,
        max_pages = req.max_pages,
        max_depth = req.max_depth,
        "crawl starting"
    );

    let report = collaborator.crawl(&req).await?;
    let outcome = RunOutcome::from_report(&cfg.target, &cfg.bucket, report);
    debug!(
        target: "pace.exec.task",
        success = outcome.success,
        pages = outcome.pages_crawled,
        uploaded = outcome.files_uploaded,
        skipped = outcome.files_skipped,
        bytes = outcome.bytes_uploaded,
        "crawl finished"
    );

    sink.line(Stream::Stdout, "");
    for line in outcome.summary_lines() {
        sink.line(Stream::Stdout, &line);
    }
    Ok(outcome)
}
