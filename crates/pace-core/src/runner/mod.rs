use async_trait::async_trait;
use pace_model::RunConfig;

/// Executes one task run out of process.
///
/// Implementations register the spawned child in the shared
/// [`SupervisorState`](crate::SupervisorState) for as long as it lives and only
/// report success or failure; detailed metrics stay in the child's output.
#[async_trait]
pub trait IsolatedRunner: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs the task once and returns `true` when the child exited with status 0.
    async fn run_isolated(&self, cfg: &RunConfig) -> bool;
}
