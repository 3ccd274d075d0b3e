use std::time::Duration;

use pace_core::CoreError;
use pace_model::ConfigError;
use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32 },
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("killed by signal")]
    KilledBySignal,
    #[error("missing program")]
    MissingProgram,
    #[error("io error: {0}")]
    Io(String),
    #[error("collaborator produced no report")]
    MissingReport,
    #[error("invalid collaborator report: {0}")]
    InvalidReport(String),
    #[error("run exceeded timeout of {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("payload: {0}")]
    Payload(#[from] ConfigError),
    #[error("registration: {0}")]
    Registration(#[from] CoreError),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

impl ExecError {
    /// Maps a finished process' status to an error, `None` on success.
    pub fn from_status(status: std::process::ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        Some(match status.code() {
            Some(code) => ExecError::NonZeroExit { code },
            None => ExecError::KilledBySignal,
        })
    }
}
