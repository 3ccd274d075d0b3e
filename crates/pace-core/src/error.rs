use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to install signal handler: {0}")]
    SignalInstall(#[from] std::io::Error),
    #[error("failed to signal process group {pid}: {reason}")]
    Signal { pid: u32, reason: String },
    #[error("invalid child pid: {0}")]
    InvalidPid(u32),
    #[error("process signalling is not supported on this platform")]
    Unsupported,
}
