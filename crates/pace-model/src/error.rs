use thiserror::Error;

/// Errors raised while validating or decoding run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target must not be empty")]
    EmptyTarget,
    #[error("bucket must not be empty")]
    EmptyBucket,
    #[error("{field} must be greater than zero")]
    ZeroBound { field: &'static str },
    #[error("wait interval must be greater than zero when repeat is enabled")]
    ZeroInterval,
    #[error("task command must not be empty")]
    EmptyTaskCommand,
    #[error("malformed worker payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}
