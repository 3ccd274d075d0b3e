use serde::{Deserialize, Serialize};

use crate::{config::RunConfig, error::ConfigError};

/// How the collaborator is launched: a program plus its leading arguments.
///
/// Request flags are appended after `args` at call time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCommand {
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl TaskCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
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

/// Serialised task descriptor handed to an isolated worker process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPayload {
    pub run: RunConfig,
    pub task: TaskCommand,
}

impl WorkerPayload {
    pub fn new(run: RunConfig, task: TaskCommand) -> Self {
        Self { run, task }
    }

    /// Encodes the payload as a single command-line argument.
    pub fn encode(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes and validates a payload received on the command line.
    pub fn decode(raw: &str) -> Result<Self, ConfigError> {
        let payload: Self = serde_json::from_str(raw)?;
        if payload.task.program.trim().is_empty() {
            return Err(ConfigError::EmptyTaskCommand);
        }
        payload.run.validate()?;
        Ok(payload)
    }
}
