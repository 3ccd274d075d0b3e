//! Process-level execution: the task executor that calls the crawl
//! collaborator, and the isolation runner that wraps one task run in a
//! dedicated child process.
mod error;
pub use error::{ExecError, ExecResult};

mod util;

pub mod output;
pub use output::{CaptureSink, LineSink, ConsoleSink, Stream};

pub mod task;
pub use task::{Collaborator, CommandCollaborator, execute};

pub mod proc;
pub use proc::{ProcConfig, ProcRunner, WorkerCommand};

pub mod utils;

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::output::{LineSink, ConsoleSink, Stream};
    pub use crate::proc::{ProcConfig, ProcRunner, WorkerCommand};
    pub use crate::task::{Collaborator, CommandCollaborator, execute};
    pub use crate::utils::limits::RlimitConfig;
}
