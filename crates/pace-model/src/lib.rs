//! Data model shared by the supervising process and its isolated workers.
//!
//! Everything here is plain data: it is built once at startup, serialised into
//! the worker payload and read back on the other side of the process boundary.

mod config;
pub use config::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_WAIT_INTERVAL, RunConfig,
};

mod error;
pub use error::ConfigError;

mod outcome;
pub use outcome::RunOutcome;

mod report;
pub use report::{CrawlReport, CrawlRequest};

mod payload;
pub use payload::{TaskCommand, WorkerPayload};
