//! Logging setup for the supervisor and its workers.
mod logger;
pub use logger::*;
