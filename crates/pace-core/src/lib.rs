//! Supervision core: shared run/stop state, the scheduler loop and the
//! shutdown coordinator.
//!
//! ```text
//!  Scheduler ──► IsolatedRunner::run_isolated ──► child process
//!      ▲                   │ register / deregister
//!      │ is_running        ▼
//!      └────────── SupervisorState ◄──── ShutdownCoordinator ◄── OS signals
//! ```
//!
//! The concrete process runner lives in `pace-exec`; this crate only defines
//! the [`IsolatedRunner`] seam it plugs into.

pub mod error;
pub use error::CoreError;

pub mod handle;
pub use handle::ChildProcessHandle;

pub mod runner;
pub use runner::IsolatedRunner;

pub mod scheduler;
pub use scheduler::{Phase, Scheduler, SchedulerReport};

pub mod shutdown;
pub use shutdown::{CleanupReport, ExitGuard, ShutdownConfig, ShutdownCoordinator};

pub mod state;
pub use state::SupervisorState;
