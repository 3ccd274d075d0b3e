//! OS termination signals.
//!
//! **Unix:** `SIGINT` (operator interrupt), `SIGTERM` (orchestrator stop),
//! `SIGQUIT`. **Other platforms:** Ctrl-C only.
//!
//! Unlike a one-shot "wait for the first signal" helper, the listener keeps
//! its streams so repeated deliveries are observed too.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    Quit,
}

impl ShutdownSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(unix)]
pub struct SignalListener {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    /// Registers the signal streams. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Next delivered signal, or `None` once the runtime tears the streams down.
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::select! {
            s = self.sigint.recv()  => s.map(|_| ShutdownSignal::Interrupt),
            s = self.sigterm.recv() => s.map(|_| ShutdownSignal::Terminate),
            s = self.sigquit.recv() => s.map(|_| ShutdownSignal::Quit),
        }
    }
}

#[cfg(not(unix))]
pub struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|_| ShutdownSignal::Interrupt)
    }
}
