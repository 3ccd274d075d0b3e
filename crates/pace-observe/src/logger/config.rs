use std::io::IsTerminal;

use crate::logger::format::LoggerFormat;

/// Logger settings.
///
/// `level` accepts anything an `EnvFilter` directive accepts
/// (`"info"`, `"pace_core=debug,warn"`, ...).
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl LoggerConfig {
    pub fn new(format: LoggerFormat, level: impl Into<String>) -> Self {
        Self {
            format,
            level: level.into(),
            ..Default::default()
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        // Log lines go to stderr; stdout is reserved for run output.
        let use_color = std::io::stderr().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}
