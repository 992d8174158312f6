use std::sync::OnceLock;

use serde_json::Value;

use crate::error::RigError;

/// Receives every log record as a JSON payload (`level`, `message`, `timestamp`).
pub type LogSink = Box<dyn Fn(&Value) + Send + Sync>;

// Installed once by the embedding front end.
static LOG_SINK: OnceLock<LogSink> = OnceLock::new();

/// ログレベル定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Initialize the logging system with a sink.
///
/// Returns `false` when a sink was already installed; the first one wins.
pub fn init_logging(sink: LogSink) -> bool {
    if LOG_SINK.set(sink).is_err() {
        eprintln!("Warning: Logging system already initialized");
        return false;
    }
    true
}

/// Build the JSON payload handed to the sink.
pub fn log_record(level: LogLevel, message: &str) -> Value {
    serde_json::json!({
        "level": level.as_str(),
        "message": message,
        "timestamp": jiff::Zoned::now().to_string()
    })
}

/// Send a log message to the installed sink.
pub fn send_log(level: LogLevel, message: &str) {
    if let Some(sink) = LOG_SINK.get() {
        sink(&log_record(level, message));
    } else {
        // Fallback to console if logging not initialized
        eprintln!("[{}] {}", level.as_str().to_uppercase(), message);
    }
}

/// Log a RigError with automatic error-level logging
pub fn log_rig_error(error: &RigError, context: Option<&str>) {
    let message = match context {
        Some(ctx) => format!("{}: {}", ctx, error),
        None => error.to_string(),
    };

    send_log(LogLevel::Error, &message);
}

/// Convenience macros for logging
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}

/// Result extension for convenient error logging
pub trait ResultExt<T, E> {
    fn log_error(self, context: Option<&str>) -> Self;
}

impl<T> ResultExt<T, RigError> for Result<T, RigError> {
    fn log_error(self, context: Option<&str>) -> Self {
        if let Err(ref error) = self {
            log_rig_error(error, context);
        }
        self
    }
}
