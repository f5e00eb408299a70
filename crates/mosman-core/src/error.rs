//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Device Tool Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Device tool '{tool}' not found. Ensure it is in your PATH.")]
    ToolNotFound { tool: String },

    #[error("Failed to launch device tool: {source}")]
    Launch { source: std::io::Error },

    #[error("Command \"{subcommand}\" failed with exit code {code}")]
    CommandFailed { subcommand: String, code: i32 },

    #[error("Command \"{subcommand}\" was interrupted")]
    Interrupted { subcommand: String },

    #[error("Timed out waiting for the running command to exit")]
    PreemptTimeout,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    pub fn command_failed(subcommand: impl Into<String>, code: i32) -> Self {
        Self::CommandFailed {
            subcommand: subcommand.into(),
            code,
        }
    }

    pub fn interrupted(subcommand: impl Into<String>) -> Self {
        Self::Interrupted {
            subcommand: subcommand.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors leave the session usable; the user simply
    /// re-triggers the command.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CommandFailed { .. } | Error::Interrupted { .. } | Error::Json(_)
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ToolNotFound { .. } | Error::Launch { .. } | Error::PreemptTimeout
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::command_failed("build", 2);
        assert_eq!(err.to_string(), "Command \"build\" failed with exit code 2");

        let err = Error::tool_not_found("mos");
        assert!(err.to_string().contains("'mos' not found"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::tool_not_found("mos").is_fatal());
        assert!(Error::PreemptTimeout.is_fatal());
        assert!(!Error::command_failed("flash", 1).is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::command_failed("build", 1).is_recoverable());
        assert!(Error::interrupted("console").is_recoverable());
        assert!(!Error::tool_not_found("mos").is_recoverable());
    }

    #[test]
    fn test_interrupted_never_reads_as_success() {
        let err = Error::interrupted("console");
        assert!(err.to_string().contains("interrupted"));
    }
}
