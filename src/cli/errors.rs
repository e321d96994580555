//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit.

use std::io;

use thiserror::Error;

use crate::errors::ArchiveError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Already initialized
    AlreadyInitialized,
    /// Not initialized
    NotInitialized,
    /// Engine failed to open
    BootFailed,
    /// A FATAL engine error stopped event processing
    EngineHalted,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ARC_CLI_CONFIG_ERROR",
            Self::IoError => "ARC_CLI_IO_ERROR",
            Self::AlreadyInitialized => "ARC_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "ARC_CLI_NOT_INITIALIZED",
            Self::BootFailed => "ARC_CLI_BOOT_FAILED",
            Self::EngineHalted => "ARC_CLI_ENGINE_HALTED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Data directory already initialized",
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Data directory not initialized. Run 'arczone init' first.",
        )
    }

    pub fn boot_failed(err: &ArchiveError) -> Self {
        Self::new(
            CliErrorCode::BootFailed,
            format!("{}: {}", err.code(), err),
        )
    }

    pub fn engine_halted(err: &ArchiveError) -> Self {
        Self::new(
            CliErrorCode::EngineHalted,
            format!("{}: {}", err.code(), err),
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// Read-path and config errors from the engine outside of event processing.
impl From<ArchiveError> for CliError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Config(msg) => Self::config_error(msg),
            other => Self::new(
                CliErrorCode::IoError,
                format!("{}: {}", other.code(), other),
            ),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
