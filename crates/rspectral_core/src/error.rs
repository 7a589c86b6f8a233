//! Lint error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::evaluate::EvaluateError;

/// Error returned by a before- or after-module hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while linting.
#[derive(Debug, Error)]
pub enum LintError {
    /// An option or configuration file was rejected.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host current directory could not be determined.
    #[error("Failed to determine working directory: {0}")]
    WorkingDirectory(#[source] io::Error),

    #[error("failed to run BeforeModule hook for '{module}': {source}")]
    BeforeModule {
        module: String,
        #[source]
        source: HookError,
    },

    #[error("failed to run AfterModule hook for '{module}': {source}")]
    AfterModule {
        module: String,
        #[source]
        source: HookError,
    },

    /// The engine could not be created or failed outside guest code.
    #[error("Engine error: {0}")]
    Engine(String),

    /// A guest exception while loading modules, the bundle or the driver
    /// script.
    #[error(transparent)]
    Evaluate(#[from] EvaluateError),

    /// The driver script's promise was rejected.
    #[error("{0}: promise rejected")]
    PromiseRejected(String),

    /// The driver script settled with something other than a string.
    #[error("invalid value type of lint result '{0}': unknown return")]
    UnknownReturn(String),

    /// The driver script's result is not valid lint output.
    #[error("Failed to decode lint output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Lint timed out after {0:?}")]
    Timeout(Duration),

    #[error("Lint was cancelled")]
    Cancelled,

    /// The driver script's promise can never settle.
    #[error("Lint result is pending with no jobs left to run")]
    Stalled,
}

impl LintError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}
