//! Error types for the smoke test
//!
//! Step failures carry the step description so the driver can report
//! exactly which step ended the run.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the smoke test
#[derive(Error, Debug)]
pub enum Error {
    // === Invocation Errors ===
    #[error("Expecting: node {{smoke_test.js}} {{url}}")]
    Usage,

    // === Browser Errors ===
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("{0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("Timed out after {}ms waiting for {what}", .waited.as_millis())]
    Timeout { what: String, waited: Duration },

    // === Configuration Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Step Outcomes ===
    #[error("Step '{description}' failed its assertion after {}ms", .elapsed.as_millis())]
    StepFailed { description: String, elapsed: Duration },

    #[error("Step '{description}' errored after {}ms: {message}", .elapsed.as_millis())]
    StepErrored {
        description: String,
        message: String,
        elapsed: Duration,
    },
}

impl Error {
    /// Create a timeout error for a wait on `what`
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited,
        }
    }

    /// Whether this error ended the run from inside a step
    pub fn is_step_outcome(&self) -> bool {
        matches!(self, Self::StepFailed { .. } | Self::StepErrored { .. })
    }
}
