//! Discourse smoke test - a fail-fast, sequential browser check
//!
//! This library provides the step harness, the browser session seam and
//! the Discourse scenario used by the `smoke-test` binary.

pub mod browser;
pub mod cli;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use browser::Session;
pub use common::{Error, Result};
pub use testing::{Action, Expectation, Step, StepOutcome, StepRunner};
