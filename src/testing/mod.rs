//! Smoke test harness
//!
//! Steps are plain data ([`Step`], [`Action`], [`Expectation`]); the
//! [`StepRunner`] executes them one by one against a browser session and
//! stops at the first one that does not pass. [`scenario`] holds the
//! Discourse-specific step list.

mod runner;
pub mod scenario;
mod step;

pub use runner::{RunSummary, StepOutcome, StepReport, StepRunner, FAILURE_BANNER, SUCCESS_BANNER};
pub use step::{Action, Expectation, Step};
