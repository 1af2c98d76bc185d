//! Sequential step runner
//!
//! Runs one step at a time against a shared session, prints a timed
//! PASSED/FAILED/ERROR line per step and stops at the first step that does
//! not pass. Deciding what to do about the failure (exit status, banner) is
//! left to the caller.

use std::fmt;
use std::future::Future;
use std::io::{self, IsTerminal, Write};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use colored::Colorize;
use serde_json::Value;

use crate::browser::Session;
use crate::common::{Error, Result};

use super::step::Step;

/// Printed right after the line of the step that ended the run
pub const FAILURE_BANNER: &str = "SMOKE TEST FAILED";

/// Printed once every step has passed
pub const SUCCESS_BANNER: &str = "ALL PASSED";

/// How a single step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The action resolved and its assertion, if any, held
    Passed,
    /// The action resolved but its assertion did not hold
    Failed,
    /// The action itself failed
    Errored(String),
}

/// Result of running a single step
#[derive(Debug, Clone)]
pub struct StepReport {
    pub description: String,
    pub outcome: StepOutcome,
    /// Wall-clock time between dispatching the action and its settlement
    pub elapsed: Duration,
}

impl StepReport {
    pub fn passed(&self) -> bool {
        self.outcome == StepOutcome::Passed
    }

    /// Turn a non-passing report into the error that ends the run
    pub fn into_result(self) -> Result<Duration> {
        match self.outcome {
            StepOutcome::Passed => Ok(self.elapsed),
            StepOutcome::Failed => Err(Error::StepFailed {
                description: self.description,
                elapsed: self.elapsed,
            }),
            StepOutcome::Errored(message) => Err(Error::StepErrored {
                description: self.description,
                message,
                elapsed: self.elapsed,
            }),
        }
    }

    /// The console line for this report
    pub fn render(&self, color: bool) -> String {
        let ms = self.elapsed.as_millis();
        let paint = |label: &str, passed: bool| {
            if !color {
                label.to_string()
            } else if passed {
                label.green().bold().to_string()
            } else {
                label.red().bold().to_string()
            }
        };

        match &self.outcome {
            StepOutcome::Passed => {
                format!("{}: {} - {}ms", paint("PASSED", true), self.description, ms)
            }
            StepOutcome::Failed => {
                format!("{}: {} - {}ms", paint("FAILED", false), self.description, ms)
            }
            StepOutcome::Errored(message) => format!(
                "{} ({}): {} - {}ms",
                paint("ERROR", false),
                self.description,
                message,
                ms
            ),
        }
    }
}

/// Summary of a run in which every step passed
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps_run: usize,
    pub elapsed: Duration,
}

/// Executes steps strictly in order and reports each one
pub struct StepRunner<W = io::Stdout> {
    out: W,
    color: bool,
}

impl StepRunner<io::Stdout> {
    /// Runner printing to stdout, colored when stdout is a terminal
    pub fn stdout() -> Self {
        let color = io::stdout().is_terminal();
        Self {
            out: io::stdout(),
            color,
        }
    }
}

impl<W: Write> StepRunner<W> {
    /// Runner printing plain lines to `out`
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a line that is not tied to a step (banners, page logs)
    pub fn say(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write runner output");
        }
    }

    /// Run `action` and pass if it resolves, whatever it resolves with
    pub async fn exec<T, E, Fut>(&mut self, description: &str, action: Fut) -> StepReport
    where
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let report = self.settle(description, action, None).await;
        self.print_report(&report);
        report
    }

    /// Run `action` and pass only if `assertion` holds for its result
    pub async fn assert<T, E, Fut, P>(
        &mut self,
        description: &str,
        action: Fut,
        assertion: P,
    ) -> StepReport
    where
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
        P: Fn(&T) -> bool + Sync,
    {
        let assertion: &(dyn Fn(&T) -> bool + Sync) = &assertion;
        let report = self.settle(description, action, Some(assertion)).await;
        self.print_report(&report);
        report
    }

    /// Run every step in order against `session`
    ///
    /// Returns at the first step that fails or errors; later steps never
    /// start. Page console output logged during a step is relayed just
    /// before that step's line.
    pub async fn run<S>(&mut self, session: &mut S, steps: &[Step]) -> Result<RunSummary>
    where
        S: Session + ?Sized,
    {
        let start = Instant::now();

        for (i, step) in steps.iter().enumerate() {
            tracing::debug!(step = i + 1, total = steps.len(), description = %step.description, "Running step");

            let check = |value: &Value| step.expectation.as_ref().is_some_and(|e| e.check(value));
            let assertion = step
                .expectation
                .as_ref()
                .map(|_| &check as &(dyn Fn(&Value) -> bool + Sync));

            let report = self
                .settle(&step.description, step.action.perform(&mut *session), assertion)
                .await;

            // Page output from the step comes before its verdict and any banner
            self.relay_console(session).await;
            self.print_report(&report);
            report.into_result()?;
        }

        Ok(RunSummary {
            steps_run: steps.len(),
            elapsed: start.elapsed(),
        })
    }

    async fn settle<T, E, Fut>(
        &mut self,
        description: &str,
        action: Fut,
        assertion: Option<&(dyn Fn(&T) -> bool + Sync)>,
    ) -> StepReport
    where
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let start = Instant::now();

        let outcome = match action.await {
            Ok(value) => match assertion {
                None => StepOutcome::Passed,
                // A panicking assertion counts as not holding
                Some(assertion) => {
                    match panic::catch_unwind(AssertUnwindSafe(|| assertion(&value))) {
                        Ok(true) => StepOutcome::Passed,
                        _ => StepOutcome::Failed,
                    }
                }
            },
            Err(e) => StepOutcome::Errored(e.to_string()),
        };

        StepReport {
            description: description.to_string(),
            outcome,
            elapsed: start.elapsed(),
        }
    }

    fn print_report(&mut self, report: &StepReport) {
        let line = report.render(self.color);
        self.say(&line);
    }

    async fn relay_console<S>(&mut self, session: &mut S)
    where
        S: Session + ?Sized,
    {
        match session.drain_console().await {
            Ok(messages) => {
                for message in messages {
                    self.say(&format!("PAGE LOG: {}", message));
                }
            }
            Err(e) => tracing::debug!(error = %e, "Could not read page console"),
        }
    }
}
