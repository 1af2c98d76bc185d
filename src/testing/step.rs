//! Step descriptors
//!
//! A scenario is an ordered list of [`Step`]s. Each one names an [`Action`]
//! to perform against the session and, optionally, an [`Expectation`] its
//! result must meet.

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::browser::Session;
use crate::common::Result;

/// A named unit of work in a scenario
#[derive(Debug, Clone)]
pub struct Step {
    /// Text printed in the PASSED/FAILED line
    pub description: String,
    /// What to do against the session
    pub action: Action,
    /// Optional check on the action's result
    pub expectation: Option<Expectation>,
}

impl Step {
    /// A step that passes whenever its action resolves
    pub fn exec(description: impl Into<String>, action: Action) -> Self {
        Self {
            description: description.into(),
            action,
            expectation: None,
        }
    }

    /// A step that passes only if its action's result meets `expectation`
    pub fn assert(description: impl Into<String>, action: Action, expectation: Expectation) -> Self {
        Self {
            description: description.into(),
            action,
            expectation: Some(expectation),
        }
    }
}

/// An operation against the browser session
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Navigate to an absolute URL
    Goto { url: String },
    /// Wait for an element to be displayed
    WaitVisible { selector: String },
    /// Wait for an element to be attached, displayed or not
    WaitPresent { selector: String },
    /// Click the first matching element
    Click { selector: String },
    /// Type into the first matching element
    Type { selector: String, text: String },
    /// Wait for a JavaScript expression to become truthy
    WaitFunction { expression: String },
    /// Run a script and resolve with its result
    Evaluate { script: String },
    /// Run actions in order, resolving with the last one's result
    Sequence(Vec<Action>),
}

impl Action {
    pub fn goto(url: impl Into<String>) -> Self {
        Self::Goto { url: url.into() }
    }

    pub fn wait_visible(selector: impl Into<String>) -> Self {
        Self::WaitVisible {
            selector: selector.into(),
        }
    }

    pub fn wait_present(selector: impl Into<String>) -> Self {
        Self::WaitPresent {
            selector: selector.into(),
        }
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Self::Click {
            selector: selector.into(),
        }
    }

    pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Type {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn wait_function(expression: impl Into<String>) -> Self {
        Self::WaitFunction {
            expression: expression.into(),
        }
    }

    pub fn evaluate(script: impl Into<String>) -> Self {
        Self::Evaluate {
            script: script.into(),
        }
    }

    /// Perform the action against `session`
    ///
    /// Navigation and interaction resolve with `Value::Null`.
    pub fn perform<'a, S>(&'a self, session: &'a mut S) -> BoxFuture<'a, Result<Value>>
    where
        S: Session + ?Sized,
    {
        async move {
            match self {
                Action::Goto { url } => session.goto(url).await.map(|_| Value::Null),
                Action::WaitVisible { selector } => {
                    session.wait_for_visible(selector).await.map(|_| Value::Null)
                }
                Action::WaitPresent { selector } => {
                    session.wait_for_selector(selector).await.map(|_| Value::Null)
                }
                Action::Click { selector } => session.click(selector).await.map(|_| Value::Null),
                Action::Type { selector, text } => {
                    session.type_text(selector, text).await.map(|_| Value::Null)
                }
                Action::WaitFunction { expression } => {
                    session.wait_for_function(expression).await.map(|_| Value::Null)
                }
                Action::Evaluate { script } => session.evaluate(script).await,
                Action::Sequence(actions) => {
                    let mut last = Value::Null;
                    for action in actions {
                        last = action.perform(&mut *session).await?;
                    }
                    Ok(last)
                }
            }
        }
        .boxed()
    }
}

/// A check applied to an action's result
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// The result is a string containing this text
    Contains(String),
    /// The result equals this value
    Equals(Value),
}

impl Expectation {
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Expectation::Contains(needle) => value
                .as_str()
                .map(|text| text.contains(needle.as_str()))
                .unwrap_or(false),
            Expectation::Equals(expected) => value == expected,
        }
    }
}
