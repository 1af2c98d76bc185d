//! End-to-end tests for the smoke test harness
//!
//! These tests verify the runner and driver by:
//! 1. Running step lists against an in-memory stub session
//! 2. Checking fail-fast ordering and the console contract
//! 3. Invoking the compiled binary for the usage and launch-failure paths

use std::collections::{HashMap, HashSet};
use std::process::Command;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use smoke::cli::drive;
use smoke::common::config::{Credentials, Environment};
use smoke::testing::scenario;
use smoke::{Action, Error, Expectation, Result, Session, Step, StepRunner};

/// Session that records every call and answers from canned data
#[derive(Default)]
struct StubSession {
    /// Calls in the order they were made, e.g. `click:.login-button`
    calls: Vec<String>,
    /// Selectors that never show up
    missing: HashSet<String>,
    /// Results for `evaluate`, keyed by a substring of the script
    evaluations: HashMap<String, Value>,
    /// Console messages logged since the last drain
    console: Vec<String>,
    /// Messages the page logs while loading, keyed by a substring of the URL
    load_logs: HashMap<String, Vec<String>>,
    closed: bool,
}

impl StubSession {
    fn new() -> Self {
        Self::default()
    }

    fn missing(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }

    fn evaluates(mut self, script_fragment: &str, value: Value) -> Self {
        self.evaluations.insert(script_fragment.to_string(), value);
        self
    }

    fn logs(mut self, messages: &[&str]) -> Self {
        self.console.extend(messages.iter().map(|s| s.to_string()));
        self
    }

    fn logs_while_loading(mut self, url_fragment: &str, messages: &[&str]) -> Self {
        self.load_logs.insert(
            url_fragment.to_string(),
            messages.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    fn check(&mut self, call: String, selector: &str) -> Result<()> {
        self.calls.push(call);
        if self.missing.contains(selector) {
            return Err(Error::timeout(
                format!("`{}` to become visible", selector),
                Duration::from_millis(10),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Session for StubSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.calls.push(format!("goto:{}", url));
        for (fragment, messages) in &self.load_logs {
            if url.contains(fragment.as_str()) {
                self.console.extend(messages.iter().cloned());
            }
        }
        Ok(())
    }

    async fn wait_for_visible(&mut self, selector: &str) -> Result<()> {
        self.check(format!("visible:{}", selector), selector)
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<()> {
        self.check(format!("present:{}", selector), selector)
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.check(format!("click:{}", selector), selector)
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        self.check(format!("type:{}={}", selector, text), selector)
    }

    async fn wait_for_function(&mut self, expression: &str) -> Result<()> {
        self.calls.push(format!("function:{}", expression));
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        self.calls.push(format!("evaluate:{}", script));
        Ok(self
            .evaluations
            .iter()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null))
    }

    async fn drain_console(&mut self) -> Result<Vec<String>> {
        Ok(std::mem::take(&mut self.console))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

fn runner() -> StepRunner<Vec<u8>> {
    StepRunner::new(Vec::new())
}

fn output(runner: StepRunner<Vec<u8>>) -> Vec<String> {
    String::from_utf8(runner.into_inner())
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

/// Stub that answers the Discourse scenario happily
fn healthy_forum() -> StubSession {
    StubSession::new()
        .evaluates(
            "innerText",
            json!("I can even write a reply inside the smoke test ;) (1)"),
        )
        .evaluates("querySelectorAll('.topic-post').length", json!(2))
}

fn environment(readonly: bool) -> Environment {
    Environment {
        readonly,
        credentials: Credentials {
            username: "smoke_user".to_string(),
            password: "P4ssw0rd".to_string(),
        },
    }
}

// ============== Harness ==============

#[tokio::test]
async fn test_steps_run_in_declaration_order() {
    let steps = vec![
        Step::exec("first", Action::goto("http://forum/")),
        Step::exec("second", Action::wait_visible(".a")),
        Step::exec("third", Action::click(".b")),
    ];
    let mut session = StubSession::new();
    let mut r = runner();

    let summary = r.run(&mut session, &steps).await.unwrap();

    assert_eq!(summary.steps_run, 3);
    assert_eq!(
        session.calls,
        vec!["goto:http://forum/", "visible:.a", "click:.b"]
    );
    let lines = output(r);
    assert!(lines[0].starts_with("PASSED: first - "));
    assert!(lines[1].starts_with("PASSED: second - "));
    assert!(lines[2].starts_with("PASSED: third - "));
}

#[tokio::test]
async fn test_error_stops_the_run() {
    let steps = vec![
        Step::exec("ok", Action::wait_visible(".a")),
        Step::exec("broken", Action::wait_visible(".missing")),
        Step::exec("never", Action::click(".c")),
    ];
    let mut session = StubSession::new().missing(".missing");
    let mut r = runner();

    let err = r.run(&mut session, &steps).await.unwrap_err();

    match err {
        Error::StepErrored { description, message, .. } => {
            assert_eq!(description, "broken");
            assert!(message.contains(".missing"));
        }
        other => panic!("Expected StepErrored, got {:?}", other),
    }
    assert!(!session.calls.iter().any(|c| c == "click:.c"));

    let lines = output(r);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("ERROR (broken): Timed out after 10ms waiting for `.missing`"));
}

#[tokio::test]
async fn test_failed_assertion_stops_the_run() {
    let steps = vec![
        Step::assert(
            "count",
            Action::evaluate("count"),
            Expectation::Equals(json!(2)),
        ),
        Step::exec("never", Action::click(".c")),
    ];
    let mut session = StubSession::new().evaluates("count", json!(1));
    let mut r = runner();

    let err = r.run(&mut session, &steps).await.unwrap_err();

    assert!(matches!(err, Error::StepFailed { .. }));
    assert_eq!(session.calls, vec!["evaluate:count"]);
    let lines = output(r);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("FAILED: count - "));
}

#[tokio::test]
async fn test_sequence_stops_at_first_error() {
    let steps = vec![Step::exec(
        "login",
        Action::Sequence(vec![
            Action::type_text("#name", "u"),
            Action::type_text("#password", "p"),
            Action::click(".go"),
        ]),
    )];
    let mut session = StubSession::new().missing("#password");
    let mut r = runner();

    assert!(r.run(&mut session, &steps).await.is_err());
    assert_eq!(session.calls, vec!["type:#name=u", "type:#password=p"]);
}

#[tokio::test]
async fn test_page_console_is_relayed() {
    let steps = vec![Step::exec("go to site", Action::goto("http://forum/"))];
    let mut session = StubSession::new().logs(&["Ember booted", "service worker registered"]);
    let mut r = runner();

    r.run(&mut session, &steps).await.unwrap();

    let lines = output(r);
    assert_eq!(lines[0], "PAGE LOG: Ember booted");
    assert_eq!(lines[1], "PAGE LOG: service worker registered");
    assert!(lines[2].starts_with("PASSED: go to site - "));
}

#[tokio::test]
async fn test_logs_from_each_navigation_are_relayed() {
    let steps = vec![
        Step::exec("go to latest page", Action::goto("http://forum/latest")),
        Step::exec("go to categories page", Action::goto("http://forum/categories")),
    ];
    let mut session = StubSession::new()
        .logs_while_loading("/latest", &["latest loaded"])
        .logs_while_loading("/categories", &["categories loaded"]);
    let mut r = runner();

    r.run(&mut session, &steps).await.unwrap();

    let lines = output(r);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "PAGE LOG: latest loaded");
    assert!(lines[1].starts_with("PASSED: go to latest page - "));
    assert_eq!(lines[2], "PAGE LOG: categories loaded");
    assert!(lines[3].starts_with("PASSED: go to categories page - "));
}

#[tokio::test]
async fn test_failure_banner_follows_the_failing_line() {
    let steps = vec![Step::exec("broken", Action::wait_visible(".missing"))];
    let mut session = StubSession::new()
        .missing(".missing")
        .logs(&["Uncaught TypeError: undefined is not a function"]);
    let mut r = runner();

    assert!(drive(&mut r, &mut session, &steps).await.is_err());

    let lines = output(r);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "PAGE LOG: Uncaught TypeError: undefined is not a function");
    assert!(lines[1].starts_with("ERROR (broken): "));
    assert_eq!(lines[2], "SMOKE TEST FAILED");
}

// ============== Driver ==============

#[tokio::test]
async fn test_readonly_scenario_passes() {
    let steps = scenario::steps("http://forum.local", &environment(true));
    let mut session = healthy_forum();
    let mut r = runner();

    drive(&mut r, &mut session, &steps).await.unwrap();

    assert!(session.closed);
    assert!(!session.calls.iter().any(|c| c.starts_with("type:")));
    let lines = output(r);
    assert_eq!(lines.len(), 11);
    assert!(lines[0].starts_with("PASSED: go to site - "));
    assert!(lines[1].starts_with("PASSED: expect a log in button in the header - "));
    assert_eq!(lines.last().map(String::as_str), Some("ALL PASSED"));
}

#[tokio::test]
async fn test_full_scenario_passes() {
    let steps = scenario::steps("http://forum.local", &environment(false));
    let mut session = healthy_forum();
    let mut r = runner();

    let summary = drive(&mut r, &mut session, &steps).await.unwrap();

    assert_eq!(summary.steps_run, 31);
    assert!(session
        .calls
        .contains(&"type:#login-account-name=smoke_user".to_string()));
    let lines = output(r);
    assert!(lines[lines.len() - 2].starts_with("PASSED: reply is created - "));
    assert_eq!(lines.last().map(String::as_str), Some("ALL PASSED"));
}

#[tokio::test]
async fn test_missing_login_button_fails_the_run() {
    let steps = scenario::steps("http://forum.local", &environment(true));
    let mut session = healthy_forum().missing("header .login-button");
    let mut r = runner();

    let err = drive(&mut r, &mut session, &steps).await.unwrap_err();

    assert!(err.is_step_outcome());
    assert!(session.closed);
    let lines = output(r);
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("ERROR (expect a log in button in the header): "));
    assert_eq!(lines[2], "SMOKE TEST FAILED");
}

#[tokio::test]
async fn test_single_reply_fails_the_reply_assertion() {
    let steps = scenario::steps("http://forum.local", &environment(false));
    let mut session = healthy_forum().evaluates("querySelectorAll('.topic-post').length", json!(1));
    let mut r = runner();

    let err = drive(&mut r, &mut session, &steps).await.unwrap_err();

    match err {
        Error::StepFailed { description, .. } => assert_eq!(description, "reply is created"),
        other => panic!("Expected StepFailed, got {:?}", other),
    }
    let lines = output(r);
    assert!(lines[lines.len() - 2].starts_with("FAILED: reply is created - "));
    assert_eq!(lines.last().map(String::as_str), Some("SMOKE TEST FAILED"));
}

// ============== Binary ==============

/// Config whose browser cannot be launched, so no run gets past launch
fn unlaunchable_config() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[browser]\nexecutable = \"/nonexistent/chrome\"\n",
    )
    .unwrap();
    dir
}

fn smoke_test_with_config(args: &[&str], config: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_smoke-test"))
        .args(args)
        .env("SMOKE_CONFIG", config)
        .env("READONLY_TESTS", "1")
        .output()
        .expect("Failed to run smoke-test")
}

fn smoke_test(args: &[&str]) -> std::process::Output {
    let dir = unlaunchable_config();
    smoke_test_with_config(args, &dir.path().join("config.toml"))
}

#[test]
fn test_no_arguments_prints_usage() {
    let out = smoke_test(&[]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        "Expecting: node {smoke_test.js} {url}"
    );
}

#[test]
fn test_three_arguments_prints_usage() {
    let out = smoke_test(&["http://forum.local", "b", "c"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Expecting: node {smoke_test.js} {url}"));
}

#[test]
fn test_unlaunchable_browser_fails_after_banner() {
    let out = smoke_test(&["http://forum.local"]);
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.first(), Some(&"Starting Discourse Smoke Test for http://forum.local"));
    assert_eq!(lines.last(), Some(&"SMOKE TEST FAILED"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to launch browser"));
}

#[test]
fn test_hyphenated_second_argument_starts_the_run() {
    for extra in ["--readonly", "-r", "--help"] {
        let out = smoke_test(&["http://forum.local", extra]);
        assert_eq!(out.status.code(), Some(1));

        let stdout = String::from_utf8_lossy(&out.stdout);
        assert_eq!(
            stdout.lines().next(),
            Some("Starting Discourse Smoke Test for http://forum.local"),
            "second argument {extra} was not accepted"
        );
    }
}

#[test]
fn test_missing_explicit_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = smoke_test_with_config(&["http://forum.local"], &dir.path().join("missing.toml"));
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().last(), Some("SMOKE TEST FAILED"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to read file"));
}
