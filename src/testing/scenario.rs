//! The Discourse smoke scenario
//!
//! Selectors and texts below are tied to Discourse's markup. Anonymous
//! browsing always runs; the authenticated part (login, new topic, reply)
//! is appended only outside read-only mode.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use crate::common::config::{Credentials, Environment};
use crate::common::join_url;

use super::step::{Action, Expectation, Step};

/// Text every reply starts with; the preview assertion looks for it
const REPLY_MARKER: &str = "I can even write a reply";

/// Number of posts expected once the reply lands (topic + reply)
const POSTS_AFTER_REPLY: u64 = 2;

/// Build the full ordered step list for a run
pub fn steps(base_url: &str, env: &Environment) -> Vec<Step> {
    let mut steps = anonymous_steps(base_url);
    if env.readonly {
        tracing::info!("READONLY_TESTS set, skipping login, topic and reply steps");
    } else {
        steps.extend(authenticated_steps(&env.credentials, epoch_millis()));
    }
    steps
}

/// Steps any visitor can perform
pub fn anonymous_steps(base_url: &str) -> Vec<Step> {
    vec![
        Step::exec("go to site", Action::goto(base_url)),
        Step::exec(
            "expect a log in button in the header",
            Action::wait_visible("header .login-button"),
        ),
        Step::exec("go to latest page", Action::goto(join_url(base_url, "latest"))),
        Step::exec(
            "at least one topic shows up",
            Action::wait_visible(".topic-list tbody tr"),
        ),
        Step::exec(
            "go to categories page",
            Action::goto(join_url(base_url, "categories")),
        ),
        Step::exec(
            "can see categories on the page",
            Action::wait_visible(".category-list"),
        ),
        Step::exec(
            "navigate to 1st topic",
            Action::click(".main-link a.title:first-of-type"),
        ),
        Step::exec("at least one post body", Action::wait_visible(".topic-post")),
        Step::exec(
            "click on the 1st user",
            Action::click(".topic-meta-data a:first-of-type"),
        ),
        Step::exec("user has details", Action::wait_visible("#user-card .names")),
    ]
}

/// Steps that log in and create content
///
/// `stamp` makes the new topic and reply unique across runs.
pub fn authenticated_steps(credentials: &Credentials, stamp: u128) -> Vec<Step> {
    let stamp = format!("({})", stamp);

    vec![
        Step::exec("open login modal", Action::click(".login-button")),
        Step::exec("login modal is open", Action::wait_visible(".login-modal")),
        Step::exec(
            "type in credentials & log in",
            Action::Sequence(vec![
                Action::type_text("#login-account-name", credentials.username.as_str()),
                Action::type_text("#login-account-password", credentials.password.as_str()),
                Action::click(".login-modal .btn-primary"),
            ]),
        ),
        Step::exec("is logged in", Action::wait_visible(".current-user")),
        Step::exec("go home", Action::click("#site-logo, #site-text-logo")),
        Step::exec("it shows a topic list", Action::wait_visible(".topic-list")),
        Step::exec(
            "we have a create topic button",
            Action::wait_visible("#create-topic"),
        ),
        Step::exec("open composer", Action::click("#create-topic")),
        Step::exec(
            "the editor is visible",
            Action::wait_function("document.activeElement === document.getElementById('reply-title')"),
        ),
        Step::exec(
            "compose new topic",
            Action::Sequence(vec![
                Action::type_text("#reply-title", format!("This is a new topic {}", stamp)),
                Action::type_text(
                    "#reply-control .d-editor-input",
                    format!("I can write a new topic inside the smoke test! {} \n\n", stamp),
                ),
            ]),
        ),
        Step::exec("updates preview", Action::wait_visible(".d-editor-preview p")),
        Step::exec(
            "open upload modal",
            Action::click(".d-editor-button-bar .upload"),
        ),
        Step::exec(
            "upload modal is open",
            Action::Sequence(vec![
                Action::wait_visible("#filename-input"),
                Action::click(".d-modal-cancel"),
            ]),
        ),
        Step::exec("submit the topic", Action::click(".submit-panel .create")),
        Step::exec("topic is created", Action::wait_visible(".fancy-title")),
        Step::exec(
            "open the composer",
            Action::click(".post-controls:first-of-type .create"),
        ),
        Step::exec(
            "composer is open",
            Action::wait_visible("#reply-control .d-editor-input"),
        ),
        Step::exec(
            "compose reply",
            Action::type_text(
                "#reply-control .d-editor-input",
                format!("{} inside the smoke test ;) {}", REPLY_MARKER, stamp),
            ),
        ),
        Step::assert(
            "waiting for the preview",
            Action::Sequence(vec![
                Action::wait_visible(".d-editor-preview p"),
                Action::evaluate("document.querySelector('.d-editor-preview').innerText"),
            ]),
            Expectation::Contains(REPLY_MARKER.to_string()),
        ),
        Step::exec("submit the topic", Action::click("#reply-control .create")),
        Step::assert(
            "reply is created",
            Action::Sequence(vec![
                Action::wait_present(".topic-post"),
                Action::evaluate("document.querySelectorAll('.topic-post').length"),
            ]),
            Expectation::Equals(json!(POSTS_AFTER_REPLY)),
        ),
    ]
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
