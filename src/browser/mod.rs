//! Browser automation
//!
//! The harness only ever talks to a [`Session`]: one page whose navigation
//! and interaction state is shared by every step of a run. The production
//! implementation launches Chrome and drives it over the DevTools protocol;
//! tests substitute an in-memory stub.

mod chrome;

pub use chrome::ChromeSession;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::Result;

/// A single browser page driven by the smoke test
#[async_trait]
pub trait Session: Send {
    /// Navigate to `url` and wait for the load to finish
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` is attached and displayed
    async fn wait_for_visible(&mut self, selector: &str) -> Result<()>;

    /// Wait until an element matching `selector` is attached
    async fn wait_for_selector(&mut self, selector: &str) -> Result<()>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Type `text` into the first element matching `selector`
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<()>;

    /// Wait until the JavaScript `expression` evaluates truthy in the page
    async fn wait_for_function(&mut self, expression: &str) -> Result<()>;

    /// Evaluate the JavaScript expression `script` in the page
    ///
    /// Promises are awaited. `undefined` comes back as `Value::Null`.
    async fn evaluate(&mut self, script: &str) -> Result<Value>;

    /// Console messages logged by the page since the previous call
    ///
    /// Messages logged while a navigation is in flight are included.
    async fn drain_console(&mut self) -> Result<Vec<String>>;

    /// End the session and release the browser
    async fn close(&mut self) -> Result<()>;
}
