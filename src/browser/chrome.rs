//! Chrome session over the DevTools protocol
//!
//! Launches a local Chrome/Chromium, either the configured executable or one
//! detected on the system, and drives a single page in it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::Page;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::Session;

/// Browser page driven through the Chrome DevTools protocol
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    console: Arc<Mutex<Vec<String>>>,
    handler: JoinHandle<()>,
    listener: JoinHandle<()>,
    wait: Duration,
    poll_interval: Duration,
    closed: bool,
}

impl ChromeSession {
    /// Launch the browser and open a blank page
    pub async fn launch(config: &Config) -> Result<Self> {
        let browser_config = browser_config(config)?;
        tracing::debug!(
            headless = config.browser.headless,
            executable = ?config.browser.executable,
            "Launching browser"
        );

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        // The subscription belongs to the page target, so it outlives navigations
        let mut events = page.event_listener::<EventConsoleApiCalled>().await?;
        let console = Arc::new(Mutex::new(Vec::new()));
        let buffer = console.clone();
        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let text = console_text(
                    event
                        .args
                        .iter()
                        .map(|arg| (arg.value.as_ref(), arg.description.as_deref())),
                );
                buffer.lock().await.push(text);
            }
        });

        tracing::info!(
            width = config.browser.width,
            height = config.browser.height,
            "Browser launched"
        );

        Ok(Self {
            browser,
            page,
            console,
            handler,
            listener,
            wait: config.timeouts.wait(),
            poll_interval: config.timeouts.poll_interval(),
            closed: false,
        })
    }

    /// Evaluate `expression` until it is truthy or the wait runs out
    async fn poll(&self, expression: &str, what: impl FnOnce() -> String) -> Result<()> {
        let deadline = Instant::now() + self.wait;

        loop {
            let result = self.page.evaluate(expression).await?;
            if result.value() == Some(&Value::Bool(true)) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(what(), self.wait));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Launch settings derived from the browser config
fn browser_config(config: &Config) -> Result<BrowserConfig> {
    let browser = &config.browser;
    let mut builder = BrowserConfig::builder()
        .window_size(browser.width, browser.height)
        .args(browser.args.clone());

    if !browser.headless {
        builder = builder.with_head();
    }
    if let Some(executable) = &browser.executable {
        builder = builder.chrome_executable(executable);
    }

    builder.build().map_err(Error::BrowserLaunch)
}

/// Render console call arguments the way the page would print them
///
/// Each argument is a `(value, description)` pair from the protocol. Strings
/// print bare, other serializable values print as JSON, and everything else
/// falls back to the object description.
fn console_text<'a, I>(args: I) -> String
where
    I: IntoIterator<Item = (Option<&'a Value>, Option<&'a str>)>,
{
    args.into_iter()
        .map(|(value, description)| match value {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => description.unwrap_or("undefined").to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// JavaScript string literal for `text`
fn js_string(text: &str) -> String {
    Value::from(text).to_string()
}

fn visible_expression(selector: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll({})).some(el => {{ \
           const style = getComputedStyle(el); \
           const rect = el.getBoundingClientRect(); \
           return style.visibility !== 'hidden' && style.display !== 'none' \
             && rect.width > 0 && rect.height > 0; \
         }})",
        js_string(selector)
    )
}

fn present_expression(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}

fn truthy_expression(expression: &str) -> String {
    format!("!!({})", expression)
}

#[async_trait]
impl Session for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        tracing::debug!(url, "Navigating");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn wait_for_visible(&mut self, selector: &str) -> Result<()> {
        self.poll(&visible_expression(selector), || {
            format!("`{}` to become visible", selector)
        })
        .await
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<()> {
        self.poll(&present_expression(selector), || format!("`{}` to appear", selector))
            .await
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.page.find_element(selector).await?.click().await?;
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        self.page.find_element(selector).await?.type_str(text).await?;
        Ok(())
    }

    async fn wait_for_function(&mut self, expression: &str) -> Result<()> {
        self.poll(&truthy_expression(expression), || {
            format!("`{}` to be truthy", expression)
        })
        .await
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn drain_console(&mut self) -> Result<Vec<String>> {
        Ok(std::mem::take(&mut *self.console.lock().await))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.listener.abort();

        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        tracing::debug!("Browser closed");
        Ok(())
    }
}
