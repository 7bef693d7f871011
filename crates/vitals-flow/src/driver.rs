//! Contract with the browser automation driver.
//!
//! Another black box: something that can hand out a controllable page and
//! accept navigation, input, and protocol-level commands against it. The run
//! lifecycle controller either launches a browser through a
//! [`BrowserDriver`] or instruments a caller-supplied [`PageHandle`]
//! directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A live, controllable page.
///
/// The handle exposed to callers during the interaction window is the same
/// handle the pipeline instruments, so input driven through it lands on the
/// instrumented page.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate the page to a URL and wait for load quiescence.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Click the first element matching a selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Type text into the element matching a selector, with an optional
    /// per-keystroke delay.
    async fn type_text(&self, selector: &str, text: &str, key_delay: Option<Duration>)
        -> Result<()>;

    /// Wait until an element matching the selector exists.
    async fn wait_for_selector(&self, selector: &str) -> Result<()>;

    /// Issue a protocol-level command against the page's debugging session.
    async fn send_command(&self, method: &str, params: serde_json::Value)
        -> Result<serde_json::Value>;
}

/// A running browser that can open pages.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a fresh page.
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>>;

    /// Tear the browser down.
    async fn close(&self) -> Result<()>;
}

/// Launches browser sessions on demand.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch a browser. Sessions launched here are owned by the runner and
    /// closed when the run ends; caller-supplied pages are left alone.
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>>;
}
