//! Execution engine contract.
//!
//! The scheduler never talks to a browser directly. An [`Engine`] launches a
//! fixed number of reusable [`Page`]s; each page navigates, evaluates scripts
//! and reports what it observes through an event stream:
//! - `DataTransfer`: a response finished, with its status and body size
//! - `Diagnostic`: the content logged something at warning or error level

pub mod scripts;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::LaunchOptions;
use crate::error::EngineError;

/// Severity of a console message emitted by executing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// An event observed on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    DataTransfer { status: u16, bytes: u64 },
    Diagnostic { level: DiagnosticLevel, args: Vec<String> },
}

/// When a navigation counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    Load,
    /// No network connections for a short engine-defined window.
    NetworkIdle,
}

/// A reusable execution context.
#[async_trait]
pub trait Page: Send + Sync {
    /// Install a script that runs before any content script on every navigation.
    async fn add_init_script(&self, source: &str) -> Result<(), EngineError>;

    /// Navigate to `url`. The engine may enforce `timeout` itself; the driver
    /// enforces it regardless.
    async fn navigate(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Option<Duration>,
    ) -> Result<(), EngineError>;

    /// Evaluate a script in the current document and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, EngineError>;

    /// Resolve once no request has been in flight for `idle`.
    async fn wait_for_network_idle(
        &self,
        idle: Duration,
        timeout: Option<Duration>,
    ) -> Result<(), EngineError>;

    /// Resolve once `predicate` evaluates truthy, checking every `poll`.
    ///
    /// Never times out by itself; callers race it against their own timer
    /// and drop it to cancel.
    async fn wait_for_function(&self, predicate: &str, poll: Duration)
    -> Result<(), EngineError>;

    /// Take the page's event stream. Called once, when the pool is built.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<PageEvent>;
}

/// A launched engine owning a set of pages.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open `count` pages configured with `options`.
    async fn launch(
        &self,
        options: &LaunchOptions,
        count: usize,
    ) -> Result<Vec<Arc<dyn Page>>, EngineError>;

    /// Close the engine and every page it opened.
    async fn close(&self) -> Result<(), EngineError>;
}
