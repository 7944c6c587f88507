//! Error types for pagerun.

use std::time::Duration;

/// Top-level error type for a job run.
///
/// Everything here is fatal for the job: task-scoped failures are
/// [`TaskError`]s and never abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Asset server error: {0}")]
    Server(#[from] ServerError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Task source error: {0}")]
    Source(#[from] SourceError),

    #[error("Task {task} hit a fatal infrastructure failure: {reason}")]
    Fatal { task: String, reason: String },

    #[error("Job interrupted by shutdown signal")]
    Interrupted,
}

/// Process exit code used for every fatal abort.
pub const FATAL_EXIT_CODE: i32 = 2;

impl Error {
    /// Exit code a front end should report for this error.
    pub fn exit_code(&self) -> i32 {
        FATAL_EXIT_CODE
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures reported by the execution engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to launch engine: {0}")]
    LaunchFailed(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    /// The context (or the whole engine) is gone and cannot be reused.
    #[error("Execution context disconnected: {0}")]
    Disconnected(String),

    #[error("Failed to close engine: {0}")]
    CloseFailed(String),
}

impl EngineError {
    /// Whether this error makes the context unusable for further tasks.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Disconnected(_) | Self::LaunchFailed(_) | Self::CloseFailed(_)
        )
    }
}

/// Asset server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind asset server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Asset server task failed: {0}")]
    Serve(String),
}

/// Worker pool errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    #[error("Worker pool is closed")]
    Closed,

    #[error("Worker pool cannot be empty")]
    Empty,
}

/// Task enumeration errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read content directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid shard {index} of {count}")]
    InvalidShard { index: usize, count: usize },
}

/// What went wrong during the render stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCause {
    /// The completion signal did not arrive within the render timeout.
    Timeout(Duration),
    /// Network activity did not settle within the load timeout.
    Quiescence(String),
    /// The content reported an error while it was assigned.
    Diagnostic(String),
    /// Driving the signal protocol itself failed.
    Protocol(String),
}

impl std::fmt::Display for RenderCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(after) => write!(f, "render timeout exceeded after {after:?}"),
            Self::Quiescence(reason) => write!(f, "network did not settle: {reason}"),
            Self::Diagnostic(message) => write!(f, "{message}"),
            Self::Protocol(reason) => write!(f, "signal protocol failed: {reason}"),
        }
    }
}

/// Task-scoped failures. These are recorded and the batch continues.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("Error happened while loading task {task}: {reason}")]
    Load { task: String, reason: String },

    #[error("Error happened while rendering task {task}: {cause}")]
    Render { task: String, cause: RenderCause },
}

impl TaskError {
    /// Short stable label for reports and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load_failure",
            Self::Render {
                cause: RenderCause::Timeout(_),
                ..
            } => "render_timeout",
            Self::Render { .. } => "render_failure",
        }
    }

    pub fn task(&self) -> &str {
        match self {
            Self::Load { task, .. } | Self::Render { task, .. } => task,
        }
    }

    /// Whether this is a render timeout (the only failure a policy may tolerate).
    pub fn is_render_timeout(&self) -> bool {
        matches!(
            self,
            Self::Render {
                cause: RenderCause::Timeout(_),
                ..
            }
        )
    }
}

/// Result type alias for pagerun.
pub type Result<T> = std::result::Result<T, Error>;
