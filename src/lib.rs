//! pagerun: drives a fixed pool of reusable browser pages through a batch
//! of content, one page per task at a time.

pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod logging;
pub mod os_signals;
pub mod runner;
pub mod server;
pub mod source;
pub mod worker;

pub use config::{AdmissionMode, LaunchOptions, RenderTimeoutPolicy, RunnerConfig};
pub use error::{Error, Result, TaskError};
pub use job::JobReport;
pub use runner::Runner;
pub use source::{TaskSelection, TaskSource};
