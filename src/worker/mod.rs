//! Worker system: pooled pages and the per-task lifecycle.
//!
//! Core components:
//! - `pool`: fixed set of workers, exclusive acquisition, scoped release
//! - `state`: Task stage machine (Assigned → Loading → … → outcome → Released)
//! - `driver`: runs one task's stages on one worker with stage timeouts
//! - `diagnostics`: console message normalisation and job-wide dedup

pub mod diagnostics;
pub mod driver;
pub mod pool;
pub mod state;

pub use driver::{Driver, Outcome};
pub use pool::{WorkerGuard, WorkerPool};
pub use state::{Task, TaskStage};
