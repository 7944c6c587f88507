//! Job coordination.
//!
//! - `coordinator`: fan-out over the pool, admission modes, retries
//! - `shard`: contiguous partitioning of the task list
//! - `report`: per-task outcomes and the job's exit status

pub mod coordinator;
pub mod report;
pub mod shard;

pub use coordinator::Coordinator;
pub use report::{JobReport, TaskReport};
