//! Job report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::worker::state::{Task, TaskStage};

/// Outcome of one task as it appears in the report.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub name: String,
    /// Contiguous shard of the submitted list this task belongs to.
    pub shard: usize,
    pub stage: TaskStage,
    pub attempts: u32,
    pub bytes: u64,
    pub worker: Option<usize>,
    /// Short failure label, e.g. `load_failure`.
    pub label: Option<&'static str>,
    pub error: Option<String>,
    /// Failed, but the failure does not fail the job.
    pub tolerated: bool,
    pub elapsed_ms: Option<u64>,
}

impl TaskReport {
    pub fn from_task(task: &Task, shard: usize, tolerated: bool) -> Self {
        Self {
            name: task.name.clone(),
            shard,
            stage: task.outcome.unwrap_or(task.stage),
            attempts: task.attempts,
            bytes: task.bytes,
            worker: task.worker,
            label: task.error.as_ref().map(|e| e.label()),
            error: task.error.as_ref().map(|e| e.to_string()),
            tolerated,
            elapsed_ms: task.elapsed().map(|d| d.as_millis() as u64),
        }
    }

    /// Whether this task counts against the job.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() && !self.tolerated
    }
}

/// Final result of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per task, in submission order.
    pub tasks: Vec<TaskReport>,
}

impl JobReport {
    pub fn new(job_id: Uuid, started_at: DateTime<Utc>, tasks: Vec<TaskReport>) -> Self {
        Self {
            job_id,
            started_at,
            finished_at: Utc::now(),
            tasks,
        }
    }

    /// Names of tasks whose failure fails the job.
    pub fn failures(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.is_failure())
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Names of tasks that failed in a tolerated way.
    pub fn tolerated(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.tolerated)
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Names of failed tasks in `shard`.
    pub fn shard_failures(&self, shard: usize) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.shard == shard && t.is_failure())
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| !t.is_failure())
    }

    /// `0` when nothing failed, otherwise the failure count clamped to `1..=255`.
    pub fn exit_code(&self) -> i32 {
        self.failures().len().min(u8::MAX as usize) as i32
    }

    pub fn summary(&self) -> String {
        let failures = self.failures();
        let mut line = format!(
            "{} tasks, {} failed, {} tolerated",
            self.tasks.len(),
            failures.len(),
            self.tolerated().len()
        );
        if !failures.is_empty() {
            line.push_str(&format!(": {}", failures.join(", ")));
        }
        line
    }
}
