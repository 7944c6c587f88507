//! Task lifecycle state machine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    /// Enumerated, waiting for a worker.
    Pending,
    /// Holds a worker, nothing sent yet.
    Assigned,
    /// Navigating to the task's content.
    Loading,
    /// Waiting for network activity to settle.
    Quiescing,
    /// Render started, waiting for the completion signal.
    AwaitingSignal,
    Succeeded,
    FailedLoad,
    FailedRender,
    FailedFatal,
    /// Worker handed back to the pool.
    Released,
}

impl TaskStage {
    /// Check if this stage allows transitioning to another stage.
    pub fn can_transition_to(&self, target: TaskStage) -> bool {
        use TaskStage::*;

        matches!(
            (self, target),
            (Pending, Assigned) |
            (Assigned, Loading) | (Assigned, FailedFatal) |
            (Loading, Quiescing) | (Loading, FailedLoad) | (Loading, FailedFatal) |
            (Quiescing, AwaitingSignal) | (Quiescing, FailedRender) | (Quiescing, FailedFatal) |
            (AwaitingSignal, Succeeded) | (AwaitingSignal, FailedRender) |
            (AwaitingSignal, FailedFatal) |
            // Every outcome ends with the worker going back to the pool.
            (Succeeded, Released) | (FailedLoad, Released) |
            (FailedRender, Released) | (FailedFatal, Released) |
            // Retry after a released failure.
            (Released, Assigned)
        )
    }

    /// Check if this is an outcome of a driver run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::FailedLoad | Self::FailedRender | Self::FailedFatal
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedLoad | Self::FailedRender | Self::FailedFatal)
    }
}

impl std::fmt::Display for TaskStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Loading => "loading",
            Self::Quiescing => "quiescing",
            Self::AwaitingSignal => "awaiting_signal",
            Self::Succeeded => "succeeded",
            Self::FailedLoad => "failed_load",
            Self::FailedRender => "failed_render",
            Self::FailedFatal => "failed_fatal",
            Self::Released => "released",
        };
        write!(f, "{s}")
    }
}

/// One unit of work: a named piece of content driven through the protocol.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub stage: TaskStage,
    /// Outcome of the latest attempt, kept after the worker is released.
    pub outcome: Option<TaskStage>,
    /// Bytes transferred while loading the last attempt.
    pub bytes: u64,
    pub error: Option<TaskError>,
    pub attempts: u32,
    /// Worker that ran the last attempt.
    pub worker: Option<usize>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: TaskStage::Pending,
            outcome: None,
            bytes: 0,
            error: None,
            attempts: 0,
            worker: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Move to `stage`, rejecting transitions the lifecycle does not allow.
    pub fn transition_to(&mut self, stage: TaskStage) -> Result<(), String> {
        if !self.stage.can_transition_to(stage) {
            return Err(format!(
                "Task {}: cannot transition from {} to {}",
                self.name, self.stage, stage
            ));
        }

        match stage {
            TaskStage::Assigned => {
                self.attempts += 1;
                self.outcome = None;
                self.bytes = 0;
                self.error = None;
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
            }
            s if s.is_terminal() => {
                self.outcome = Some(s);
                self.finished_at = Some(Utc::now());
            }
            _ => {}
        }

        self.stage = stage;
        Ok(())
    }

    /// Wall-clock time from first assignment to the latest outcome.
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        end.signed_duration_since(start).to_std().ok()
    }
}
