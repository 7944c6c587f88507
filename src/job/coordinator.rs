//! Job coordinator: fans tasks out over the worker pool.
//!
//! Two admission modes:
//! - `Rolling`: one elastic in-flight set over the whole task list, capped at
//!   the pool size; a finished task immediately makes room for the next.
//! - `Barrier`: shard by shard; every task of a shard is admitted at once and
//!   competes for workers, and the next shard starts only when all of them
//!   reached an outcome.
//!
//! In both modes each task is reported with its shard of the submitted list.
//!
//! A task-scoped failure never cancels other tasks. A fatal failure drops
//! the in-flight set, which aborts every other driver and releases their
//! workers.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{AdmissionMode, RenderTimeoutPolicy, RunnerConfig};
use crate::error::{Error, PoolError, Result};
use crate::job::report::{JobReport, TaskReport};
use crate::job::shard::{shard_of, shard_range};
use crate::worker::driver::{Driver, Outcome};
use crate::worker::pool::WorkerPool;
use crate::worker::state::{Task, TaskStage};

/// Position in the submitted list plus the task itself.
type Slot = (usize, Task);

/// Drives a task list to completion over a pool.
pub struct Coordinator {
    config: Arc<RunnerConfig>,
    pool: Arc<WorkerPool>,
    driver: Arc<Driver>,
}

impl Coordinator {
    pub fn new(config: Arc<RunnerConfig>, pool: Arc<WorkerPool>, driver: Arc<Driver>) -> Self {
        Self {
            config,
            pool,
            driver,
        }
    }

    /// Run every task and build the report.
    ///
    /// Returns `Err` only for fatal failures, which abort the job.
    pub async fn run(&self, names: Vec<String>) -> Result<JobReport> {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = names.len();
        let tasks: Vec<Slot> = names.into_iter().map(Task::new).enumerate().collect();

        info!(
            job = %job_id,
            tasks = total,
            workers = self.pool.size(),
            admission = ?self.config.admission,
            shards = self.config.shards,
            "Job started"
        );

        let shards = self.config.shards.max(1);
        let mut finished: Vec<Option<Task>> = vec![None; total];
        match self.config.admission {
            AdmissionMode::Rolling => {
                self.run_batch(tasks, self.pool.size(), &mut finished).await?;
            }
            AdmissionMode::Barrier => {
                let mut remaining = tasks.into_iter();
                for index in 0..shards {
                    let range = shard_range(total, index, shards);
                    let shard: Vec<Slot> = remaining.by_ref().take(range.len()).collect();
                    if shard.is_empty() {
                        continue;
                    }
                    info!(shard = index, tasks = shard.len(), "Starting shard");
                    self.run_batch(shard, usize::MAX, &mut finished).await?;
                }
            }
        }

        let reports = finished
            .into_iter()
            .enumerate()
            .filter_map(|(index, task)| {
                let task = task?;
                let tolerated = self.is_tolerated(&task);
                Some(TaskReport::from_task(&task, shard_of(total, index, shards), tolerated))
            })
            .collect();
        let report = JobReport::new(job_id, started_at, reports);

        if report.is_success() {
            info!(job = %job_id, "{}", report.summary());
        } else {
            error!(job = %job_id, "{}", report.summary());
        }
        Ok(report)
    }

    /// Run `tasks` with at most `limit` of them in flight.
    async fn run_batch(
        &self,
        tasks: Vec<Slot>,
        limit: usize,
        finished: &mut [Option<Task>],
    ) -> Result<()> {
        let mut pending: VecDeque<Slot> = tasks.into();
        let mut in_flight: JoinSet<(Slot, std::result::Result<Outcome, PoolError>)> =
            JoinSet::new();

        loop {
            while in_flight.len() < limit {
                let Some(slot) = pending.pop_front() else {
                    break;
                };
                in_flight.spawn(attempt(Arc::clone(&self.pool), Arc::clone(&self.driver), slot));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let ((index, task), result) = joined.map_err(|e| Error::Fatal {
                task: "<unknown>".to_string(),
                reason: format!("task driver panicked: {e}"),
            })?;

            match result {
                Err(e) => return Err(e.into()),
                Ok(Outcome::Fatal(e)) => {
                    error!(task = %task.name, error = %e, "Fatal infrastructure failure");
                    return Err(Error::Fatal {
                        task: task.name,
                        reason: e.to_string(),
                    });
                }
                Ok(Outcome::Failed(err)) => {
                    if self.is_tolerated(&task) {
                        warn!(task = %task.name, "{} (tolerated)", err);
                        finished[index] = Some(task);
                    } else if task.attempts < self.config.max_attempts {
                        warn!(
                            task = %task.name,
                            attempt = task.attempts,
                            max_attempts = self.config.max_attempts,
                            "{}; retrying",
                            err
                        );
                        pending.push_back((index, task));
                    } else {
                        error!(task = %task.name, label = err.label(), "{}", err);
                        finished[index] = Some(task);
                    }
                }
                Ok(Outcome::Succeeded) => finished[index] = Some(task),
            }
        }
        Ok(())
    }

    fn is_tolerated(&self, task: &Task) -> bool {
        self.config.render_timeout_policy == RenderTimeoutPolicy::Tolerate
            && task.outcome == Some(TaskStage::FailedRender)
            && task.error.as_ref().is_some_and(|e| e.is_render_timeout())
    }
}

/// One attempt: wait for a worker, drive the task, hand the worker back.
async fn attempt(
    pool: Arc<WorkerPool>,
    driver: Arc<Driver>,
    (index, mut task): Slot,
) -> (Slot, std::result::Result<Outcome, PoolError>) {
    let worker = match pool.acquire(&task.name).await {
        Ok(worker) => worker,
        Err(e) => return ((index, task), Err(e)),
    };

    if let Err(reason) = task.transition_to(TaskStage::Assigned) {
        tracing::error!("{}", reason);
        task.stage = TaskStage::Assigned;
    }
    let outcome = driver.drive(&mut task, worker).await;
    if let Err(reason) = task.transition_to(TaskStage::Released) {
        tracing::error!("{}", reason);
    }

    ((index, task), Ok(outcome))
}
