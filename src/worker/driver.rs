//! Task lifecycle driver.
//!
//! Drives one task on one worker through
//! `Loading → Quiescing → AwaitingSignal` and classifies the outcome. The
//! driver owns the [`WorkerGuard`] for the whole run, so the worker goes back
//! to the pool when `drive` returns, whatever the outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::RunnerConfig;
use crate::engine::{WaitUntil, scripts};
use crate::error::{EngineError, RenderCause, TaskError};
use crate::worker::pool::WorkerGuard;
use crate::worker::state::{Task, TaskStage};

/// Result of one driver run.
#[derive(Debug)]
pub enum Outcome {
    Succeeded,
    /// Task-scoped failure; the batch continues.
    Failed(TaskError),
    /// The worker's context is unusable.
    Fatal(EngineError),
}

/// Runs tasks against pages served under `base_url`.
pub struct Driver {
    config: Arc<RunnerConfig>,
    base_url: String,
}

impl Driver {
    pub fn new(config: Arc<RunnerConfig>, base_url: impl Into<String>) -> Self {
        Self {
            config,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL a task's content is loaded from.
    pub fn url_for(&self, task: &str) -> String {
        format!("{}{}", self.base_url, self.config.task_path(task))
    }

    /// Drive `task` on `worker`. The worker is released before this returns.
    ///
    /// `task` must be in [`TaskStage::Assigned`]; it leaves in a terminal stage.
    pub async fn drive(&self, task: &mut Task, worker: WorkerGuard) -> Outcome {
        task.worker = Some(worker.id());
        let outcome = self.run_stages(task, &worker).await;

        let terminal = match &outcome {
            Outcome::Succeeded => TaskStage::Succeeded,
            Outcome::Failed(TaskError::Load { .. }) => TaskStage::FailedLoad,
            Outcome::Failed(TaskError::Render { .. }) => TaskStage::FailedRender,
            Outcome::Fatal(_) => TaskStage::FailedFatal,
        };
        advance(task, terminal);
        if let Outcome::Failed(err) = &outcome {
            task.error = Some(err.clone());
        }

        drop(worker);
        outcome
    }

    async fn run_stages(&self, task: &mut Task, worker: &WorkerGuard) -> Outcome {
        let page = worker.page();
        let load_limit = self.config.load_limit();

        // Loading
        advance(task, TaskStage::Loading);
        let url = self.url_for(&task.name);
        debug!(task = %task.name, worker = worker.id(), url = %url, "Loading");
        worker.begin_load().await;
        if let Err(e) = bounded(
            load_limit,
            page.navigate(&url, WaitUntil::NetworkIdle, load_limit),
        )
        .await
        {
            if e.is_fatal() {
                return Outcome::Fatal(e);
            }
            return Outcome::Failed(TaskError::Load {
                task: task.name.clone(),
                reason: e.to_string(),
            });
        }

        // Quiescing
        advance(task, TaskStage::Quiescing);
        if let Err(e) = page.evaluate(scripts::CLEAN_PAGE_SCRIPT).await {
            return render_failure(task, e, RenderCause::Protocol);
        }
        if let Err(e) = bounded(
            load_limit,
            page.wait_for_network_idle(self.config.idle_window, load_limit),
        )
        .await
        {
            return render_failure(task, e, RenderCause::Quiescence);
        }

        // AwaitingSignal
        advance(task, TaskStage::AwaitingSignal);
        task.bytes = worker.bytes();
        let render_limit = self.config.render_timeout(task.bytes);
        debug!(
            task = %task.name,
            bytes = task.bytes,
            timeout = ?render_limit,
            "Waiting for render signal"
        );

        if let Err(e) = page.evaluate(scripts::RENDER_START_SCRIPT).await {
            return render_failure(task, e, RenderCause::Protocol);
        }

        let signal = page.wait_for_function(
            scripts::RENDER_FINISHED_PREDICATE,
            self.config.signal_poll_interval,
        );
        let timed_out = match bounded(render_limit, signal).await {
            Ok(()) => None,
            Err(EngineError::Timeout(after)) => Some(after),
            Err(e) => return render_failure(task, e, RenderCause::Protocol),
        };

        // A latched error wins over both the signal and the timeout.
        if let Some(line) = worker.error() {
            return Outcome::Failed(TaskError::Render {
                task: task.name.clone(),
                cause: RenderCause::Diagnostic(line),
            });
        }
        if let Some(after) = timed_out {
            return Outcome::Failed(TaskError::Render {
                task: task.name.clone(),
                cause: RenderCause::Timeout(after),
            });
        }

        info!(task = %task.name, worker = worker.id(), bytes = task.bytes, "Task rendered");
        Outcome::Succeeded
    }
}

fn advance(task: &mut Task, stage: TaskStage) {
    if let Err(reason) = task.transition_to(stage) {
        // Only reachable through a driver bug; keep going with the new stage.
        tracing::error!("{}", reason);
        task.stage = stage;
    }
}

fn render_failure(task: &Task, err: EngineError, cause: fn(String) -> RenderCause) -> Outcome {
    if err.is_fatal() {
        return Outcome::Fatal(err);
    }
    Outcome::Failed(TaskError::Render {
        task: task.name.clone(),
        cause: cause(err.to_string()),
    })
}

/// Await `fut`, giving up after `limit` when one is set.
async fn bounded<F>(limit: Option<Duration>, fut: F) -> Result<(), EngineError>
where
    F: Future<Output = Result<(), EngineError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| EngineError::Timeout(limit))?,
        None => fut.await,
    }
}
