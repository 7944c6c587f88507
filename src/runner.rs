//! Runner: wires the collaborators together for one job.
//!
//! Start-up order is asset server, engine, pages, pool. Teardown runs in
//! reverse (pool, engine, server), exactly once per job, whether the job
//! succeeded, failed, aborted or was interrupted.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{Instrument, error, info, info_span, warn};

use crate::config::RunnerConfig;
use crate::engine::{Engine, Page, scripts};
use crate::error::{Error, Result};
use crate::job::coordinator::Coordinator;
use crate::job::report::JobReport;
use crate::os_signals::wait_for_shutdown_signal;
use crate::server::AssetServer;
use crate::worker::diagnostics::DiagnosticFilter;
use crate::worker::driver::Driver;
use crate::worker::pool::WorkerPool;

/// Runs jobs against an engine.
pub struct Runner {
    config: Arc<RunnerConfig>,
    engine: Arc<dyn Engine>,
}

impl Runner {
    pub fn new(config: RunnerConfig, engine: Arc<dyn Engine>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            engine,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `tasks` to completion and tear everything down.
    pub async fn run(&self, tasks: Vec<String>) -> Result<JobReport> {
        if tasks.is_empty() {
            return Ok(empty_report());
        }
        let session = self.start(tasks.len()).await?;
        let result = session.execute(tasks).await;
        finish(result, session.teardown().await)
    }

    /// Like [`run`](Self::run), but a termination signal closes the pool and
    /// tears down immediately, without waiting for in-flight stages.
    pub async fn run_until_signal(&self, tasks: Vec<String>) -> Result<JobReport> {
        self.run_until(tasks, shutdown_signal()).await
    }

    /// Run `tasks`, stopping early with [`Error::Interrupted`] once `shutdown`
    /// resolves. Pending acquires fail, in-flight drivers are dropped and
    /// teardown still runs once.
    pub async fn run_until<F>(&self, tasks: Vec<String>, shutdown: F) -> Result<JobReport>
    where
        F: Future<Output = ()>,
    {
        if tasks.is_empty() {
            return Ok(empty_report());
        }
        let session = self.start(tasks.len()).await?;

        let result = tokio::select! {
            result = session.execute(tasks) => result,
            _ = shutdown => {
                warn!("Shutdown requested; closing worker pool");
                session.pool.close();
                Err(Error::Interrupted)
            }
        };

        finish(result, session.teardown().await)
    }

    async fn start(&self, task_count: usize) -> Result<Session> {
        let server = AssetServer::start(&self.config.root, self.config.port).await?;

        let workers = self.config.pool_size.min(task_count).max(1);
        let pool = match self.launch(workers).await {
            Ok(pages) => {
                let filter = Arc::new(DiagnosticFilter::new(self.config.ignored_diagnostics.clone()));
                WorkerPool::new(pages, filter, self.config.acquire_poll_interval)
                    .map_err(Error::from)
            }
            Err(e) => Err(e),
        };
        let pool = match pool {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                error!(error = %e, "Engine start-up failed");
                // Launch may have partially succeeded.
                if let Err(close_err) = self.engine.close().await {
                    warn!(error = %close_err, "Failed to close engine after start-up failure");
                }
                if let Err(stop_err) = server.shutdown().await {
                    warn!(error = %stop_err, "Failed to stop asset server after start-up failure");
                }
                return Err(e);
            }
        };

        let driver = Arc::new(Driver::new(Arc::clone(&self.config), server.base_url()));

        Ok(Session {
            coordinator: Coordinator::new(Arc::clone(&self.config), Arc::clone(&pool), driver),
            pool,
            engine: Arc::clone(&self.engine),
            server,
            torn_down: AtomicBool::new(false),
        })
    }

    async fn launch(&self, workers: usize) -> Result<Vec<Arc<dyn Page>>> {
        let pages = self.engine.launch(&self.config.launch, workers).await?;
        futures::future::try_join_all(
            pages
                .iter()
                .map(|page| page.add_init_script(scripts::INIT_SCRIPT)),
        )
        .await?;
        info!(requested = workers, opened = pages.len(), "Engine launched");
        Ok(pages)
    }
}

/// Collaborators owned by one running job.
struct Session {
    coordinator: Coordinator,
    pool: Arc<WorkerPool>,
    engine: Arc<dyn Engine>,
    server: AssetServer,
    torn_down: AtomicBool,
}

impl Session {
    async fn execute(&self, tasks: Vec<String>) -> Result<JobReport> {
        let span = info_span!("job", tasks = tasks.len());
        self.coordinator.run(tasks).instrument(span).await
    }

    /// Close pool, engine and server. Only the first call does anything.
    async fn teardown(&self) -> Result<()> {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.pool.close();

        let engine = self.engine.close().await;
        let server = self.server.shutdown().await;
        info!("Teardown complete");

        engine?;
        server?;
        Ok(())
    }
}

/// A job's own error wins over a teardown error.
fn finish(result: Result<JobReport>, teardown: Result<()>) -> Result<JobReport> {
    match (result, teardown) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => {
            error!(error = %e, "Teardown failed");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(teardown_err)) => {
            error!(error = %teardown_err, "Teardown failed");
            Err(e)
        }
    }
}

fn empty_report() -> JobReport {
    info!("No tasks to run");
    JobReport::new(uuid::Uuid::new_v4(), chrono::Utc::now(), Vec::new())
}

/// Resolves on a termination signal; never resolves if listeners cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = wait_for_shutdown_signal().await {
        warn!(error = %e, "Cannot listen for shutdown signals");
        std::future::pending::<()>().await;
    }
}
