//! Integration tests for the job coordinator and runner.
//!
//! A scripted stub engine stands in for the browser: each page looks up the
//! task it was navigated to and behaves as scripted for that name, recording
//! an ordered timeline of stage starts and ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use pagerun::config::{AdmissionMode, LaunchOptions, RenderTimeoutPolicy, RunnerConfig};
use pagerun::engine::{DiagnosticLevel, Engine, Page, PageEvent, WaitUntil};
use pagerun::error::{EngineError, Error};
use pagerun::job::Coordinator;
use pagerun::job::shard::shard_range;
use pagerun::worker::diagnostics::DiagnosticFilter;
use pagerun::worker::{Driver, TaskStage, WorkerPool};
use pagerun::Runner;

/// Upper bound on a job in paused-clock tests. Virtual time, so generous.
const JOB_TIMEOUT: Duration = Duration::from_secs(3600);

/// Maximum time a real-clock test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const MIB: u64 = 1024 * 1024;

/// How a page behaves for one task.
#[derive(Debug, Clone)]
enum Script {
    /// Loads, then signals completion after `render`.
    Pass { render: Duration },
    /// Like `Pass`, but transfers `bytes` while loading.
    Heavy { bytes: u64, render: Duration },
    /// Navigation never resolves.
    HangOnLoad,
    /// Loads but never sets the finished flag.
    NeverSignal,
    /// Logs a console error while loading, then signals normally.
    ErrorThenSignal(String),
    /// First navigation fails, later ones pass.
    Flaky,
    /// The page dies on navigation.
    Crash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Start,
    End,
}

#[derive(Default)]
struct Timeline {
    seq: AtomicUsize,
    records: Mutex<Vec<(usize, String, Mark)>>,
}

impl Timeline {
    fn record(&self, task: &str, mark: Mark) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push((seq, task.to_string(), mark));
    }

    fn marks(&self, task: &str, mark: Mark) -> Vec<usize> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, t, m)| t == task && *m == mark)
            .map(|(seq, _, _)| *seq)
            .collect()
    }

    fn first(&self, task: &str, mark: Mark) -> usize {
        *self
            .marks(task, mark)
            .first()
            .unwrap_or_else(|| panic!("no {mark:?} for {task}"))
    }
}

struct StubShared {
    scripts: HashMap<String, Script>,
    navigations: Mutex<HashMap<String, usize>>,
    timeline: Timeline,
    /// Pages currently between navigation and their last stage.
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl StubShared {
    fn script(&self, task: &str) -> Script {
        self.scripts.get(task).cloned().unwrap_or(Script::Pass {
            render: Duration::from_millis(20),
        })
    }

    fn enter(&self, task: &str) {
        self.timeline.record(task, Mark::Start);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self, task: &str) {
        self.timeline.record(task, Mark::End);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct StubPage {
    shared: Arc<StubShared>,
    current: Mutex<String>,
    tx: mpsc::UnboundedSender<PageEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<PageEvent>>>,
}

impl StubPage {
    fn current(&self) -> String {
        self.current.lock().unwrap().clone()
    }
}

fn task_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .unwrap_or(url)
        .trim_end_matches(".html")
        .to_string()
}

#[async_trait]
impl Page for StubPage {
    async fn add_init_script(&self, _source: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        _wait_until: WaitUntil,
        _timeout: Option<Duration>,
    ) -> Result<(), EngineError> {
        let task = task_from_url(url);
        *self.current.lock().unwrap() = task.clone();
        self.shared.enter(&task);

        let attempt = {
            let mut navigations = self.shared.navigations.lock().unwrap();
            let n = navigations.entry(task.clone()).or_insert(0);
            *n += 1;
            *n
        };

        match self.shared.script(&task) {
            Script::HangOnLoad => {
                // Leaves when the driver drops this future on timeout.
                let _leave = Leave(Arc::clone(&self.shared), task.clone());
                std::future::pending::<()>().await;
                unreachable!()
            }
            Script::Crash => {
                self.shared.leave(&task);
                Err(EngineError::Disconnected("target crashed".into()))
            }
            Script::Flaky if attempt == 1 => {
                self.shared.leave(&task);
                Err(EngineError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_CONNECTION_RESET".into(),
                })
            }
            Script::Heavy { bytes, .. } => {
                let _ = self.tx.send(PageEvent::DataTransfer { status: 200, bytes });
                let _ = self.tx.send(PageEvent::DataTransfer {
                    status: 404,
                    bytes: 10 * MIB,
                });
                Ok(())
            }
            Script::ErrorThenSignal(message) => {
                let _ = self.tx.send(PageEvent::Diagnostic {
                    level: DiagnosticLevel::Error,
                    args: vec![message],
                });
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, EngineError> {
        Ok(serde_json::Value::Bool(true))
    }

    async fn wait_for_network_idle(
        &self,
        idle: Duration,
        _timeout: Option<Duration>,
    ) -> Result<(), EngineError> {
        tokio::time::sleep(idle).await;
        Ok(())
    }

    async fn wait_for_function(
        &self,
        _predicate: &str,
        _poll: Duration,
    ) -> Result<(), EngineError> {
        let task = self.current();
        let _leave = Leave(Arc::clone(&self.shared), task.clone());
        match self.shared.script(&task) {
            Script::NeverSignal => std::future::pending().await,
            Script::Pass { render } | Script::Heavy { render, .. } => {
                tokio::time::sleep(render).await;
                Ok(())
            }
            _ => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            }
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<PageEvent> {
        self.rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe called once per page")
    }
}

/// Records the end of a stage when dropped, including on cancellation.
struct Leave(Arc<StubShared>, String);

impl Drop for Leave {
    fn drop(&mut self) {
        self.0.leave(&self.1);
    }
}

struct StubEngine {
    shared: Arc<StubShared>,
    launched: AtomicUsize,
    closed: AtomicUsize,
    fail_launch: bool,
}

impl StubEngine {
    fn new(scripts: Vec<(&str, Script)>) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(StubShared {
                scripts: scripts
                    .into_iter()
                    .map(|(name, script)| (name.to_string(), script))
                    .collect(),
                navigations: Mutex::new(HashMap::new()),
                timeline: Timeline::default(),
                active: AtomicUsize::new(0),
                peak_active: AtomicUsize::new(0),
            }),
            launched: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            fail_launch: false,
        })
    }

    fn pages(&self, count: usize) -> Vec<Arc<dyn Page>> {
        (0..count)
            .map(|_| {
                let (tx, rx) = mpsc::unbounded_channel();
                Arc::new(StubPage {
                    shared: Arc::clone(&self.shared),
                    current: Mutex::new(String::new()),
                    tx,
                    rx: Mutex::new(Some(rx)),
                }) as Arc<dyn Page>
            })
            .collect()
    }

    fn timeline(&self) -> &Timeline {
        &self.shared.timeline
    }
}

#[async_trait]
impl Engine for StubEngine {
    async fn launch(
        &self,
        _options: &LaunchOptions,
        count: usize,
    ) -> Result<Vec<Arc<dyn Page>>, EngineError> {
        if self.fail_launch {
            return Err(EngineError::LaunchFailed("no browser binary".into()));
        }
        self.launched.fetch_add(count, Ordering::SeqCst);
        Ok(self.pages(count))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_config(pool_size: usize) -> RunnerConfig {
    RunnerConfig {
        pool_size,
        port: 0,
        load_timeout: Duration::from_secs(90),
        idle_window: Duration::from_millis(10),
        render_timeout_base: Duration::from_secs(5),
        render_time_per_mib: Duration::from_secs(6),
        render_timeout_policy: RenderTimeoutPolicy::Fail,
        ..Default::default()
    }
}

struct Harness {
    engine: Arc<StubEngine>,
    pool: Arc<WorkerPool>,
    coordinator: Coordinator,
}

fn harness(config: RunnerConfig, scripts: Vec<(&str, Script)>) -> Harness {
    let engine = StubEngine::new(scripts);
    let config = Arc::new(config);
    let pool = Arc::new(
        WorkerPool::new(
            engine.pages(config.pool_size),
            Arc::new(DiagnosticFilter::new(config.ignored_diagnostics.clone())),
            config.acquire_poll_interval,
        )
        .unwrap(),
    );
    let driver = Arc::new(Driver::new(Arc::clone(&config), "http://stub"));
    let coordinator = Coordinator::new(config, Arc::clone(&pool), driver);
    Harness {
        engine,
        pool,
        coordinator,
    }
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn three_tasks_two_workers() {
    let h = harness(
        test_config(2),
        vec![
            ("a", Script::Pass { render: Duration::from_millis(100) }),
            ("b", Script::Pass { render: Duration::from_millis(300) }),
            ("c", Script::Pass { render: Duration::from_millis(100) }),
        ],
    );

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["a", "b", "c"])))
        .await
        .expect("job hung")
        .unwrap();

    let t = h.engine.timeline();
    let first_end = t.first("a", Mark::End).min(t.first("b", Mark::End));
    assert!(t.first("a", Mark::Start) < first_end);
    assert!(t.first("b", Mark::Start) < first_end);
    assert!(t.first("c", Mark::Start) > first_end, "c started before a worker freed up");

    assert!(report.is_success());
    assert!(report.failures().is_empty());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(h.pool.peak_busy(), 2);
    assert_eq!(h.pool.release_count(), 3);
    assert_eq!(h.engine.shared.peak_active.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn three_tasks_one_misses_its_signal() {
    let h = harness(
        test_config(2),
        vec![
            ("a", Script::Pass { render: Duration::from_millis(100) }),
            ("b", Script::NeverSignal),
        ],
    );

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["a", "b", "c"])))
        .await
        .expect("job hung")
        .unwrap();

    assert_eq!(report.failures(), vec!["b"]);
    assert_eq!(report.exit_code(), 1);
    let b = &report.tasks[1];
    assert_eq!(b.stage, TaskStage::FailedRender);
    assert_eq!(b.label, Some("render_timeout"));
}

#[tokio::test(start_paused = true)]
async fn load_timeout_fails_task_but_job_continues() {
    let h = harness(
        test_config(2),
        vec![("stuck", Script::HangOnLoad)],
    );

    let report = timeout(
        JOB_TIMEOUT,
        h.coordinator.run(names(&["stuck", "x", "y", "z"])),
    )
    .await
    .expect("job hung")
    .unwrap();

    assert_eq!(report.failures(), vec!["stuck"]);
    assert!(report.exit_code() > 0);
    let stuck = &report.tasks[0];
    assert_eq!(stuck.stage, TaskStage::FailedLoad);
    assert_eq!(stuck.label, Some("load_failure"));
    assert!(stuck.error.as_deref().unwrap().contains("Timed out after 90s"));

    for task in &report.tasks[1..] {
        assert_eq!(task.stage, TaskStage::Succeeded, "{}", task.name);
    }
    assert_eq!(h.pool.busy_count(), 0);
    assert_eq!(h.pool.release_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn render_timeout_policy_decides_job_status() {
    for (policy, expect_failures) in [
        (RenderTimeoutPolicy::Fail, vec!["slow"]),
        (RenderTimeoutPolicy::Tolerate, vec![]),
    ] {
        let config = RunnerConfig {
            render_timeout_policy: policy,
            ..test_config(1)
        };
        let h = harness(
            config,
            // Signals just after the 5s budget.
            vec![("slow", Script::Pass { render: Duration::from_millis(5_001) })],
        );

        let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["slow"])))
            .await
            .expect("job hung")
            .unwrap();

        assert_eq!(report.failures(), expect_failures, "{policy:?}");
        assert_eq!(report.tasks[0].stage, TaskStage::FailedRender);
        assert_eq!(
            report.tolerated().len(),
            usize::from(policy == RenderTimeoutPolicy::Tolerate)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn payload_size_buys_render_time() {
    // 8s of render work: too slow for an empty payload (5s budget), fine for
    // a 1 MiB payload (5s + 6s).
    let render = Duration::from_secs(8);
    let h = harness(
        test_config(2),
        vec![
            ("light", Script::Pass { render }),
            ("heavy", Script::Heavy { bytes: MIB, render }),
        ],
    );

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["light", "heavy"])))
        .await
        .expect("job hung")
        .unwrap();

    assert_eq!(report.failures(), vec!["light"]);
    let heavy = &report.tasks[1];
    assert_eq!(heavy.stage, TaskStage::Succeeded);
    // Non-200 responses are not counted.
    assert_eq!(heavy.bytes, MIB);
}

#[tokio::test(start_paused = true)]
async fn latched_error_fails_render_even_after_signal() {
    let h = harness(
        test_config(1),
        vec![("noisy", Script::ErrorThenSignal("THREE.WebGLProgram: shader error".into()))],
    );

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["noisy"])))
        .await
        .expect("job hung")
        .unwrap();

    // The content did signal completion.
    assert_eq!(h.engine.timeline().marks("noisy", Mark::End).len(), 1);

    let noisy = &report.tasks[0];
    assert_eq!(noisy.stage, TaskStage::FailedRender);
    assert_eq!(noisy.label, Some("render_failure"));
    assert!(
        noisy
            .error
            .as_deref()
            .unwrap()
            .ends_with("noisy: THREE.WebGLProgram: shader error")
    );
    assert_eq!(report.failures(), vec!["noisy"]);
}

#[tokio::test(start_paused = true)]
async fn latched_error_is_not_tolerated() {
    let config = RunnerConfig {
        render_timeout_policy: RenderTimeoutPolicy::Tolerate,
        ..test_config(1)
    };
    let h = harness(
        config,
        vec![("noisy", Script::ErrorThenSignal("boom".into()))],
    );

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["noisy"])))
        .await
        .expect("job hung")
        .unwrap();
    assert_eq!(report.failures(), vec!["noisy"]);
    assert!(report.tolerated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn retried_task_latches_repeated_error() {
    let config = RunnerConfig {
        max_attempts: 2,
        ..test_config(1)
    };
    let h = harness(
        config,
        vec![("noisy", Script::ErrorThenSignal("shader error".into()))],
    );

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["noisy"])))
        .await
        .expect("job hung")
        .unwrap();

    let noisy = &report.tasks[0];
    assert_eq!(noisy.attempts, 2);
    assert_eq!(noisy.stage, TaskStage::FailedRender);
    assert!(noisy.error.as_deref().unwrap().ends_with("noisy: shader error"));
    assert_eq!(report.failures(), vec!["noisy"]);
}

#[tokio::test(start_paused = true)]
async fn barrier_shards_never_overlap() {
    let tasks: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
    let scripts = tasks
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let render = Duration::from_millis(50 + 37 * (i as u64 % 4));
            (name.as_str(), Script::Pass { render })
        })
        .collect();
    let config = RunnerConfig {
        admission: AdmissionMode::Barrier,
        shards: 4,
        ..test_config(2)
    };
    let h = harness(config, scripts);

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(tasks.clone()))
        .await
        .expect("job hung")
        .unwrap();
    assert!(report.is_success());

    let t = h.engine.timeline();
    for shard in 0..3 {
        let current = &tasks[shard_range(10, shard, 4)];
        let next = &tasks[shard_range(10, shard + 1, 4)];
        let last_end = current.iter().map(|n| t.first(n, Mark::End)).max().unwrap();
        let first_start = next.iter().map(|n| t.first(n, Mark::Start)).min().unwrap();
        assert!(
            first_start > last_end,
            "shard {} started before shard {} finished",
            shard + 1,
            shard
        );
    }
    assert!(h.pool.peak_busy() <= 2);
}

#[tokio::test(start_paused = true)]
async fn rolling_admission_keeps_pool_bound() {
    let tasks: Vec<String> = (0..40).map(|i| format!("r{i}")).collect();
    let scripts = tasks
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let render = Duration::from_millis(10 + 13 * (i as u64 % 7));
            (name.as_str(), Script::Pass { render })
        })
        .collect();
    let config = RunnerConfig {
        shards: 4,
        ..test_config(3)
    };
    let h = harness(config, scripts);

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(tasks))
        .await
        .expect("job hung")
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.tasks.len(), 40);
    // Shards only group the report in rolling mode.
    let per_shard: Vec<usize> = (0..4)
        .map(|shard| report.tasks.iter().filter(|t| t.shard == shard).count())
        .collect();
    assert_eq!(per_shard, vec![10, 10, 10, 10]);
    assert_eq!(report.tasks[39].shard, 3);
    assert_eq!(h.pool.peak_busy(), 3);
    assert!(h.engine.shared.peak_active.load(Ordering::SeqCst) <= 3);
    assert_eq!(h.pool.release_count(), 40);
    assert_eq!(h.pool.busy_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_task_retried_until_attempts_run_out() {
    let config = RunnerConfig {
        max_attempts: 2,
        ..test_config(2)
    };
    let h = harness(
        config,
        vec![("flaky", Script::Flaky), ("stuck", Script::HangOnLoad)],
    );

    let report = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["flaky", "stuck"])))
        .await
        .expect("job hung")
        .unwrap();

    let flaky = &report.tasks[0];
    assert_eq!(flaky.stage, TaskStage::Succeeded);
    assert_eq!(flaky.attempts, 2);

    let stuck = &report.tasks[1];
    assert_eq!(stuck.stage, TaskStage::FailedLoad);
    assert_eq!(stuck.attempts, 2);
    assert_eq!(report.failures(), vec!["stuck"]);
    assert_eq!(h.pool.release_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_aborts_job_and_releases_workers() {
    let h = harness(
        test_config(2),
        vec![("dead", Script::Crash), ("slow", Script::HangOnLoad)],
    );

    let result = timeout(JOB_TIMEOUT, h.coordinator.run(names(&["slow", "dead", "later"])))
        .await
        .expect("job hung");

    match result {
        Err(Error::Fatal { task, reason }) => {
            assert_eq!(task, "dead");
            assert!(reason.contains("target crashed"));
        }
        other => panic!("expected fatal error, got {other:?}"),
    }
    // Aborted drivers drop their guards once the runtime cancels them.
    timeout(JOB_TIMEOUT, async {
        while h.pool.busy_count() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("workers never released");
    assert!(h.engine.timeline().marks("later", Mark::Start).is_empty());
}

#[tokio::test]
async fn runner_tears_down_exactly_once() {
    let root = tempfile::tempdir().unwrap();
    let engine = StubEngine::new(vec![("bad", Script::Crash)]);
    let config = RunnerConfig {
        root: root.path().to_path_buf(),
        ..test_config(16)
    };
    let runner = Runner::new(config, engine.clone()).unwrap();

    let report = timeout(TEST_TIMEOUT, runner.run(names(&["a", "b", "c"])))
        .await
        .expect("job hung")
        .unwrap();

    assert!(report.is_success());
    // Pool sized to the task count, not the configured 16.
    assert_eq!(engine.launched.load(Ordering::SeqCst), 3);
    assert_eq!(engine.closed.load(Ordering::SeqCst), 1);

    let result = timeout(TEST_TIMEOUT, runner.run(names(&["bad", "a"])))
        .await
        .expect("job hung");
    assert!(matches!(result, Err(Error::Fatal { .. })));
    assert_eq!(engine.launched.load(Ordering::SeqCst), 5);
    assert_eq!(engine.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn interrupt_abandons_in_flight_task_and_tears_down() {
    let root = tempfile::tempdir().unwrap();
    let engine = StubEngine::new(vec![("stuck", Script::HangOnLoad)]);
    let config = RunnerConfig {
        root: root.path().to_path_buf(),
        ..test_config(1)
    };
    let runner = Runner::new(config, engine.clone()).unwrap();

    // Fires once the first task is loading.
    let shutdown = {
        let engine = Arc::clone(&engine);
        async move {
            while engine.timeline().marks("stuck", Mark::Start).is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    };

    let result = timeout(
        TEST_TIMEOUT,
        runner.run_until(names(&["stuck", "later"]), shutdown),
    )
    .await
    .expect("interrupt did not cut the load timeout short");

    assert!(matches!(result, Err(Error::Interrupted)));
    assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
    // The hanging navigation was dropped, and nothing else was admitted.
    assert_eq!(engine.timeline().marks("stuck", Mark::End).len(), 1);
    assert!(engine.timeline().marks("later", Mark::Start).is_empty());
}

#[tokio::test]
async fn runner_skips_launch_for_empty_job() {
    let engine = StubEngine::new(Vec::new());
    let runner = Runner::new(test_config(4), engine.clone()).unwrap();

    let report = runner.run(Vec::new()).await.unwrap();
    assert_eq!(report.exit_code(), 0);
    assert_eq!(engine.launched.load(Ordering::SeqCst), 0);
    assert_eq!(engine.closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn runner_cleans_up_after_launch_failure() {
    let mut engine = StubEngine::new(Vec::new());
    Arc::get_mut(&mut engine).unwrap().fail_launch = true;
    let config = test_config(4);
    let runner = Runner::new(config, engine.clone()).unwrap();

    let result = runner.run(names(&["a"])).await;
    assert!(matches!(result, Err(Error::Engine(EngineError::LaunchFailed(_)))));
    assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn runner_rejects_invalid_config() {
    let engine = StubEngine::new(Vec::new());
    let config = RunnerConfig {
        shards: 0,
        ..test_config(4)
    };
    assert!(matches!(Runner::new(config, engine), Err(Error::Config(_))));
}
