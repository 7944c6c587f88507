//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default console messages that never count as task diagnostics.
pub const DEFAULT_IGNORED_DIAGNOSTICS: &[&str] = &["Unable to access the camera/webcam"];

/// What to do with a task whose completion signal never arrived in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTimeoutPolicy {
    /// Log the timeout and count the task as passed.
    Tolerate,
    /// Record the timeout as a task failure.
    Fail,
}

/// How the coordinator admits tasks into the in-flight set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Admit a new task as soon as any in-flight task finishes.
    Rolling,
    /// Run shard by shard; a shard starts once every task of the previous one is done.
    Barrier,
}

/// Options handed to the engine at launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Viewport in device pixels (already multiplied by the view scale).
    pub viewport: (u32, u32),
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        let (width, height, scale) = (400, 250, 2);
        Self {
            headless: true,
            viewport: (width * scale, height * scale),
            args: [
                "--hide-scrollbars",
                "--enable-unsafe-webgpu",
                "--enable-features=Vulkan",
                "--use-gl=swiftshader",
                "--use-angle=swiftshader",
                "--use-vulkan=swiftshader",
                "--use-webgpu-adapter=swiftshader",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum number of workers (pages) to open.
    pub pool_size: usize,
    /// Port the asset server listens on.
    pub port: u16,
    /// Directory served as the asset root.
    pub root: PathBuf,
    /// Directory below `root` holding one `<task>.html` per task.
    pub content_dir: String,
    /// Bound on navigation and on network quiescence. Zero disables it.
    pub load_timeout: Duration,
    /// How long the network must stay silent before content counts as loaded.
    pub idle_window: Duration,
    /// Constant part of the render timeout. Zero disables the render timeout.
    pub render_timeout_base: Duration,
    /// Extra render time granted per MiB transferred while loading.
    pub render_time_per_mib: Duration,
    pub render_timeout_policy: RenderTimeoutPolicy,
    pub admission: AdmissionMode,
    /// Number of contiguous shards the task list is split into.
    pub shards: usize,
    /// Run only this `(index, count)` shard of the enumerated tasks.
    pub source_shard: Option<(usize, usize)>,
    /// Attempts per task, including the first one.
    pub max_attempts: u32,
    /// Re-scan period for waiters on the worker pool.
    pub acquire_poll_interval: Duration,
    /// Poll period for the render-finished flag.
    pub signal_poll_interval: Duration,
    /// Tasks never scheduled.
    pub exceptions: Vec<String>,
    /// Console message fragments that are never reported.
    pub ignored_diagnostics: Vec<String>,
    pub launch: LaunchOptions,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            port: 1234,
            root: PathBuf::from("."),
            content_dir: "examples".to_string(),
            load_timeout: Duration::from_secs(90), // 1.5 minutes
            idle_window: Duration::from_secs(9),
            render_timeout_base: Duration::from_secs(5),
            render_time_per_mib: Duration::from_secs(6),
            render_timeout_policy: RenderTimeoutPolicy::Tolerate,
            admission: AdmissionMode::Rolling,
            shards: 1,
            source_shard: None,
            max_attempts: 1,
            acquire_poll_interval: Duration::from_millis(100),
            signal_poll_interval: Duration::from_millis(10),
            exceptions: Vec::new(),
            ignored_diagnostics: DEFAULT_IGNORED_DIAGNOSTICS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            launch: LaunchOptions::default(),
        }
    }
}

impl RunnerConfig {
    /// Build config from `PAGERUN_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let secs = |key: &str, default: Duration| -> Duration {
            std::env::var(key)
                .ok()
                .and_then(|s| parse_secs(&s))
                .unwrap_or(default)
        };

        let pool_size: usize = std::env::var("PAGERUN_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.pool_size);

        let port: u16 = std::env::var("PAGERUN_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let shards: usize = std::env::var("PAGERUN_SHARDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.shards);

        let max_attempts: u32 = std::env::var("PAGERUN_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_attempts);

        let render_timeout_policy = match std::env::var("PAGERUN_RENDER_TIMEOUT_POLICY").as_deref()
        {
            Ok("fail") => RenderTimeoutPolicy::Fail,
            Ok("tolerate") => RenderTimeoutPolicy::Tolerate,
            _ => defaults.render_timeout_policy,
        };

        let admission = match std::env::var("PAGERUN_ADMISSION").as_deref() {
            Ok("barrier") => AdmissionMode::Barrier,
            Ok("rolling") => AdmissionMode::Rolling,
            _ => defaults.admission,
        };

        // `PAGERUN_SHARD=1/4` runs the second quarter of the tasks.
        let source_shard = std::env::var("PAGERUN_SHARD").ok().and_then(|s| {
            let (index, count) = s.split_once('/')?;
            Some((index.trim().parse().ok()?, count.trim().parse().ok()?))
        });

        let exceptions: Vec<String> = std::env::var("PAGERUN_EXCEPTIONS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut launch = defaults.launch.clone();
        if std::env::var_os("VISIBLE").is_some() {
            launch.headless = false;
        }

        Self {
            pool_size,
            port,
            root: std::env::var("PAGERUN_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            content_dir: std::env::var("PAGERUN_CONTENT_DIR").unwrap_or(defaults.content_dir),
            load_timeout: secs("PAGERUN_LOAD_TIMEOUT_SECS", defaults.load_timeout),
            idle_window: secs("PAGERUN_IDLE_SECS", defaults.idle_window),
            render_timeout_base: secs("PAGERUN_RENDER_TIMEOUT_SECS", defaults.render_timeout_base),
            render_time_per_mib: secs("PAGERUN_PARSE_SECS_PER_MIB", defaults.render_time_per_mib),
            render_timeout_policy,
            admission,
            shards,
            source_shard,
            max_attempts,
            exceptions,
            launch,
            ..defaults
        }
    }

    /// Reject values the runner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pool_size".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.shards == 0 {
            return Err(ConfigError::InvalidValue {
                key: "shards".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_attempts".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.acquire_poll_interval.is_zero() || self.signal_poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval".into(),
                message: "poll intervals must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// Load timeout, or `None` when disabled.
    pub fn load_limit(&self) -> Option<Duration> {
        (!self.load_timeout.is_zero()).then_some(self.load_timeout)
    }

    /// Render timeout for a task that transferred `bytes` while loading, or
    /// `None` when render timeouts are disabled.
    pub fn render_timeout(&self, bytes: u64) -> Option<Duration> {
        if self.render_timeout_base.is_zero() {
            return None;
        }
        let mib = bytes as f64 / (1024.0 * 1024.0);
        // Saturates instead of overflowing for huge budgets or payloads.
        let extra = Duration::try_from_secs_f64(self.render_time_per_mib.as_secs_f64() * mib)
            .unwrap_or(Duration::MAX);
        Some(self.render_timeout_base.saturating_add(extra))
    }

    /// URL path a task's content is served under.
    pub fn task_path(&self, task: &str) -> String {
        format!("/{}/{}.html", self.content_dir.trim_matches('/'), task)
    }
}

/// Parse a non-negative number of seconds. Values a `Duration` cannot hold
/// are rejected.
fn parse_secs(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunnerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.launch.viewport, (800, 500));
        assert_eq!(config.load_limit(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn zero_pool_rejected() {
        let config = RunnerConfig {
            pool_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "pool_size"
        ));
    }

    #[test]
    fn zero_load_timeout_disables_limit() {
        let config = RunnerConfig {
            load_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.load_limit(), None);
    }

    #[test]
    fn render_timeout_scales_with_bytes() {
        let config = RunnerConfig::default();
        assert_eq!(config.render_timeout(0), Some(Duration::from_secs(5)));
        assert_eq!(
            config.render_timeout(1024 * 1024),
            Some(Duration::from_secs(11))
        );
        assert_eq!(
            config.render_timeout(512 * 1024),
            Some(Duration::from_secs(8))
        );
    }

    #[test]
    fn render_timeout_monotonic_in_bytes() {
        let config = RunnerConfig::default();
        let mut previous = Duration::ZERO;
        for bytes in (0..64u64).map(|i| i * 37_813 + i * i * 1_001) {
            let timeout = config.render_timeout(bytes).unwrap();
            assert!(timeout >= previous, "{bytes} bytes gave {timeout:?}");
            previous = timeout;
        }
    }

    #[test]
    fn zero_base_disables_render_timeout() {
        let config = RunnerConfig {
            render_timeout_base: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.render_timeout(10 * 1024 * 1024), None);
    }

    #[test]
    fn parse_secs_rejects_out_of_range() {
        assert_eq!(parse_secs("1.5"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_secs(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_secs("-1"), None);
        assert_eq!(parse_secs("NaN"), None);
        assert_eq!(parse_secs("inf"), None);
        assert_eq!(parse_secs("1e30"), None);
        assert_eq!(parse_secs("soon"), None);
    }

    #[test]
    fn render_timeout_saturates() {
        let config = RunnerConfig {
            render_time_per_mib: Duration::from_secs(u64::MAX / 2),
            ..Default::default()
        };
        assert_eq!(config.render_timeout(u64::MAX), Some(Duration::MAX));
        assert_eq!(config.render_timeout(0), Some(Duration::from_secs(5)));
    }

    #[test]
    fn task_path_format() {
        let config = RunnerConfig::default();
        assert_eq!(config.task_path("webgl_animation"), "/examples/webgl_animation.html");
    }
}
