//! Console diagnostics emitted by executing content.
//!
//! Raw console arguments are normalised into one line prefixed with the task
//! name. Warnings are logged once per distinct line per job. Errors are
//! always handed back so the pool can latch them on the current assignment,
//! including when a retried task repeats an error seen on an earlier attempt.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use crate::engine::DiagnosticLevel;

static WEBGL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\.WebGL-(.+?)\] ").unwrap());

/// Turn console arguments into a report line, or `None` if there is nothing to report.
pub fn normalize(task: &str, args: &[String]) -> Option<String> {
    let text = args.join(" ");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let text = WEBGL_PREFIX.replace_all(text, "");
    if text == "JSHandle@error" {
        return Some(format!("{task}: Unknown error"));
    }
    Some(format!("{task}: {text}"))
}

/// Job-wide filter over diagnostic lines.
pub struct DiagnosticFilter {
    ignored: Vec<String>,
    seen: Mutex<HashSet<String>>,
}

impl DiagnosticFilter {
    pub fn new(ignored: Vec<String>) -> Self {
        Self {
            ignored,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Classify one console message for `task`.
    ///
    /// Returns the line to latch as the task's error, if any. Warnings are
    /// logged here, at most once per line, and never latched.
    pub fn observe(&self, task: &str, level: DiagnosticLevel, args: &[String]) -> Option<String> {
        let line = normalize(task, args)?;

        if self.ignored.iter().any(|pattern| line.contains(pattern.as_str())) {
            return None;
        }

        let first_seen = self
            .seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(line.clone());

        match level {
            DiagnosticLevel::Warning => {
                if first_seen {
                    tracing::warn!(task = %task, "{}", line);
                }
                None
            }
            DiagnosticLevel::Error => {
                if !first_seen {
                    tracing::debug!(task = %task, "Repeated error: {}", line);
                }
                Some(line)
            }
        }
    }
}
