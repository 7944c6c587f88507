//! Task source: which pieces of content a job runs.

use std::path::{Path, PathBuf};

use crate::config::RunnerConfig;
use crate::error::SourceError;
use crate::job::shard::shard_range;

const CONTENT_EXTENSION: &str = ".html";
const INDEX_PAGE: &str = "index";

/// Explicit task names from the command line, or everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSelection {
    All,
    Named(Vec<String>),
}

impl TaskSelection {
    /// Build a selection from command-line arguments (program name excluded).
    ///
    /// Flags (`-x`, `--flag`) belong to the front end and are skipped; any
    /// remaining argument is a task name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = args
            .into_iter()
            .map(Into::into)
            .filter(|a| !a.is_empty() && !a.starts_with('-'))
            .collect();
        if names.is_empty() {
            Self::All
        } else {
            Self::Named(names)
        }
    }
}

/// Enumerates tasks from a content directory.
#[derive(Debug, Clone)]
pub struct TaskSource {
    dir: PathBuf,
    exceptions: Vec<String>,
    shard: Option<(usize, usize)>,
}

impl TaskSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            exceptions: Vec::new(),
            shard: None,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Result<Self, SourceError> {
        let source = Self::new(config.root.join(&config.content_dir))
            .with_exceptions(config.exceptions.clone());
        match config.source_shard {
            Some((index, count)) => source.with_shard(index, count),
            None => Ok(source),
        }
    }

    /// Never schedule these tasks.
    pub fn with_exceptions(mut self, exceptions: Vec<String>) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Keep only shard `index` of `count` of the enumerated list.
    pub fn with_shard(mut self, index: usize, count: usize) -> Result<Self, SourceError> {
        if count == 0 || index >= count {
            return Err(SourceError::InvalidShard { index, count });
        }
        self.shard = Some((index, count));
        Ok(self)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve the task list for a selection.
    ///
    /// Explicit names are used as given; exceptions and sharding only apply
    /// to enumeration.
    pub async fn tasks(&self, selection: &TaskSelection) -> Result<Vec<String>, SourceError> {
        match selection {
            TaskSelection::Named(names) => Ok(names.clone()),
            TaskSelection::All => self.enumerate().await,
        }
    }

    /// Every `<name>.html` in the content directory except `index.html` and
    /// the exceptions, sorted by name, then narrowed to the configured shard.
    pub async fn enumerate(&self) -> Result<Vec<String>, SourceError> {
        let read_err = |source| SourceError::ReadDir {
            path: self.dir.display().to_string(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_err)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(name) = file_name.strip_suffix(CONTENT_EXTENSION) else {
                continue;
            };
            if name.is_empty() || name == INDEX_PAGE || self.exceptions.iter().any(|e| e == name) {
                continue;
            }
            names.push(name.to_string());
        }
        names.sort();

        if let Some((index, count)) = self.shard {
            let range = shard_range(names.len(), index, count);
            names = names[range].to_vec();
        }

        tracing::debug!(dir = %self.dir.display(), count = names.len(), "Enumerated tasks");
        Ok(names)
    }
}
