use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

use crate::config;
use crate::settings::NotificationSettings;
use crate::task::Task;

/// Snapshot accessor for the current task list.
pub trait TaskSource: Send + Sync {
    fn tasks(&self) -> Vec<Task>;
}

/// Snapshot accessor for the current notification settings.
pub trait SettingsSource: Send + Sync {
    fn settings(&self) -> NotificationSettings;
}

impl<F> TaskSource for F
where
    F: Fn() -> Vec<Task> + Send + Sync,
{
    fn tasks(&self) -> Vec<Task> {
        self()
    }
}

impl<F> SettingsSource for F
where
    F: Fn() -> NotificationSettings + Send + Sync,
{
    fn settings(&self) -> NotificationSettings {
        self()
    }
}

/// JSON task store written by the task application, re-read on every call.
///
/// A failed read keeps serving the last good snapshot: an empty list would
/// make the ledger forget every fired reminder.
pub struct TaskFile {
    path: PathBuf,
    last_good: Mutex<Vec<Task>>,
}

impl TaskFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_good: Mutex::new(Vec::new()),
        }
    }

    pub fn load(&self) -> Result<Vec<Task>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read tasks: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tasks: {}", self.path.display()))
    }
}

impl TaskSource for TaskFile {
    fn tasks(&self) -> Vec<Task> {
        let mut last_good = self.last_good.lock().unwrap_or_else(|e| e.into_inner());
        match self.load() {
            Ok(tasks) => {
                *last_good = tasks.clone();
                tasks
            }
            Err(e) if is_missing(&e) => {
                tracing::debug!("{e:#}; using last known task list");
                last_good.clone()
            }
            Err(e) => {
                tracing::warn!("{e:#}; using last known task list");
                last_good.clone()
            }
        }
    }
}

/// No task file yet; the task application has not saved anything.
fn is_missing(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}

/// The `[notifications]` table of the config file, re-read on every call so
/// edits apply without a restart.
pub struct ConfigSettings {
    path: String,
    last_good: Mutex<NotificationSettings>,
}

impl ConfigSettings {
    pub fn new(path: impl Into<String>, initial: NotificationSettings) -> Self {
        Self {
            path: path.into(),
            last_good: Mutex::new(initial),
        }
    }
}

impl SettingsSource for ConfigSettings {
    fn settings(&self) -> NotificationSettings {
        let mut last_good = self.last_good.lock().unwrap_or_else(|e| e.into_inner());
        match config::load(&self.path) {
            Ok(cfg) => {
                *last_good = cfg.notifications.clone();
                cfg.notifications
            }
            Err(e) => {
                tracing::warn!("{e:#}; using last known notification settings");
                last_good.clone()
            }
        }
    }
}
