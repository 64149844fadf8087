use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::task::Task;

/// One reminder instance: a task and a lead time in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    pub task_id: String,
    pub lead_minutes: u32,
}

impl ReminderKey {
    pub fn new(task_id: impl Into<String>, lead_minutes: u32) -> Self {
        Self {
            task_id: task_id.into(),
            lead_minutes,
        }
    }
}

/// Reminders that have already fired. Process-lifetime only.
#[derive(Debug, Default)]
pub struct FiredLedger {
    keys: HashSet<ReminderKey>,
}

impl FiredLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the key was already present.
    pub fn insert(&mut self, key: ReminderKey) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, key: &ReminderKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Drop keys that can no longer suppress anything: the task is gone,
    /// completed, undated, or its due time is not in the future.
    /// Returns the number of keys removed.
    pub fn prune(&mut self, tasks: &[Task], now: DateTime<Utc>) -> usize {
        let pending: HashMap<&str, DateTime<Utc>> = tasks
            .iter()
            .filter_map(|t| t.open_due().map(|due| (t.id.as_str(), due)))
            .collect();

        let before = self.keys.len();
        self.keys
            .retain(|k| pending.get(k.task_id.as_str()).is_some_and(|due| *due > now));
        before - self.keys.len()
    }
}
