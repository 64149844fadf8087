//! Deadline reminders and a daily digest for a small team's task list.
//!
//! The [`scheduler::Scheduler`] wakes every minute, reads a task snapshot
//! and the notification settings, and hands due notifications to a
//! [`notify::NotificationSink`]. Reminders fire at most once per
//! (task, lead time) pair; the digest fires at most once per local day.

pub mod config;
pub mod digest;
pub mod ledger;
pub mod notify;
pub mod reminder;
pub mod scheduler;
pub mod settings;
pub mod source;
pub mod task;
