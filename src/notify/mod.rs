pub mod console;
pub mod desktop;

use thiserror::Error;

pub const DAILY_SUMMARY_TAG: &str = "daily-summary";
pub const TEST_TAG: &str = "test-notification";

/// A rendered alert handed to the host notification facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Keep the alert on screen until the user dismisses it.
    pub require_interaction: bool,
    /// Host-level replacement key, e.g. `todo-<id>` or `daily-summary`.
    pub tag: String,
    /// Task to open when the alert is clicked.
    pub click_task: Option<String>,
    pub sound: bool,
}

impl Notification {
    pub fn test(sound: bool) -> Self {
        Self {
            title: "🔔 테스트 알림".to_string(),
            body: "알림이 정상적으로 작동합니다!".to_string(),
            require_interaction: false,
            tag: TEST_TAG.to_string(),
            click_task: None,
            sound,
        }
    }
}

pub fn task_tag(task_id: &str) -> String {
    format!("todo-{task_id}")
}

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The user has not allowed notifications on this host.
    #[error("notification permission denied")]
    PermissionDenied,

    /// No notification facility is reachable (e.g. notifier not installed).
    #[error("notifications unavailable: {0}")]
    Unavailable(String),

    #[error("notification failed: {0}")]
    Failed(String),
}

impl NotifyError {
    /// Errors the scheduler swallows without a warning.
    pub fn is_silent(&self) -> bool {
        matches!(self, NotifyError::PermissionDenied | NotifyError::Unavailable(_))
    }
}

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Fans one notification out to every registered sink.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Box<dyn NotificationSink>) {
        tracing::debug!("Notification sink registered: {}", sink.name());
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait::async_trait]
impl NotificationSink for SinkSet {
    fn name(&self) -> &str {
        "sinks"
    }

    /// Every sink gets the notification even if an earlier one fails;
    /// the first error is returned.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(notification).await {
                tracing::debug!("Sink {} failed: {e}", sink.name());
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
