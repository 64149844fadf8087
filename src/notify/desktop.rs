use std::io::ErrorKind;

use tokio::process::Command;

use super::{Notification, NotificationSink, NotifyError};

pub const DEFAULT_PROGRAM: &str = "notify-send";

/// Hands notifications to the desktop notifier (`notify-send` compatible).
pub struct DesktopSink {
    program: String,
}

impl DesktopSink {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(notification: &Notification) -> Vec<String> {
        let mut args = vec!["--app-name=duebell".to_string()];
        if notification.require_interaction {
            args.push("--urgency=critical".to_string());
        }
        if !notification.sound {
            args.push("--hint=boolean:suppress-sound:true".to_string());
        }
        // Same tag replaces the previous bubble instead of stacking.
        args.push(format!(
            "--hint=string:x-canonical-private-synchronous:{}",
            notification.tag
        ));
        args.push(notification.title.clone());
        args.push(notification.body.clone());
        args
    }
}

#[async_trait::async_trait]
impl NotificationSink for DesktopSink {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let output = Command::new(&self.program)
            .args(Self::args(notification))
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    NotifyError::Unavailable(format!("{} not found", self.program))
                }
                ErrorKind::PermissionDenied => NotifyError::PermissionDenied,
                _ => NotifyError::Failed(e.to_string()),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(NotifyError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }
}
