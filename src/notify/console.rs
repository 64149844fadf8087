use std::io::Write;

use super::{Notification, NotificationSink, NotifyError};

/// Prints notifications to stdout. Always available.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn render(notification: &Notification) -> String {
        let bell = if notification.sound { "\x07" } else { "" };
        let pin = if notification.require_interaction { " [!]" } else { "" };
        format!("{bell}\n{}{pin}\n{}\n", notification.title, notification.body)
    }

    /// A closed stdout (e.g. `duebell run | head`) is a delivery failure,
    /// never a panic.
    fn write_to(out: &mut impl Write, notification: &Notification) -> Result<(), NotifyError> {
        writeln!(out, "{}", Self::render(notification))
            .and_then(|()| out.flush())
            .map_err(|e| NotifyError::Failed(format!("stdout: {e}")))
    }
}

#[async_trait::async_trait]
impl NotificationSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        Self::write_to(&mut std::io::stdout().lock(), notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bell_only_with_sound() {
        let mut n = Notification::test(true);
        assert!(ConsoleSink::render(&n).starts_with('\x07'));
        n.sound = false;
        let out = ConsoleSink::render(&n);
        assert!(!out.contains('\x07'));
        assert!(out.contains("🔔 테스트 알림"));
    }

    #[test]
    fn test_render_marks_sticky_alerts() {
        let mut n = Notification::test(false);
        n.require_interaction = true;
        assert!(ConsoleSink::render(&n).contains("[!]"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_closed_stdout_is_a_failure() {
        let err = ConsoleSink::write_to(&mut ClosedPipe, &Notification::test(false)).unwrap_err();
        assert!(matches!(err, NotifyError::Failed(_)));
        assert!(!err.is_silent());

        let mut buf = Vec::new();
        ConsoleSink::write_to(&mut buf, &Notification::test(false)).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("알림이 정상적으로 작동합니다!"));
    }
}
