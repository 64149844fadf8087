use chrono::{DateTime, Utc};

use crate::ledger::{FiredLedger, ReminderKey};
use crate::notify::{Notification, task_tag};
use crate::task::{Priority, Task};

/// Ticks can land up to this many minutes away from the target and still fire.
/// Must stay co-designed with the scheduler's tick interval.
pub const TOLERANCE_MINUTES: i64 = 1;

/// A lead-time reminder that is due on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub key: ReminderKey,
    pub title: String,
    pub priority: Priority,
    pub minutes_until_due: i64,
}

impl ReminderEvent {
    pub fn message(&self) -> String {
        if self.minutes_until_due <= 0 {
            "마감 시간이 지났습니다!".to_string()
        } else {
            format!("{} 후 마감됩니다!", format_remaining(self.minutes_until_due))
        }
    }

    pub fn to_notification(&self, sound: bool) -> Notification {
        Notification {
            title: format!("{} {}", self.priority.marker(), self.title),
            body: self.message(),
            require_interaction: self.priority == Priority::Urgent,
            tag: task_tag(&self.key.task_id),
            click_task: Some(self.key.task_id.clone()),
            sound,
        }
    }
}

/// Whole minutes from `now` until `due`, rounded toward negative infinity.
pub fn minutes_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due - now).num_milliseconds().div_euclid(60_000)
}

/// `45분`, `2시간`, `2시간 30분`.
pub fn format_remaining(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{minutes}분");
    }
    let (hours, rest) = (minutes / 60, minutes % 60);
    if rest == 0 {
        format!("{hours}시간")
    } else {
        format!("{hours}시간 {rest}분")
    }
}

/// Find every (task, lead time) pair inside its firing window that has not
/// fired yet, and record it in the ledger. Completed and undated tasks
/// never produce events.
pub fn evaluate(
    tasks: &[Task],
    lead_minutes: &[u32],
    now: DateTime<Utc>,
    ledger: &mut FiredLedger,
) -> Vec<ReminderEvent> {
    let mut events = Vec::new();
    for task in tasks {
        let Some(due) = task.open_due() else {
            continue;
        };
        let remaining = minutes_until(due, now);

        for &lead in lead_minutes {
            if (remaining - i64::from(lead)).abs() > TOLERANCE_MINUTES {
                continue;
            }
            let key = ReminderKey::new(task.id.clone(), lead);
            if !ledger.insert(key.clone()) {
                continue;
            }
            events.push(ReminderEvent {
                key,
                title: task.title.clone(),
                priority: task.priority,
                minutes_until_due: remaining,
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::task::TaskStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    fn task(id: &str, due: DateTime<Utc>) -> Task {
        Task {
            id: id.into(),
            title: format!("task {id}"),
            status: TaskStatus::Todo,
            priority: Priority::High,
            due_date: Some(due),
        }
    }

    #[test]
    fn test_tolerance_window() {
        for (offset, fires) in [(28, false), (29, true), (30, true), (31, true), (32, false)] {
            let mut ledger = FiredLedger::new();
            let tasks = vec![task("a", now() + Duration::minutes(offset))];
            let events = evaluate(&tasks, &[30], now(), &mut ledger);
            assert_eq!(!events.is_empty(), fires, "offset {offset}");
        }
    }

    #[test]
    fn test_fires_once_across_ticks() {
        let due = now() + Duration::minutes(30);
        let tasks = vec![task("a", due)];
        let mut ledger = FiredLedger::new();

        let first = evaluate(&tasks, &[30], now(), &mut ledger);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].key, ReminderKey::new("a", 30));
        assert_eq!(first[0].minutes_until_due, 30);

        // Still inside the window on every later tick.
        for tick in 1..=3 {
            let later = now() + Duration::seconds(20 * tick);
            assert_eq!(minutes_until(due, later), 29);
            assert!(evaluate(&tasks, &[30], later, &mut ledger).is_empty());
        }
    }

    #[test]
    fn test_completed_and_undated_never_fire() {
        let mut done = task("done", now() + Duration::minutes(30));
        done.status = TaskStatus::Completed;
        let mut undated = task("undated", now());
        undated.due_date = None;

        let mut ledger = FiredLedger::new();
        let events = evaluate(&[done, undated], &[30, 1, 60], now(), &mut ledger);
        assert!(events.is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_each_lead_time_is_separate() {
        let tasks = vec![task("a", now() + Duration::minutes(60))];
        let mut ledger = FiredLedger::new();
        let events = evaluate(&tasks, &[30, 60, 61], now(), &mut ledger);
        let leads: Vec<u32> = events.iter().map(|e| e.key.lead_minutes).collect();
        assert_eq!(leads, vec![60, 61]);
    }

    #[test]
    fn test_empty_lead_set_yields_nothing() {
        let tasks = vec![task("a", now() + Duration::minutes(30))];
        let mut ledger = FiredLedger::new();
        assert!(evaluate(&tasks, &[], now(), &mut ledger).is_empty());
    }

    #[test]
    fn test_minutes_until_floors() {
        let n = now();
        assert_eq!(minutes_until(n + Duration::seconds(119), n), 1);
        assert_eq!(minutes_until(n + Duration::seconds(59), n), 0);
        assert_eq!(minutes_until(n - Duration::seconds(1), n), -1);
    }

    #[test]
    fn test_messages() {
        assert_eq!(format_remaining(45), "45분");
        assert_eq!(format_remaining(120), "2시간");
        assert_eq!(format_remaining(150), "2시간 30분");
        assert_eq!(format_remaining(1440), "24시간");

        let mut event = ReminderEvent {
            key: ReminderKey::new("a", 1),
            title: "필러 재고 확인".into(),
            priority: Priority::Urgent,
            minutes_until_due: 0,
        };
        assert_eq!(event.message(), "마감 시간이 지났습니다!");
        event.minutes_until_due = 90;
        assert_eq!(event.message(), "1시간 30분 후 마감됩니다!");

        let n = event.to_notification(true);
        assert_eq!(n.title, "🔴 필러 재고 확인");
        assert_eq!(n.tag, "todo-a");
        assert_eq!(n.click_task.as_deref(), Some("a"));
        assert!(n.require_interaction);
    }
}
