use chrono::{DateTime, NaiveDate, TimeZone};

use crate::notify::{DAILY_SUMMARY_TAG, Notification};
use crate::settings::DigestTime;
use crate::task::Task;

/// Where the digest stands for the current local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestPhase {
    PendingToday,
    FiredToday,
}

/// A digest that fires on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub date: NaiveDate,
    pub at: DigestTime,
    /// Open tasks due on `date`.
    pub open_today: usize,
}

impl Digest {
    pub fn to_notification(&self, sound: bool) -> Notification {
        let (title, body, require_interaction) = if self.open_today == 0 {
            (
                "✨ 오늘의 할 일".to_string(),
                "오늘 예정된 할 일이 없습니다. 좋은 하루 되세요!".to_string(),
                false,
            )
        } else {
            (
                "📋 오늘의 할 일".to_string(),
                format!("{} 기준 오늘 {}개의 할 일이 있습니다.", self.at, self.open_today),
                true,
            )
        };
        Notification {
            title,
            body,
            require_interaction,
            tag: DAILY_SUMMARY_TAG.to_string(),
            click_task: None,
            sound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestOutcome {
    pub digest: Option<Digest>,
    pub last_fired: Option<NaiveDate>,
}

/// Count open tasks whose due date falls on `date` in `tz`.
pub fn count_due_on<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, tz: &Tz) -> usize {
    tasks
        .iter()
        .filter_map(Task::open_due)
        .filter(|due| due.with_timezone(tz).date_naive() == date)
        .count()
}

/// Fire at most once per local calendar day, and only on the exact minute.
pub fn evaluate<Tz: TimeZone>(
    tasks: &[Task],
    digest_time: DigestTime,
    now: &DateTime<Tz>,
    last_fired: Option<NaiveDate>,
) -> DigestOutcome {
    let today = now.date_naive();
    if last_fired == Some(today) || DigestTime::of(now) != digest_time {
        return DigestOutcome {
            digest: None,
            last_fired,
        };
    }

    DigestOutcome {
        digest: Some(Digest {
            date: today,
            at: digest_time,
            open_today: count_due_on(tasks, today, &now.timezone()),
        }),
        last_fired: Some(today),
    }
}

/// Last date the digest fired. Process-lifetime only.
#[derive(Debug, Default)]
pub struct DigestState {
    last_fired: Option<NaiveDate>,
}

impl DigestState {
    pub fn last_fired(&self) -> Option<NaiveDate> {
        self.last_fired
    }

    /// The day boundary is detected by comparing dates, not by a timer.
    pub fn phase<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DigestPhase {
        if self.last_fired == Some(now.date_naive()) {
            DigestPhase::FiredToday
        } else {
            DigestPhase::PendingToday
        }
    }

    pub fn check<Tz: TimeZone>(
        &mut self,
        tasks: &[Task],
        digest_time: DigestTime,
        now: &DateTime<Tz>,
    ) -> Option<Digest> {
        let outcome = evaluate(tasks, digest_time, now, self.last_fired);
        self.last_fired = outcome.last_fired;
        outcome.digest
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, Utc};

    use super::*;
    use crate::task::{Priority, TaskStatus};

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn at(day: u32, h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        kst().with_ymd_and_hms(2026, 10, day, h, m, s).unwrap()
    }

    fn nine_thirty() -> DigestTime {
        DigestTime::new(9, 30).unwrap()
    }

    fn task(id: &str, status: TaskStatus, due: DateTime<FixedOffset>) -> Task {
        Task {
            id: id.into(),
            title: id.into(),
            status,
            priority: Priority::Medium,
            due_date: Some(due.with_timezone(&Utc)),
        }
    }

    #[test]
    fn test_once_per_day() {
        let mut state = DigestState::default();
        assert_eq!(state.phase(&at(16, 9, 30, 0)), DigestPhase::PendingToday);

        assert!(state.check(&[], nine_thirty(), &at(16, 9, 30, 0)).is_some());
        assert_eq!(state.phase(&at(16, 9, 30, 0)), DigestPhase::FiredToday);
        assert!(state.check(&[], nine_thirty(), &at(16, 9, 30, 0)).is_none());
        assert!(state.check(&[], nine_thirty(), &at(16, 9, 30, 50)).is_none());

        assert_eq!(state.phase(&at(17, 0, 0, 0)), DigestPhase::PendingToday);
        let next = state.check(&[], nine_thirty(), &at(17, 9, 30, 0)).unwrap();
        assert_eq!(next.date, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
    }

    #[test]
    fn test_exact_minute_only() {
        let mut state = DigestState::default();
        assert!(state.check(&[], nine_thirty(), &at(16, 9, 29, 59)).is_none());
        assert!(state.check(&[], nine_thirty(), &at(16, 9, 31, 0)).is_none());
        assert_eq!(state.last_fired(), None);
        assert!(state.check(&[], nine_thirty(), &at(16, 9, 30, 59)).is_some());
    }

    #[test]
    fn test_count_open_tasks_due_today() {
        let tasks = vec![
            task("a", TaskStatus::Todo, at(16, 10, 0, 0)),
            task("b", TaskStatus::InProgress, at(16, 18, 0, 0)),
            task("c", TaskStatus::Todo, at(16, 23, 59, 0)),
            task("d", TaskStatus::Completed, at(16, 11, 0, 0)),
            task("e", TaskStatus::Completed, at(16, 12, 0, 0)),
            task("tomorrow", TaskStatus::Todo, at(17, 0, 0, 0)),
            task("yesterday", TaskStatus::Todo, at(15, 23, 59, 0)),
        ];
        let out = evaluate(&tasks, nine_thirty(), &at(16, 9, 30, 0), None);
        let digest = out.digest.unwrap();
        assert_eq!(digest.open_today, 3);
        assert_eq!(
            digest.to_notification(false).body,
            "09:30 기준 오늘 3개의 할 일이 있습니다."
        );
    }

    #[test]
    fn test_calendar_day_is_local() {
        // 2026-10-16 00:30 KST is still 10-15 in UTC.
        let due = at(16, 0, 30, 0);
        let tasks = vec![task("early", TaskStatus::Todo, due)];
        assert_eq!(due.with_timezone(&Utc).date_naive().to_string(), "2026-10-15");
        let out = evaluate(&tasks, nine_thirty(), &at(16, 9, 30, 0), None);
        assert_eq!(out.digest.unwrap().open_today, 1);
    }

    #[test]
    fn test_empty_day_message() {
        let out = evaluate(&[], nine_thirty(), &at(16, 9, 30, 0), None);
        let n = out.digest.unwrap().to_notification(true);
        assert_eq!(n.title, "✨ 오늘의 할 일");
        assert!(!n.require_interaction);
        assert_eq!(n.tag, DAILY_SUMMARY_TAG);
        assert!(n.click_task.is_none());
    }

    #[test]
    fn test_outcome_keeps_last_fired_when_not_firing() {
        let yesterday = (at(16, 9, 30, 0) - Duration::days(1)).date_naive();
        let out = evaluate(&[], nine_thirty(), &at(16, 8, 0, 0), Some(yesterday));
        assert!(out.digest.is_none());
        assert_eq!(out.last_fired, Some(yesterday));
    }
}
