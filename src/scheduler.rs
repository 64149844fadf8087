use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::digest::DigestState;
use crate::ledger::FiredLedger;
use crate::notify::{Notification, NotificationSink};
use crate::reminder;
use crate::source::{SettingsSource, TaskSource};

/// Polling period. Reminder tolerance (±1 min) assumes ticks no further apart.
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Notifications were disabled for this tick.
    pub disabled: bool,
    pub reminders: usize,
    pub digest: bool,
    pub pruned: usize,
    pub delivered: usize,
    /// Sink unavailable or permission missing.
    pub suppressed: usize,
    pub failed: usize,
}

/// Notifications decided on one tick, in delivery order.
#[derive(Debug, Default)]
pub struct TickPlan {
    pub notifications: Vec<Notification>,
    pub report: TickReport,
}

/// Everything the scheduler remembers between ticks.
#[derive(Debug, Default)]
pub struct SchedulerState {
    pub ledger: FiredLedger,
    pub digest: DigestState,
}

impl SchedulerState {
    /// Evaluate one tick at `now`. Reminders come before the digest.
    pub fn plan<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
        tasks: &dyn TaskSource,
        settings: &dyn SettingsSource,
    ) -> TickPlan {
        let settings = settings.settings();
        if !settings.enabled {
            return TickPlan {
                report: TickReport {
                    disabled: true,
                    ..Default::default()
                },
                ..Default::default()
            };
        }

        let tasks = tasks.tasks();
        let now_utc = now.with_timezone(&Utc);
        let leads: Vec<u32> = settings.active_lead_minutes().collect();
        let mut plan = TickPlan::default();

        for event in reminder::evaluate(&tasks, &leads, now_utc, &mut self.ledger) {
            tracing::info!(
                task_id = %event.key.task_id,
                lead_minutes = event.key.lead_minutes,
                minutes_until_due = event.minutes_until_due,
                "Reminder due: {}",
                event.title
            );
            plan.notifications
                .push(event.to_notification(settings.sound_enabled));
            plan.report.reminders += 1;
        }

        plan.report.pruned = self.ledger.prune(&tasks, now_utc);
        if plan.report.pruned > 0 {
            tracing::debug!(
                "Pruned {} reminder keys ({} kept)",
                plan.report.pruned,
                self.ledger.len()
            );
        }

        if let Some(at) = settings.digest_rule()
            && let Some(digest) = self.digest.check(&tasks, at, now)
        {
            tracing::info!("Daily digest: {} open tasks due today", digest.open_today);
            plan.notifications
                .push(digest.to_notification(settings.sound_enabled));
            plan.report.digest = true;
        }

        plan
    }

    pub fn reset(&mut self) {
        self.ledger.clear();
        self.digest.reset();
    }
}

/// Hand every planned notification to the sink. One failed delivery never
/// stops the rest; the ledger was already updated while planning.
pub async fn deliver(sink: &dyn NotificationSink, plan: &mut TickPlan) {
    for notification in &plan.notifications {
        match sink.notify(notification).await {
            Ok(()) => plan.report.delivered += 1,
            Err(e) if e.is_silent() => {
                tracing::debug!(tag = %notification.tag, "Notification skipped: {e}");
                plan.report.suppressed += 1;
            }
            Err(e) => {
                tracing::warn!(tag = %notification.tag, "Notification failed: {e}");
                plan.report.failed += 1;
            }
        }
    }
}

struct HandleInner {
    stopped: AtomicBool,
    state: Arc<Mutex<SchedulerState>>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running tick loop. Clones share the same loop.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<HandleInner>,
}

impl SchedulerHandle {
    /// False once stopped, or once the loop task has exited on its own
    /// (a sink panicked).
    pub fn is_running(&self) -> bool {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return false;
        }
        self.inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn same_loop(&self, other: &SchedulerHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Cancel the tick loop. Safe to call more than once. Once this returns
    /// no tick is in progress and none will start.
    pub async fn stop(&self) {
        // Ticks check `stopped` under the same lock.
        let _state = self.inner.state.lock().await;
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
        tracing::info!("Notification scheduler stopped");
    }
}

/// Periodically evaluates reminder rules and the daily digest.
pub struct Scheduler {
    state: Arc<Mutex<SchedulerState>>,
    handle: Option<SchedulerHandle>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState::default())),
            handle: None,
        }
    }

    /// Spawn the tick loop. If it is already running the existing handle is
    /// returned and no second loop is created. A loop that died is replaced.
    pub fn start(
        &mut self,
        tasks: Arc<dyn TaskSource>,
        settings: Arc<dyn SettingsSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> SchedulerHandle {
        if let Some(handle) = &self.handle
            && handle.is_running()
        {
            tracing::debug!("Notification scheduler already running");
            return handle.clone();
        }
        if let Some(dead) = self.handle.take()
            && !dead.inner.stopped.load(Ordering::SeqCst)
        {
            tracing::warn!("Notification scheduler loop exited; restarting");
        }

        let inner = Arc::new(HandleInner {
            stopped: AtomicBool::new(false),
            state: self.state.clone(),
            task: std::sync::Mutex::new(None),
        });
        let period = TICK_INTERVAL;
        let loop_inner = inner.clone();

        let task = tokio::spawn(async move {
            // First evaluation one full period after start.
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut state = loop_inner.state.lock().await;
                if loop_inner.stopped.load(Ordering::SeqCst) {
                    break;
                }
                let mut plan = state.plan(&Local::now(), tasks.as_ref(), settings.as_ref());
                deliver(sink.as_ref(), &mut plan).await;
                if !plan.report.disabled {
                    tracing::debug!(report = ?plan.report, "Tick complete");
                }
            }
        });
        *inner.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);

        tracing::info!(
            "Notification scheduler started (every {}s)",
            period.as_secs()
        );
        let handle = SchedulerHandle { inner };
        self.handle = Some(handle.clone());
        handle
    }

    /// Stop the running loop, if any. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop().await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(SchedulerHandle::is_running)
    }

    /// Forget every fired reminder and the last digest date.
    pub async fn reset_history(&self) {
        self.state.lock().await.reset();
        tracing::info!("Notification history cleared");
    }

    /// Run one tick immediately at `now`, outside the timer loop.
    pub async fn tick_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        tasks: &dyn TaskSource,
        settings: &dyn SettingsSource,
        sink: &dyn NotificationSink,
    ) -> TickReport {
        let mut state = self.state.lock().await;
        let mut plan = state.plan(now, tasks, settings);
        deliver(sink, &mut plan).await;
        plan.report
    }
}
