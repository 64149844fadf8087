use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// Snapshot of the user's notification preferences, read once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Minutes before the due time at which a reminder fires.
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: BTreeSet<u32>,
    #[serde(default = "default_true")]
    pub digest_enabled: bool,
    /// Local time of the daily digest, `HH:MM`. Kept raw so a bad value
    /// only disables the digest instead of failing the whole snapshot.
    #[serde(default = "default_digest_time")]
    pub digest_time: String,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            lead_minutes: default_lead_minutes(),
            digest_enabled: true,
            digest_time: default_digest_time(),
            sound_enabled: true,
        }
    }
}

fn default_lead_minutes() -> BTreeSet<u32> {
    BTreeSet::from([30, 60, 1440])
}

fn default_digest_time() -> String {
    "09:30".to_string()
}

fn default_true() -> bool {
    true
}

impl NotificationSettings {
    /// Lead times that can actually fire. Zero is not a lead time.
    pub fn active_lead_minutes(&self) -> impl Iterator<Item = u32> + '_ {
        self.lead_minutes.iter().copied().filter(|m| *m > 0)
    }

    /// The configured digest time, if the digest is on and the value parses.
    pub fn digest_rule(&self) -> Option<DigestTime> {
        if !self.digest_enabled {
            return None;
        }
        match self.digest_time.parse() {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::debug!("Daily digest skipped: {e}");
                None
            }
        }
    }
}

/// A local time-of-day with minute granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestTime {
    hour: u32,
    minute: u32,
}

impl DigestTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Time-of-day of `now` in its own timezone, truncated to the minute.
    pub fn of<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            hour: now.hour(),
            minute: now.minute(),
        }
    }
}

impl fmt::Display for DigestTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Accepts `HH:MM` plus a single-digit hour (`7:05`) and surrounding
/// whitespace, so hand-edited config files still match at 07:05.
impl FromStr for DigestTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid digest time '{s}': expected HH:MM"))?;
        let hour: u32 = h
            .parse()
            .map_err(|_| format!("invalid digest hour in '{s}'"))?;
        let minute: u32 = m
            .parse()
            .map_err(|_| format!("invalid digest minute in '{s}'"))?;
        Self::new(hour, minute).ok_or_else(|| format!("digest time '{s}' is out of range"))
    }
}
