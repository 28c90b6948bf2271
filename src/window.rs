//! Nightly time window filter.
//!
//! Events carry UTC timestamps; membership is decided on the wall clock of the
//! configured zone, using that zone's offset at the event's own instant so
//! that daylight-saving transitions are honoured.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::ring::HistoryEvent;

const WINDOW_STEP_MINUTES: u16 = 15;

#[derive(Debug, Error)]
#[error("Failed to load time zone '{name}': {reason}")]
pub struct TimezoneLoadError {
    pub name: String,
    reason: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    #[error("Time '{0}' is not on a 15-minute boundary")]
    NotOnStep(String),

    #[error("Window start and end are both {0}; the window would be empty")]
    Empty(MinuteOfDay),
}

/// Civil time zone used to interpret event timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Named(Tz),
    SystemLocal,
}

impl Zone {
    /// Look up an IANA zone name. `local` selects the system zone.
    pub fn named(name: &str) -> Result<Self, TimezoneLoadError> {
        if name.eq_ignore_ascii_case("local") {
            return Ok(Zone::SystemLocal);
        }
        name.parse::<Tz>()
            .map(Zone::Named)
            .map_err(|e| TimezoneLoadError {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Like [`Zone::named`], but degrades to system local time with a warning.
    pub fn resolve(name: &str) -> Self {
        match Self::named(name) {
            Ok(zone) => zone,
            Err(e) => {
                tracing::warn!("{}; falling back to system time zone", e);
                Zone::SystemLocal
            }
        }
    }

    pub fn localize(&self, ts: &DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Zone::Named(tz) => ts.with_timezone(tz).fixed_offset(),
            Zone::SystemLocal => ts.with_timezone(&Local).fixed_offset(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Zone::Named(tz) => tz.name(),
            Zone::SystemLocal => "system local time",
        }
    }
}

/// Wall-clock time truncated to the minute, `0..1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self(hour * 60 + minute))
    }

    pub fn of<T: Timelike>(time: &T) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl FromStr for MinuteOfDay {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WindowError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        let parsed = Self::from_hm(hour, minute).ok_or_else(invalid)?;
        if parsed.0 % WINDOW_STEP_MINUTES != 0 {
            return Err(WindowError::NotOnStep(s.to_string()));
        }
        Ok(parsed)
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Half-open `[start, end)` interval of the day. A start later than the end
/// wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: MinuteOfDay,
    end: MinuteOfDay,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            start: MinuteOfDay(0),
            end: MinuteOfDay(5 * 60 + 30),
        }
    }
}

impl TimeWindow {
    pub fn new(start: MinuteOfDay, end: MinuteOfDay) -> Result<Self, WindowError> {
        if start == end {
            return Err(WindowError::Empty(start));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, minute: MinuteOfDay) -> bool {
        if self.start < self.end {
            self.start <= minute && minute < self.end
        } else {
            minute >= self.start || minute < self.end
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "between {} and {}", self.start, self.end)
    }
}

/// Whether the event happened inside `window` on `zone`'s wall clock.
pub fn is_in_window(event: &HistoryEvent, zone: &Zone, window: &TimeWindow) -> bool {
    let local = zone.localize(&event.created_at);
    window.contains(MinuteOfDay::of(&local))
}
