//! Remote event types.
//!
//! These mirror the shape of a VEVENT as served by the Nextcloud CalDAV
//! endpoint. They are read-only for the duration of a sync pass: the
//! reconciler turns them into local [`CalendarEvent`](crate::store::CalendarEvent)
//! records and never writes them back.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event as reported by the remote server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// Stable remote identifier (the VEVENT UID)
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: EventStatus,
    pub start: EventTime,
    pub end: EventTime,
    /// RRULE lines, e.g. `RRULE:FREQ=WEEKLY;BYDAY=MO,TU,TH`.
    /// Only the first entry is honored.
    pub recurrence: Option<Vec<String>>,
}

impl RemoteEvent {
    /// The recurrence line that drives the local repeat schedule.
    ///
    /// An absent or empty list yields `None`.
    pub fn recurrence_line(&self) -> Option<&str> {
        self.recurrence
            .as_ref()
            .and_then(|lines| lines.first())
            .map(String::as_str)
    }
}

impl fmt::Display for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    /// Wall-clock time with no zone attached
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl EventTime {
    pub fn is_date_only(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Normalize to UTC.
    ///
    /// Dates become midnight UTC. Floating times and zoned times whose TZID is
    /// not in the IANA database are read as UTC. A zoned time inside a DST gap
    /// is shifted forward an hour.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(dt) => dt.and_utc(),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<chrono_tz::Tz>() {
                Ok(tz) => zoned_to_utc(&tz, datetime).unwrap_or_else(|| {
                    tracing::warn!(%tzid, %datetime, "unresolvable local time, reading as UTC");
                    datetime.and_utc()
                }),
                Err(_) => {
                    tracing::warn!(tzid = %tzid, "unknown timezone, reading as UTC");
                    datetime.and_utc()
                }
            },
        }
    }
}

/// Resolve a wall-clock time in `tz`. A time skipped by a DST transition is
/// moved forward by the length of the gap, as clocks do.
fn zoned_to_utc(tz: &chrono_tz::Tz, datetime: &NaiveDateTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(datetime).earliest() {
        return Some(dt.with_timezone(&Utc));
    }
    tracing::warn!(tz = %tz.name(), %datetime, "local time falls in a DST gap, shifting forward");
    tz.from_local_datetime(&(*datetime + Duration::hours(1)))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}
