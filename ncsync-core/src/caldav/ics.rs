//! Calendar data (ICS) to [`RemoteEvent`] conversion using the icalendar
//! crate's parser.

use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};

use crate::error::{SyncError, SyncResult};
use crate::event::{EventStatus, EventTime, RemoteEvent};

/// Parse one calendar object resource.
///
/// A resource may carry the master VEVENT plus RECURRENCE-ID overrides; the
/// master is used.
pub fn parse_event(content: &str) -> SyncResult<RemoteEvent> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| SyncError::IcsParse(e.to_string()))?;

    let vevents: Vec<&Component> = calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .collect();

    let vevent = vevents
        .iter()
        .find(|c| c.find_prop("RECURRENCE-ID").is_none())
        .or_else(|| vevents.first())
        .ok_or_else(|| SyncError::IcsParse("no VEVENT in calendar data".into()))?;

    let id = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .ok_or_else(|| SyncError::IcsParse("VEVENT without UID".into()))?;

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape(p.val.as_ref()))
        .unwrap_or_default();
    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape(p.val.as_ref()));

    // Nextcloud leaves STATUS out for ordinary events
    let status = vevent
        .find_prop("STATUS")
        .map(|p| match p.val.as_ref() {
            "TENTATIVE" => EventStatus::Tentative,
            "CANCELLED" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        })
        .unwrap_or(EventStatus::Confirmed);

    let start = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .ok_or_else(|| SyncError::IcsParse(format!("event '{id}' has no usable DTSTART")))?;

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .unwrap_or_else(|| start.clone());

    let rrules: Vec<String> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "RRULE")
        .map(|p| format!("RRULE:{}", p.val.as_ref()))
        .collect();
    let recurrence = (!rrules.is_empty()).then_some(rrules);

    Ok(RemoteEvent {
        id,
        summary,
        description,
        status,
        start,
        end,
        recurrence,
    })
}

fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => EventTime::DateTimeZoned {
                datetime: date_time,
                tzid,
            },
        },
    }
}

/// Undo TEXT value escaping (RFC 5545 3.3.11).
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
