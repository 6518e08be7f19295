//! Apply a remote event list to the local store.
//!
//! Each remote event is classified on its own: confirmed events are inserted
//! or overwritten, cancelled events close their local counterpart, anything
//! else is skipped. Every write goes straight to the store, so a failure part
//! way through leaves the earlier events applied.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::event::{EventStatus, RemoteEvent};
use crate::schedule::RepeatSchedule;
use crate::store::{CalendarEvent, EventStore};

/// Note left on a local event when its remote counterpart is cancelled.
pub const CANCELLED_NOTE: &str = "Event deleted from Nextcloud Calendar.";

/// Progress update emitted after each processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub progress: usize,
    pub total: usize,
}

/// Receiver for [`SyncProgress`] updates.
pub trait ProgressSink {
    fn report(&mut self, update: SyncProgress);
}

impl<F: FnMut(SyncProgress)> ProgressSink for F {
    fn report(&mut self, update: SyncProgress) {
        self(update)
    }
}

/// Discards progress updates.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _update: SyncProgress) {}
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Number of remote events received
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub closed: usize,
    pub skipped: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            0 => write!(f, "No Nextcloud Calendar Event to sync."),
            1 => write!(f, "1 Nextcloud Calendar Event synced."),
            n => write!(f, "{n} Nextcloud Calendar Events synced."),
        }
    }
}

/// Reconciles one remote calendar into a local store.
pub struct Reconciler<'a> {
    /// Local account name
    pub account: &'a str,
    /// Remote calendar identity (collection href)
    pub calendar_id: &'a str,
    /// Anchor for monthly ordinal rules
    pub now: DateTime<Utc>,
}

impl<'a> Reconciler<'a> {
    pub fn new(account: &'a str, calendar_id: &'a str, now: DateTime<Utc>) -> Self {
        Reconciler {
            account,
            calendar_id,
            now,
        }
    }

    pub fn reconcile<S, P>(
        &self,
        events: &[RemoteEvent],
        store: &mut S,
        progress: &mut P,
    ) -> SyncResult<SyncSummary>
    where
        S: EventStore,
        P: ProgressSink + ?Sized,
    {
        let total = events.len();
        let mut summary = SyncSummary {
            total,
            ..SyncSummary::default()
        };

        for (idx, event) in events.iter().enumerate() {
            progress.report(SyncProgress {
                progress: idx + 1,
                total,
            });

            match event.status {
                EventStatus::Confirmed => {
                    if self.upsert(event, store)? {
                        summary.created += 1;
                    } else {
                        summary.updated += 1;
                    }
                }
                EventStatus::Cancelled => {
                    if self.close(event, store)? {
                        summary.closed += 1;
                    } else {
                        summary.skipped += 1;
                    }
                }
                EventStatus::Tentative => {
                    tracing::debug!(event_id = %event.id, "skipping tentative event");
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            account = self.account,
            total = summary.total,
            created = summary.created,
            updated = summary.updated,
            closed = summary.closed,
            "reconciled calendar"
        );

        Ok(summary)
    }

    /// Insert or overwrite. Returns true when a new record was created.
    fn upsert<S: EventStore>(&self, event: &RemoteEvent, store: &mut S) -> SyncResult<bool> {
        let schedule = RepeatSchedule::from_remote(
            event.recurrence_line(),
            &event.start,
            &event.end,
            self.now,
        );

        match store.find_by_event_id(&event.id)? {
            None => {
                tracing::debug!(
                    event_id = %event.id,
                    summary = %event.summary,
                    "creating local event"
                );
                let local =
                    CalendarEvent::from_remote(self.account, self.calendar_id, event, schedule);
                store.insert(local)?;
                Ok(true)
            }
            Some(mut local) => {
                tracing::debug!(event_id = %event.id, name = %local.name, "updating local event");
                local.apply_remote(event, schedule);
                store.save(&local)?;
                Ok(false)
            }
        }
    }

    /// Close the local counterpart of a cancelled event. Returns true when a
    /// record changed; a missing or already closed record is left alone.
    fn close<S: EventStore>(&self, event: &RemoteEvent, store: &mut S) -> SyncResult<bool> {
        let Some(mut local) = store.find(self.calendar_id, &event.id)? else {
            tracing::debug!(event_id = %event.id, "cancelled event has no local record");
            return Ok(false);
        };

        if local.is_closed() {
            return Ok(false);
        }

        local.close(CANCELLED_NOTE);
        store.save(&local)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::event::EventTime;
    use crate::recurrence::Frequency;
    use crate::store::{LocalStatus, MemoryStore};
    use chrono::NaiveDate;

    const CALENDAR_ID: &str = "/remote.php/dav/calendars/alice/personal/";

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn event(id: &str, summary: &str, status: EventStatus, rrule: Option<&str>) -> RemoteEvent {
        let start = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc();
        RemoteEvent {
            id: id.to_string(),
            summary: summary.to_string(),
            description: Some(format!("{summary} description")),
            status,
            start: EventTime::DateTimeUtc(start),
            end: EventTime::DateTimeUtc(start + chrono::Duration::hours(1)),
            recurrence: rrule.map(|r| vec![r.to_string()]),
        }
    }

    fn reconciler() -> Reconciler<'static> {
        Reconciler::new("personal", CALENDAR_ID, now())
    }

    #[test]
    fn test_summary_messages() {
        let mut store = MemoryStore::new();

        let summary = reconciler().reconcile(&[], &mut store, &mut NoProgress).unwrap();
        assert_eq!(summary.to_string(), "No Nextcloud Calendar Event to sync.");

        let one = [event("a", "A", EventStatus::Confirmed, None)];
        let summary = reconciler().reconcile(&one, &mut store, &mut NoProgress).unwrap();
        assert_eq!(summary.to_string(), "1 Nextcloud Calendar Event synced.");

        let three = [
            event("b", "B", EventStatus::Confirmed, None),
            event("c", "C", EventStatus::Confirmed, None),
            event("d", "D", EventStatus::Confirmed, None),
        ];
        let summary = reconciler().reconcile(&three, &mut store, &mut NoProgress).unwrap();
        assert_eq!(summary.to_string(), "3 Nextcloud Calendar Events synced.");
    }

    #[test]
    fn test_insert_then_update_keeps_one_record() {
        let mut store = MemoryStore::new();

        let first = event("uid-1", "Draft", EventStatus::Confirmed, None);
        let summary = reconciler().reconcile(&[first], &mut store, &mut NoProgress).unwrap();
        assert_eq!(summary.created, 1);
        let name = store.find_by_event_id("uid-1").unwrap().unwrap().name;

        let second = event(
            "uid-1",
            "Final",
            EventStatus::Confirmed,
            Some("RRULE:FREQ=WEEKLY;BYDAY=MO,FR"),
        );
        let summary = reconciler().reconcile(&[second], &mut store, &mut NoProgress).unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 0);

        assert_eq!(store.len(), 1);
        let local = store.find_by_event_id("uid-1").unwrap().unwrap();
        assert_eq!(local.name, name);
        assert_eq!(local.subject, "Final");
        assert_eq!(local.description.as_deref(), Some("Final description"));
        assert_eq!(local.schedule.repeat_on, Some(Frequency::Weekly));
        assert!(local.schedule.weekdays.monday && local.schedule.weekdays.friday);
        assert!(local.pulled_from_nextcloud_calendar);
        assert_eq!(local.nextcloud_calendar_id, CALENDAR_ID);
    }

    #[test]
    fn test_update_overwrites_schedule() {
        let mut store = MemoryStore::new();
        let weekly = event(
            "uid-1",
            "Gym",
            EventStatus::Confirmed,
            Some("RRULE:FREQ=WEEKLY;BYDAY=TU"),
        );
        reconciler().reconcile(&[weekly], &mut store, &mut NoProgress).unwrap();

        let once = event("uid-1", "Gym", EventStatus::Confirmed, None);
        reconciler().reconcile(&[once], &mut store, &mut NoProgress).unwrap();

        let local = store.find_by_event_id("uid-1").unwrap().unwrap();
        assert!(!local.schedule.repeat_this_event);
        assert!(!local.schedule.weekdays.any());
    }

    #[test]
    fn test_cancelled_without_local_record_is_noop() {
        let mut store = MemoryStore::new();
        let events = [event("ghost", "Gone", EventStatus::Cancelled, None)];

        let summary = reconciler().reconcile(&events, &mut store, &mut NoProgress).unwrap();

        assert!(store.is_empty());
        assert_eq!(summary.closed, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.to_string(), "1 Nextcloud Calendar Event synced.");
    }

    #[test]
    fn test_cancelled_closes_and_annotates() {
        let mut store = MemoryStore::new();
        reconciler()
            .reconcile(
                &[event("uid-1", "Review", EventStatus::Confirmed, None)],
                &mut store,
                &mut NoProgress,
            )
            .unwrap();

        let cancelled = [event("uid-1", "Review", EventStatus::Cancelled, None)];
        let summary = reconciler().reconcile(&cancelled, &mut store, &mut NoProgress).unwrap();
        assert_eq!(summary.closed, 1);

        let local = store.find_by_event_id("uid-1").unwrap().unwrap();
        assert_eq!(local.status, LocalStatus::Closed);
        assert_eq!(local.comments.len(), 1);
        assert_eq!(local.comments[0].content, CANCELLED_NOTE);

        // A second cancellation does not stack notes
        reconciler().reconcile(&cancelled, &mut store, &mut NoProgress).unwrap();
        let local = store.find_by_event_id("uid-1").unwrap().unwrap();
        assert_eq!(local.comments.len(), 1);
    }

    #[test]
    fn test_cancellation_is_scoped_to_calendar() {
        let mut store = MemoryStore::new();
        Reconciler::new("other", "/calendars/alice/other/", now())
            .reconcile(
                &[event("uid-1", "Elsewhere", EventStatus::Confirmed, None)],
                &mut store,
                &mut NoProgress,
            )
            .unwrap();

        reconciler()
            .reconcile(
                &[event("uid-1", "Elsewhere", EventStatus::Cancelled, None)],
                &mut store,
                &mut NoProgress,
            )
            .unwrap();

        let local = store.find_by_event_id("uid-1").unwrap().unwrap();
        assert_eq!(local.status, LocalStatus::Open);
    }

    #[test]
    fn test_tentative_is_skipped() {
        let mut store = MemoryStore::new();
        let summary = reconciler()
            .reconcile(
                &[event("uid-1", "Maybe", EventStatus::Tentative, None)],
                &mut store,
                &mut NoProgress,
            )
            .unwrap();
        assert!(store.is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_progress_reported_per_event() {
        let mut store = MemoryStore::new();
        let events = [
            event("a", "A", EventStatus::Confirmed, None),
            event("b", "B", EventStatus::Cancelled, None),
            event("c", "C", EventStatus::Tentative, None),
        ];

        let mut seen = Vec::new();
        let mut sink = |update: SyncProgress| seen.push(update);
        reconciler().reconcile(&events, &mut store, &mut sink).unwrap();

        assert_eq!(
            seen,
            vec![
                SyncProgress { progress: 1, total: 3 },
                SyncProgress { progress: 2, total: 3 },
                SyncProgress { progress: 3, total: 3 },
            ]
        );
    }

    #[test]
    fn test_empty_recurrence_list_is_tolerated() {
        let mut store = MemoryStore::new();
        let mut remote = event("uid-1", "Once", EventStatus::Confirmed, None);
        remote.recurrence = Some(vec![]);

        reconciler().reconcile(&[remote], &mut store, &mut NoProgress).unwrap();

        let local = store.find_by_event_id("uid-1").unwrap().unwrap();
        assert!(!local.schedule.repeat_this_event);
    }

    /// Delegates to a `MemoryStore` but fails the `fail_on`-th insert.
    struct FlakyStore {
        inner: MemoryStore,
        inserts: usize,
        fail_on: usize,
    }

    impl EventStore for FlakyStore {
        fn find_by_event_id(&self, event_id: &str) -> SyncResult<Option<CalendarEvent>> {
            self.inner.find_by_event_id(event_id)
        }

        fn find(&self, calendar_id: &str, event_id: &str) -> SyncResult<Option<CalendarEvent>> {
            self.inner.find(calendar_id, event_id)
        }

        fn insert(&mut self, event: CalendarEvent) -> SyncResult<()> {
            self.inserts += 1;
            if self.inserts == self.fail_on {
                return Err(SyncError::Store("disk full".into()));
            }
            self.inner.insert(event)
        }

        fn save(&mut self, event: &CalendarEvent) -> SyncResult<()> {
            self.inner.save(event)
        }

        fn events(&self) -> SyncResult<Vec<CalendarEvent>> {
            self.inner.events()
        }
    }

    #[test]
    fn test_store_failure_stops_pass_and_keeps_earlier_writes() {
        let mut store = FlakyStore {
            inner: MemoryStore::new(),
            inserts: 0,
            fail_on: 2,
        };
        let remote = [
            event("uid-1", "First", EventStatus::Confirmed, None),
            event("uid-2", "Second", EventStatus::Confirmed, None),
            event("uid-3", "Third", EventStatus::Confirmed, None),
        ];

        let err = reconciler()
            .reconcile(&remote, &mut store, &mut NoProgress)
            .unwrap_err();

        assert!(matches!(err, SyncError::Store(ref msg) if msg == "disk full"));
        assert!(store.find_by_event_id("uid-1").unwrap().is_some());
        assert!(store.find_by_event_id("uid-2").unwrap().is_none());
        assert!(store.find_by_event_id("uid-3").unwrap().is_none());
        assert_eq!(store.inner.len(), 1);
    }
}
