//! One pull pass for one configured calendar.

use chrono::{DateTime, Utc};

use crate::caldav::{CalendarSource, RemoteCalendar};
use crate::error::{SyncError, SyncResult};
use crate::reconcile::{ProgressSink, Reconciler, SyncSummary};
use crate::settings::{CalendarAccount, Settings};
use crate::store::EventStore;

/// Pick the remote calendar an account pulls from, by display name.
pub fn select_calendar<'a>(
    account: &CalendarAccount,
    calendars: &'a [RemoteCalendar],
) -> SyncResult<&'a RemoteCalendar> {
    if account.calendar_name.is_empty() {
        return Err(SyncError::Config(format!(
            "No calendar name set for '{}'",
            account.name
        )));
    }

    if calendars.is_empty() {
        return Err(SyncError::CalendarNotFound(
            "server has no calendars for user".into(),
        ));
    }

    calendars
        .iter()
        .find(|c| c.name == account.calendar_name)
        .ok_or_else(|| {
            let available: Vec<_> = calendars.iter().map(|c| c.name.as_str()).collect();
            SyncError::CalendarNotFound(format!(
                "'{}' (available: {})",
                account.calendar_name,
                available.join(", ")
            ))
        })
}

/// Pull every event of the account's remote calendar into `store`.
///
/// Returns `None` without touching the server when the account has pulling
/// turned off.
pub async fn sync_account<C, S, P>(
    settings: &Settings,
    account: &CalendarAccount,
    source: &C,
    store: &mut S,
    progress: &mut P,
    now: DateTime<Utc>,
) -> SyncResult<Option<SyncSummary>>
where
    C: CalendarSource,
    S: EventStore,
    P: ProgressSink + ?Sized,
{
    settings.validate()?;

    if !account.pull_from_nextcloud_calendar {
        tracing::info!(account = %account.name, "pulling disabled, skipping");
        return Ok(None);
    }

    let calendars = source.calendars().await?;
    let calendar = select_calendar(account, &calendars)?;

    let events = source.events(calendar).await?;
    tracing::info!(
        account = %account.name,
        calendar = %calendar.name,
        count = events.len(),
        "fetched remote events"
    );

    let reconciler = Reconciler::new(&account.name, &calendar.href, now);
    reconciler.reconcile(&events, store, progress).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventStatus, EventTime, RemoteEvent};
    use crate::reconcile::{NoProgress, SyncProgress};
    use crate::store::{LocalStatus, MemoryStore};
    use chrono::NaiveDate;
    use std::cell::Cell;

    const WORK_HREF: &str = "/remote.php/dav/calendars/alice/work/";

    struct FakeSource {
        calendars: Vec<RemoteCalendar>,
        events: Vec<RemoteEvent>,
        fail_events: bool,
        calls: Cell<usize>,
    }

    impl FakeSource {
        fn new(events: Vec<RemoteEvent>) -> Self {
            FakeSource {
                calendars: vec![calendar("Work", WORK_HREF)],
                events,
                fail_events: false,
                calls: Cell::new(0),
            }
        }
    }

    impl CalendarSource for FakeSource {
        async fn calendars(&self) -> SyncResult<Vec<RemoteCalendar>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.calendars.clone())
        }

        async fn events(&self, calendar: &RemoteCalendar) -> SyncResult<Vec<RemoteEvent>> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(calendar.href, WORK_HREF);
            if self.fail_events {
                return Err(SyncError::Protocol("REPORT returned 500".into()));
            }
            Ok(self.events.clone())
        }
    }

    fn calendar(name: &str, href: &str) -> RemoteCalendar {
        RemoteCalendar {
            name: name.to_string(),
            href: href.to_string(),
        }
    }

    fn settings() -> Settings {
        Settings {
            url: Some("https://cloud.example.com".into()),
            calendar_enable: true,
            calendar_user: Some("alice".into()),
            calendar_password: Some("secret".into()),
            ..Settings::default()
        }
    }

    fn account() -> CalendarAccount {
        CalendarAccount {
            name: "work".into(),
            calendar_name: "Work".into(),
            enable: true,
            pull_from_nextcloud_calendar: true,
        }
    }

    fn event(id: &str, status: EventStatus) -> RemoteEvent {
        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        RemoteEvent {
            id: id.to_string(),
            summary: format!("Event {id}"),
            description: None,
            status,
            start: EventTime::DateTimeUtc(day.and_hms_opt(9, 0, 0).unwrap().and_utc()),
            end: EventTime::DateTimeUtc(day.and_hms_opt(10, 0, 0).unwrap().and_utc()),
            recurrence: None,
        }
    }

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc()
    }

    async fn run(
        settings: &Settings,
        account: &CalendarAccount,
        source: &FakeSource,
        store: &mut MemoryStore,
    ) -> SyncResult<Option<SyncSummary>> {
        sync_account(settings, account, source, store, &mut NoProgress, now()).await
    }

    #[tokio::test]
    async fn test_sync_pulls_into_store() {
        let mut source = FakeSource::new(vec![
            event("a", EventStatus::Confirmed),
            event("b", EventStatus::Confirmed),
        ]);
        source
            .calendars
            .insert(0, calendar("Personal", "/remote.php/dav/calendars/alice/personal/"));
        let mut store = MemoryStore::new();
        let mut updates = Vec::new();
        let mut record = |u: SyncProgress| updates.push(u);

        let summary =
            sync_account(&settings(), &account(), &source, &mut store, &mut record, now())
                .await
                .unwrap()
                .unwrap();

        assert_eq!(summary.created, 2);
        assert_eq!(summary.to_string(), "2 Nextcloud Calendar Events synced.");
        assert_eq!(updates.last(), Some(&SyncProgress { progress: 2, total: 2 }));

        let stored = store.events().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|e| e.nextcloud_calendar == "work"));
        assert!(stored.iter().all(|e| e.nextcloud_calendar_id == WORK_HREF));
    }

    #[tokio::test]
    async fn test_second_pass_closes_cancelled() {
        let mut store = MemoryStore::new();
        let first = FakeSource::new(vec![event("a", EventStatus::Confirmed)]);
        run(&settings(), &account(), &first, &mut store).await.unwrap();

        let second = FakeSource::new(vec![event("a", EventStatus::Cancelled)]);
        let summary = run(&settings(), &account(), &second, &mut store)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.closed, 1);
        let local = store.find(WORK_HREF, "a").unwrap().unwrap();
        assert_eq!(local.status, LocalStatus::Closed);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_and_leaves_store_alone() {
        let mut store = MemoryStore::new();
        let first = FakeSource::new(vec![event("a", EventStatus::Confirmed)]);
        run(&settings(), &account(), &first, &mut store).await.unwrap();
        let before = store.events().unwrap();

        let mut failing = FakeSource::new(vec![event("b", EventStatus::Confirmed)]);
        failing.fail_events = true;
        let err = run(&settings(), &account(), &failing, &mut store)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Protocol(ref msg) if msg == "REPORT returned 500"));
        assert_eq!(store.events().unwrap(), before);
    }

    #[tokio::test]
    async fn test_disabled_settings_fail_before_fetch() {
        let source = FakeSource::new(vec![]);
        let disabled = Settings {
            calendar_enable: false,
            ..settings()
        };

        let err = run(&disabled, &account(), &source, &mut MemoryStore::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Config(_)));
        assert_eq!(source.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_pull_disabled_is_noop() {
        let source = FakeSource::new(vec![event("a", EventStatus::Confirmed)]);
        let account = CalendarAccount {
            pull_from_nextcloud_calendar: false,
            ..account()
        };
        let mut store = MemoryStore::new();

        let result = run(&settings(), &account, &source, &mut store).await.unwrap();

        assert!(result.is_none());
        assert_eq!(source.calls.get(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_calendar_reports_nothing_to_sync() {
        let source = FakeSource::new(vec![]);

        let summary = run(&settings(), &account(), &source, &mut MemoryStore::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.to_string(), "No Nextcloud Calendar Event to sync.");
    }

    #[test]
    fn test_select_calendar_errors() {
        let none: Vec<RemoteCalendar> = Vec::new();
        let err = select_calendar(&account(), &none).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Calendar not found: server has no calendars for user"
        );

        let calendars = vec![calendar("Personal", "/p/"), calendar("Family", "/f/")];
        let err = select_calendar(&account(), &calendars).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Calendar not found: 'Work' (available: Personal, Family)"
        );

        let unnamed = CalendarAccount {
            calendar_name: String::new(),
            ..account()
        };
        assert!(matches!(
            select_calendar(&unnamed, &calendars),
            Err(SyncError::Config(_))
        ));
    }
}
