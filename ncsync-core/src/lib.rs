//! Pull-sync from a Nextcloud calendar into local event records.
//!
//! - `caldav` discovers calendars and fetches events over CalDAV
//! - `schedule` maps RRULE lines onto the local repeat fields
//! - `reconcile` applies a remote event list to an [`EventStore`]
//! - `sync` ties the pieces together for one configured calendar

pub mod caldav;
pub mod error;
pub mod event;
pub mod ordinal;
pub mod reconcile;
pub mod recurrence;
pub mod schedule;
pub mod settings;
pub mod store;
pub mod sync;

pub use caldav::{CalDavClient, CalendarSource, RemoteCalendar};
pub use error::{SyncError, SyncResult};
pub use event::{EventStatus, EventTime, RemoteEvent};
pub use reconcile::{NoProgress, ProgressSink, Reconciler, SyncProgress, SyncSummary};
pub use recurrence::{Frequency, RecurrenceRule};
pub use schedule::{RepeatSchedule, WeekdayFlags};
pub use settings::{CalendarAccount, Settings};
pub use store::{CalendarEvent, EventStore, FileStore, LocalStatus, MemoryStore};
pub use sync::sync_account;
