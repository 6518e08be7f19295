//! Local calendar event records and their storage.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncResult;
use crate::event::RemoteEvent;
use crate::schedule::RepeatSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentKind {
    Info,
}

/// A note attached to a local event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub kind: CommentKind,
    pub content: String,
}

/// A local calendar event pulled from Nextcloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Local identifier
    pub name: String,
    pub subject: String,
    pub description: Option<String>,
    pub status: LocalStatus,
    /// Local account the event was pulled through
    pub nextcloud_calendar: String,
    /// Remote calendar collection the event lives in
    pub nextcloud_calendar_id: String,
    /// Remote event UID, unique across local records
    pub nextcloud_calendar_event_id: String,
    pub pulled_from_nextcloud_calendar: bool,
    #[serde(flatten)]
    pub schedule: RepeatSchedule,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl CalendarEvent {
    /// A fresh open record for a remote event.
    pub fn from_remote(
        account: &str,
        calendar_id: &str,
        event: &RemoteEvent,
        schedule: RepeatSchedule,
    ) -> Self {
        CalendarEvent {
            name: Uuid::new_v4().to_string(),
            subject: event.summary.clone(),
            description: event.description.clone(),
            status: LocalStatus::Open,
            nextcloud_calendar: account.to_string(),
            nextcloud_calendar_id: calendar_id.to_string(),
            nextcloud_calendar_event_id: event.id.clone(),
            pulled_from_nextcloud_calendar: true,
            schedule,
            comments: Vec::new(),
        }
    }

    /// Overwrite the synced fields with the remote payload.
    pub fn apply_remote(&mut self, event: &RemoteEvent, schedule: RepeatSchedule) {
        self.subject = event.summary.clone();
        self.description = event.description.clone();
        self.schedule = schedule;
    }

    pub fn is_closed(&self) -> bool {
        self.status == LocalStatus::Closed
    }

    /// Close the event and leave an informational note.
    pub fn close(&mut self, note: &str) {
        self.status = LocalStatus::Closed;
        self.comments.push(Comment {
            kind: CommentKind::Info,
            content: note.to_string(),
        });
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject)
    }
}

/// Persistence for local calendar events.
///
/// Writes are per record: each insert or save is durable on its own, there is
/// no batch transaction.
pub trait EventStore {
    /// Look up by remote event id alone.
    fn find_by_event_id(&self, event_id: &str) -> SyncResult<Option<CalendarEvent>>;

    /// Look up by remote calendar and remote event id.
    fn find(&self, calendar_id: &str, event_id: &str) -> SyncResult<Option<CalendarEvent>>;

    fn insert(&mut self, event: CalendarEvent) -> SyncResult<()>;

    /// Persist changes to an existing record, matched by `name`.
    fn save(&mut self, event: &CalendarEvent) -> SyncResult<()>;

    fn events(&self) -> SyncResult<Vec<CalendarEvent>>;
}
