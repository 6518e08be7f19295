//! In-memory event store.

use crate::error::{SyncError, SyncResult};
use crate::store::{CalendarEvent, EventStore};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    events: Vec<CalendarEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for MemoryStore {
    fn find_by_event_id(&self, event_id: &str) -> SyncResult<Option<CalendarEvent>> {
        Ok(self
            .events
            .iter()
            .find(|e| e.nextcloud_calendar_event_id == event_id)
            .cloned())
    }

    fn find(&self, calendar_id: &str, event_id: &str) -> SyncResult<Option<CalendarEvent>> {
        Ok(self
            .events
            .iter()
            .find(|e| {
                e.nextcloud_calendar_id == calendar_id && e.nextcloud_calendar_event_id == event_id
            })
            .cloned())
    }

    fn insert(&mut self, event: CalendarEvent) -> SyncResult<()> {
        if self
            .events
            .iter()
            .any(|e| e.nextcloud_calendar_event_id == event.nextcloud_calendar_event_id)
        {
            return Err(SyncError::Store(format!(
                "event '{}' already exists",
                event.nextcloud_calendar_event_id
            )));
        }
        self.events.push(event);
        Ok(())
    }

    fn save(&mut self, event: &CalendarEvent) -> SyncResult<()> {
        let existing = self
            .events
            .iter_mut()
            .find(|e| e.name == event.name)
            .ok_or_else(|| SyncError::Store(format!("no local event named '{}'", event.name)))?;
        *existing = event.clone();
        Ok(())
    }

    fn events(&self) -> SyncResult<Vec<CalendarEvent>> {
        Ok(self.events.clone())
    }
}
