//! File-backed event store.
//!
//! Each local event is one JSON file named after its local id inside the
//! account's data directory. Lookups scan the directory.

use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::store::{CalendarEvent, EventStore};

const EVENT_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> SyncResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    /// Store for one account under the data directory, e.g. `<data>/work-calendar`.
    pub fn for_account(data_dir: &Path, account: &str) -> SyncResult<Self> {
        Self::open(data_dir.join(slug::slugify(account)))
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn event_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EVENT_EXTENSION}"))
    }

    fn write(&self, event: &CalendarEvent) -> SyncResult<()> {
        let path = self.event_path(&event.name);
        let temp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(event)?;
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn read(path: &Path) -> SyncResult<CalendarEvent> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            SyncError::Store(format!("could not read {}: {}", path.display(), e))
        })
    }
}

impl EventStore for FileStore {
    fn find_by_event_id(&self, event_id: &str) -> SyncResult<Option<CalendarEvent>> {
        Ok(self
            .events()?
            .into_iter()
            .find(|e| e.nextcloud_calendar_event_id == event_id))
    }

    fn find(&self, calendar_id: &str, event_id: &str) -> SyncResult<Option<CalendarEvent>> {
        Ok(self.events()?.into_iter().find(|e| {
            e.nextcloud_calendar_id == calendar_id && e.nextcloud_calendar_event_id == event_id
        }))
    }

    fn insert(&mut self, event: CalendarEvent) -> SyncResult<()> {
        if self.find_by_event_id(&event.nextcloud_calendar_event_id)?.is_some() {
            return Err(SyncError::Store(format!(
                "event '{}' already exists",
                event.nextcloud_calendar_event_id
            )));
        }
        self.write(&event)
    }

    fn save(&mut self, event: &CalendarEvent) -> SyncResult<()> {
        if !self.event_path(&event.name).exists() {
            return Err(SyncError::Store(format!(
                "no local event named '{}'",
                event.name
            )));
        }
        self.write(event)
    }

    fn events(&self) -> SyncResult<Vec<CalendarEvent>> {
        let entries = std::fs::read_dir(&self.dir)?;

        let mut events = Vec::new();
        for path in entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == EVENT_EXTENSION))
        {
            match Self::read(&path) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable event file"
                    )
                }
            }
        }

        events.sort_by(|a, b| a.schedule.starts_on.cmp(&b.schedule.starts_on));
        Ok(events)
    }
}
