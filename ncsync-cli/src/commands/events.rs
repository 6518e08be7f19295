use anyhow::Result;
use ncsync_core::{EventStore, FileStore, Settings};
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn run(settings: &Settings, calendar: &str, all: bool) -> Result<()> {
    let account = settings
        .calendars
        .iter()
        .find(|a| a.name == calendar)
        .ok_or_else(|| {
            let available: Vec<_> = settings.calendars.iter().map(|a| a.name.as_str()).collect();
            anyhow::anyhow!(
                "Calendar '{}' not found. Available: {}",
                calendar,
                available.join(", ")
            )
        })?;

    let store = FileStore::for_account(&settings.data_path(), &account.name)?;
    let events: Vec<_> = store
        .events()?
        .into_iter()
        .filter(|e| all || !e.is_closed())
        .collect();

    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    println!("{}", account.render());
    for event in &events {
        println!("   {}", event.render());
    }

    Ok(())
}
