use anyhow::Result;
use ncsync_core::{CalDavClient, Settings};
use owo_colors::OwoColorize;

use crate::utils::tui;

pub async fn run(settings: &Settings) -> Result<()> {
    let client = CalDavClient::from_settings(settings)?;

    let spinner = tui::create_spinner("Fetching calendars".to_string());
    let result = client.list_calendars().await;
    spinner.finish_and_clear();
    let calendars = result?;

    if calendars.is_empty() {
        println!("{}", "No calendars found".dimmed());
        return Ok(());
    }

    for calendar in &calendars {
        let synced_as = settings
            .calendars
            .iter()
            .find(|a| a.calendar_name == calendar.name)
            .map(|a| format!("-> {}", a.name));

        match synced_as {
            Some(tag) => println!("📅 {} {}", calendar.name, tag.green()),
            None => println!("📅 {} {}", calendar.name, calendar.href.dimmed()),
        }
    }

    Ok(())
}
