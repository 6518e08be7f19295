use anyhow::{Context, Result};
use dialoguer::{Input, MultiSelect};
use ncsync_core::{CalDavClient, CalendarAccount, Settings};
use owo_colors::OwoColorize;

use crate::utils::tui;

pub async fn run() -> Result<()> {
    let config_path = Settings::config_path()?;
    let mut settings = Settings::load()?;

    println!("Connecting to Nextcloud...\n");
    println!(
        "{}\n",
        "Use a dedicated calendar user, ideally with an app password.".dimmed()
    );

    let url = prompt_text("Nextcloud URL", settings.url.as_deref())?;
    let user = prompt_text("Calendar user", settings.calendar_user.as_deref())?;
    let password = prompt_password("Password")?;

    settings.url = Some(url.trim_end_matches('/').to_string());
    settings.calendar_user = Some(user);
    settings.calendar_password = Some(password);
    settings.calendar_enable = true;

    let client = CalDavClient::from_settings(&settings)?;

    let spinner = tui::create_spinner("Fetching calendars".to_string());
    let result = client.list_calendars().await;
    spinner.finish_and_clear();
    let calendars = result.context("Could not list calendars with these credentials")?;

    if calendars.is_empty() {
        println!("No calendars found.");
        settings.save(&config_path)?;
        return Ok(());
    }

    println!("Found {} calendar(s).\n", calendars.len());

    let items: Vec<&str> = calendars.iter().map(|c| c.name.as_str()).collect();
    let defaults: Vec<bool> = calendars
        .iter()
        .map(|c| {
            settings.calendars.is_empty()
                || settings.calendars.iter().any(|a| a.calendar_name == c.name)
        })
        .collect();

    let selections = MultiSelect::new()
        .with_prompt("Select calendars to sync (space to toggle, enter to confirm)")
        .items(&items)
        .defaults(&defaults)
        .interact()?;

    println!();

    for &idx in &selections {
        let remote = &calendars[idx];

        if settings.calendars.iter().any(|a| a.calendar_name == remote.name) {
            println!("  {} (already configured)", remote.name);
            continue;
        }

        settings.calendars.push(CalendarAccount {
            name: unique_account_name(&settings, &remote.name),
            calendar_name: remote.name.clone(),
            enable: true,
            pull_from_nextcloud_calendar: true,
        });
        println!("  {} (added)", remote.name);
    }

    settings.save(&config_path)?;
    println!("\nSettings saved to {}\n", config_path.display());

    if !settings.calendars.is_empty() {
        println!("Pulling events...\n");
        super::sync::run(&settings, None).await?;
    }

    Ok(())
}

/// Slugified remote name, suffixed until it is unused.
fn unique_account_name(settings: &Settings, calendar_name: &str) -> String {
    let base = match slug::slugify(calendar_name) {
        s if s.is_empty() => "calendar".to_string(),
        s => s,
    };

    let taken = |name: &str| settings.calendars.iter().any(|a| a.name == name);
    if !taken(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let name = format!("{base}-{n}");
        if !taken(&name) {
            return name;
        }
        n += 1;
    }
}

fn prompt_text(label: &str, current: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(label);
    if let Some(current) = current {
        input = input.default(current.to_string());
    }
    Ok(input.interact_text()?)
}

/// Prompt the user for password input (hidden).
fn prompt_password(label: &str) -> Result<String> {
    let prompt = format!("{}: ", label);
    rpassword::prompt_password(&prompt).context("Failed to read password")
}
