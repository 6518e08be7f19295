use anyhow::Result;
use chrono::Utc;
use ncsync_core::{CalDavClient, FileStore, Settings, SyncProgress, sync_account};
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(settings: &Settings, calendar: Option<&str>) -> Result<()> {
    let accounts = settings.enabled_accounts(calendar)?;
    if accounts.is_empty() {
        println!("{}", "No enabled calendars to sync".dimmed());
        return Ok(());
    }

    let client = CalDavClient::from_settings(settings)?;
    let data_dir = settings.data_path();
    let mut failed = 0;

    for (i, account) in accounts.iter().enumerate() {
        println!("{}", account.render());

        let mut store = FileStore::for_account(&data_dir, &account.name)?;
        let bar = tui::create_sync_bar();
        let mut progress = |update: SyncProgress| tui::report(&bar, update);

        let result =
            sync_account(settings, account, &client, &mut store, &mut progress, Utc::now()).await;
        bar.finish_and_clear();

        match result {
            Ok(Some(summary)) => println!("   {}", summary.render()),
            Ok(None) => println!("   {}", "Pulling disabled".dimmed()),
            Err(e) => {
                tracing::debug!(account = %account.name, error = ?e, "sync failed");
                failed += 1;
                println!("   {}", e.to_string().red());
            }
        }

        if i < accounts.len() - 1 {
            println!();
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} calendars failed to sync", accounts.len());
    }

    Ok(())
}
