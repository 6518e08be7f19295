use anyhow::Result;
use ncsync_core::Settings;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let config_path = Settings::config_path()?;
    let settings = Settings::load()?;

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());
    println!("  Events:  {}", settings.data_path().display());

    println!("\n{}", "Server".bold());
    println!("  URL:      {}", settings.url.as_deref().unwrap_or("-"));
    println!("  User:     {}", settings.calendar_user.as_deref().unwrap_or("-"));
    println!(
        "  Enabled:  {}",
        if settings.calendar_enable { "yes" } else { "no" }
    );

    if let Err(e) = settings.validate() {
        println!("\n{}", e.to_string().yellow());
    }

    Ok(())
}
