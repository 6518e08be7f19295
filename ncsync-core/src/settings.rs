//! Sync settings at ~/.config/ncsync/config.toml
//!
//! Values can be overridden with `NCSYNC_*` environment variables, e.g.
//! `NCSYNC_CALENDAR_PASSWORD`.

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

static DEFAULT_DATA_DIR: &str = "~/.local/share/ncsync";

const ENV_PREFIX: &str = "NCSYNC";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

fn default_true() -> bool {
    true
}

/// Server credentials and the local calendars fed from it.
#[derive(Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Nextcloud base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub calendar_enable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_password: Option<String>,

    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calendars: Vec<CalendarAccount>,
}

/// One local calendar pulled from a named remote calendar.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CalendarAccount {
    /// Local name, also names the data directory
    pub name: String,

    /// Display name of the remote calendar
    #[serde(default)]
    pub calendar_name: String,

    #[serde(default = "default_true")]
    pub enable: bool,

    #[serde(default = "default_true")]
    pub pull_from_nextcloud_calendar: bool,
}

/// Borrowed, validated connection details.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub url: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

impl fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<hidden>")
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            url: None,
            calendar_enable: false,
            calendar_user: None,
            calendar_password: None,
            data_dir: default_data_dir(),
            calendars: Vec::new(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("calendar_enable", &self.calendar_enable)
            .field("calendar_user", &self.calendar_user)
            .field("calendar_password", &self.calendar_password.as_ref().map(|_| "<hidden>"))
            .field("data_dir", &self.data_dir)
            .field("calendars", &self.calendars)
            .finish()
    }
}

impl Settings {
    pub fn config_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("ncsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, creating a commented template first
    /// if nothing is there yet.
    pub fn load() -> SyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> SyncResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> SyncResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)
            .map_err(|e| SyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Check that syncing may run at all.
    pub fn validate(&self) -> SyncResult<Credentials<'_>> {
        if !self.calendar_enable {
            return Err(SyncError::Config(
                "Enable Nextcloud Calendar in Nextcloud Settings".into(),
            ));
        }

        let user = self.calendar_user.as_deref().filter(|s| !s.is_empty());
        let password = self.calendar_password.as_deref().filter(|s| !s.is_empty());
        let (Some(user), Some(password)) = (user, password) else {
            return Err(SyncError::Config(
                "Enter Dedicated Calendar User and Password in Nextcloud Settings".into(),
            ));
        };

        let url = self
            .url
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SyncError::Config("Enter the Nextcloud URL in Nextcloud Settings".into())
            })?;

        Ok(Credentials {
            url,
            user,
            password,
        })
    }

    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();
        PathBuf::from(full_path_str)
    }

    /// Enabled accounts, or just `only` when given.
    pub fn enabled_accounts(&self, only: Option<&str>) -> SyncResult<Vec<&CalendarAccount>> {
        let enabled = self.calendars.iter().filter(|c| c.enable);

        match only {
            Some(name) => {
                let account = self
                    .calendars
                    .iter()
                    .find(|c| c.name == name)
                    .ok_or_else(|| {
                        let available: Vec<_> =
                            self.calendars.iter().map(|c| c.name.as_str()).collect();
                        SyncError::Config(format!(
                            "Calendar '{}' is not configured. Available: {}",
                            name,
                            available.join(", ")
                        ))
                    })?;
                if !account.enable {
                    return Err(SyncError::Config(format!("Calendar '{name}' is disabled")));
                }
                Ok(vec![account])
            }
            None => Ok(enabled.collect()),
        }
    }

    /// Write a template with every option commented out.
    pub fn create_default_config(path: &Path) -> SyncResult<()> {
        let contents = format!(
            "\
# ncsync configuration

# Nextcloud instance and the dedicated calendar user:
# url = \"https://cloud.example.com\"
# calendar_enable = true
# calendar_user = \"calendar-bot\"
# calendar_password = \"app-password\"

# Where synced events are stored:
# data_dir = \"{}\"

# One block per calendar to pull:
# [[calendars]]
# name = \"work\"
# calendar_name = \"Work\"
",
            DEFAULT_DATA_DIR
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| SyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> Settings {
        Settings {
            url: Some("https://cloud.example.com".into()),
            calendar_enable: true,
            calendar_user: Some("alice".into()),
            calendar_password: Some("secret".into()),
            data_dir: default_data_dir(),
            calendars: vec![
                CalendarAccount {
                    name: "work".into(),
                    calendar_name: "Work".into(),
                    enable: true,
                    pull_from_nextcloud_calendar: true,
                },
                CalendarAccount {
                    name: "old".into(),
                    calendar_name: "Archive".into(),
                    enable: false,
                    pull_from_nextcloud_calendar: true,
                },
            ],
        }
    }

    #[test]
    fn test_validate_requires_enable() {
        let settings = Settings {
            calendar_enable: false,
            ..enabled()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Enable Nextcloud Calendar in Nextcloud Settings"
        );
    }

    #[test]
    fn test_validate_requires_credentials() {
        for (user, password) in [(None, Some("x")), (Some("alice"), None), (Some(""), Some("x"))] {
            let settings = Settings {
                calendar_user: user.map(String::from),
                calendar_password: password.map(String::from),
                ..enabled()
            };
            assert!(matches!(settings.validate(), Err(SyncError::Config(_))));
        }
    }

    #[test]
    fn test_validate_requires_url() {
        for url in [None, Some("")] {
            let settings = Settings {
                url: url.map(String::from),
                ..enabled()
            };
            let err = settings.validate().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Configuration error: Enter the Nextcloud URL in Nextcloud Settings"
            );
        }
    }

    #[test]
    fn test_validate_returns_credentials() {
        let settings = enabled();
        let creds = settings.validate().unwrap();
        assert_eq!(creds.url, "https://cloud.example.com");
        assert_eq!(creds.user, "alice");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn test_enabled_accounts() {
        let settings = enabled();

        let all = settings.enabled_accounts(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "work");

        assert_eq!(settings.enabled_accounts(Some("work")).unwrap().len(), 1);
        assert!(settings.enabled_accounts(Some("old")).is_err());
        assert!(settings.enabled_accounts(Some("missing")).is_err());
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
url = "https://cloud.example.com"
calendar_enable = true
calendar_user = "alice"
calendar_password = "secret"

[[calendars]]
name = "work"
calendar_name = "Work"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert!(settings.calendar_enable);
        assert_eq!(settings.data_dir, default_data_dir());
        assert_eq!(settings.calendars.len(), 1);
        assert!(settings.calendars[0].enable);
        assert!(settings.calendars[0].pull_from_nextcloud_calendar);
    }

    #[test]
    fn test_default_template_loads_as_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncsync").join("config.toml");
        Settings::create_default_config(&path).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert!(!settings.calendar_enable);
        assert!(settings.calendars.is_empty());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_roundtrip_skips_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        enabled().save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("data_dir"));

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.calendars, enabled().calendars);
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", enabled());
        assert!(!debug.contains("secret"));
    }
}
