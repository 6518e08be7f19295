//! Nextcloud CalDAV client built on libdav.
//!
//! Discovery follows the usual CalDAV chain: the DAV root names the
//! current-user-principal, the principal names its calendar-home-set, and
//! the home lists the calendar collections. Events are fetched with one
//! calendar-query REPORT per calendar.

pub mod ics;

use std::fmt;

use http::Uri;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use libdav::caldav::{FindCalendarHomeSet, FindCalendars, GetCalendarResources};
use libdav::dav::{GetProperty, WebDavClient};
use libdav::names;
use tower::ServiceBuilder;
use tower_http::{auth::AddAuthorization, follow_redirect::FollowRedirect};
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::event::RemoteEvent;
use crate::settings::Settings;

/// Path of the DAV root below the Nextcloud base URL.
const DAV_ROOT: &str = "remote.php/dav/";

type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// HTTP client with basic auth and redirect following.
type HttpClient = FollowRedirect<AddAuthorization<Client<HttpsConnector, String>>>;

/// A calendar collection on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCalendar {
    /// Display name, falling back to the last href segment
    pub name: String,
    /// Collection href; used as the remote calendar identity
    pub href: String,
}

/// Where calendars and their events come from.
#[allow(async_fn_in_trait)]
pub trait CalendarSource {
    async fn calendars(&self) -> SyncResult<Vec<RemoteCalendar>>;

    async fn events(&self, calendar: &RemoteCalendar) -> SyncResult<Vec<RemoteEvent>>;
}

pub struct CalDavClient {
    caldav: libdav::CalDavClient<HttpClient>,
    username: String,
}

impl fmt::Debug for CalDavClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalDavClient")
            .field("base_url", &self.caldav.base_url().to_string())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl CalDavClient {
    /// `base_url` is the Nextcloud instance, e.g. `https://cloud.example.com`
    /// (a sub-path install like `https://example.com/nextcloud` works too).
    pub fn new(base_url: &str, username: &str, password: &str) -> SyncResult<Self> {
        let uri = dav_root(base_url)?;

        let https_connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| SyncError::Transport(format!("Failed to load native TLS roots: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();

        let http_client = Client::builder(TokioExecutor::new()).build(https_connector);
        let auth_client = AddAuthorization::basic(http_client, username, password);
        let client = ServiceBuilder::new()
            .layer(tower_http::follow_redirect::FollowRedirectLayer::new())
            .service(auth_client);

        let webdav = WebDavClient::new(uri, client);
        Ok(CalDavClient {
            caldav: libdav::CalDavClient::new(webdav),
            username: username.to_string(),
        })
    }

    /// Build a client from validated settings.
    pub fn from_settings(settings: &Settings) -> SyncResult<Self> {
        let creds = settings.validate()?;
        Self::new(creds.url, creds.user, creds.password)
    }

    /// All calendars of the authenticated user.
    pub async fn list_calendars(&self) -> SyncResult<Vec<RemoteCalendar>> {
        let principal = self
            .caldav
            .find_current_user_principal()
            .await
            .map_err(transport)?
            .ok_or_else(|| {
                SyncError::Protocol("server reported no current-user-principal".into())
            })?;
        tracing::debug!(principal = %principal, "discovered principal");

        let home = self
            .caldav
            .request(FindCalendarHomeSet::new(&principal))
            .await
            .map_err(transport)?
            .home_sets
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Protocol("principal has no calendar-home-set".into()))?;

        let found = self
            .caldav
            .request(FindCalendars::new(&home))
            .await
            .map_err(transport)?
            .calendars;

        let mut calendars = Vec::with_capacity(found.len());
        for collection in found {
            let display_name = self
                .caldav
                .request(GetProperty::new(&collection.href, &names::DISPLAY_NAME))
                .await
                .map_err(transport)?
                .value;

            calendars.push(RemoteCalendar {
                name: calendar_name(display_name, &collection.href),
                href: collection.href,
            });
        }

        Ok(calendars)
    }

    /// Every event in `calendar`, in one REPORT.
    ///
    /// Resources that fail to fetch or parse are logged and skipped.
    pub async fn calendar_events(
        &self,
        calendar: &RemoteCalendar,
    ) -> SyncResult<Vec<RemoteEvent>> {
        let response = self
            .caldav
            .request(GetCalendarResources::new(&calendar.href))
            .await
            .map_err(transport)?;

        let mut events = Vec::new();
        for resource in response.resources {
            let content = match resource.content {
                Ok(content) => content,
                Err(status) => {
                    tracing::warn!(href = %resource.href, %status, "skipping calendar resource");
                    continue;
                }
            };
            match ics::parse_event(&content.data) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(href = %resource.href, error = %e, "skipping calendar resource")
                }
            }
        }

        tracing::debug!(calendar = %calendar.name, count = events.len(), "fetched events");
        Ok(events)
    }
}

impl CalendarSource for CalDavClient {
    async fn calendars(&self) -> SyncResult<Vec<RemoteCalendar>> {
        self.list_calendars().await
    }

    async fn events(&self, calendar: &RemoteCalendar) -> SyncResult<Vec<RemoteEvent>> {
        self.calendar_events(calendar).await
    }
}

fn transport(e: impl fmt::Display) -> SyncError {
    SyncError::Transport(e.to_string())
}

fn dav_root(base_url: &str) -> SyncResult<Uri> {
    let invalid = |e: &dyn fmt::Display| {
        SyncError::Config(format!("Invalid Nextcloud URL '{base_url}': {e}"))
    };

    let mut base = Url::parse(base_url).map_err(|e| invalid(&e))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let root = base.join(DAV_ROOT).map_err(|e| invalid(&e))?;
    root.as_str().parse::<Uri>().map_err(|e| invalid(&e))
}

/// Display name, or the last href segment when the server has none.
fn calendar_name(display_name: Option<String>, href: &str) -> String {
    display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            let trimmed = href.trim_end_matches('/');
            trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
        })
}
