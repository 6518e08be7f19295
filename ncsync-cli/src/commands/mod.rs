pub mod calendars;
pub mod config;
pub mod connect;
pub mod events;
pub mod sync;
