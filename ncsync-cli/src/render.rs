//! Colored terminal rendering for ncsync-core types.

use ncsync_core::{CalendarAccount, CalendarEvent, LocalStatus, RepeatSchedule, SyncSummary};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarAccount {
    fn render(&self) -> String {
        format!("📅 {} {}", self.name, format!("({})", self.calendar_name).dimmed())
    }
}

impl Render for SyncSummary {
    fn render(&self) -> String {
        if self.total == 0 {
            return self.to_string().dimmed().to_string();
        }

        let mut counts = Vec::new();
        if self.created > 0 {
            counts.push(format!("+{}", self.created).green().to_string());
        }
        if self.updated > 0 {
            counts.push(format!("~{}", self.updated).yellow().to_string());
        }
        if self.closed > 0 {
            counts.push(format!("-{}", self.closed).red().to_string());
        }

        if counts.is_empty() {
            self.to_string()
        } else {
            format!("{} {}", self, counts.join(" "))
        }
    }
}

impl Render for RepeatSchedule {
    fn render(&self) -> String {
        let when = if self.all_day {
            self.starts_on.format("%a %b %-d").to_string()
        } else {
            self.starts_on.format("%a %b %-d %H:%M").to_string()
        };

        let Some(freq) = self.repeat_on.filter(|_| self.repeat_this_event) else {
            return when;
        };

        let mut repeat = format!("repeats {}", freq.to_string().to_lowercase());
        if self.weekdays.any() {
            let days: Vec<_> = self.weekdays.days().iter().map(|d| d.to_string()).collect();
            repeat.push_str(&format!(" on {}", days.join(",")));
        }
        if let Some(till) = self.repeat_till {
            repeat.push_str(&format!(" until {till}"));
        }

        format!("{when} ({repeat})")
    }
}

impl Render for CalendarEvent {
    fn render(&self) -> String {
        let schedule = self.schedule.render();
        match self.status {
            LocalStatus::Open => format!("{} {}", self.subject, schedule.dimmed()),
            LocalStatus::Closed => format!(
                "{} {} {}",
                self.subject.strikethrough(),
                schedule.dimmed(),
                "closed".red()
            ),
        }
    }
}
