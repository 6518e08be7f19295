//! Local repeat schedules.
//!
//! The local calendar does not understand RRULEs. It stores a start/end, a
//! "repeat on" frequency, an optional end date and one flag per weekday.
//! [`RepeatSchedule::from_remote`] translates a remote event into that shape.

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::event::EventTime;
use crate::ordinal;
use crate::recurrence::{Frequency, RecurrenceRule, WEEKDAY_CODES, weekday_from_code};

/// Length of the placeholder slot written for monthly ordinal rules.
const MONTHLY_SLOT_MINUTES: i64 = 5;

/// Signed ordinals recognized in a monthly BYDAY value, in scan order.
const MONTHLY_ORDINALS: [&str; 7] = ["-2", "-1", "1", "2", "3", "4", "5"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayFlags {
    pub sunday: bool,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
}

impl WeekdayFlags {
    pub fn set(&mut self, day: Weekday) {
        *self.flag_mut(day) = true;
    }

    pub fn is_set(&self, day: Weekday) -> bool {
        match day {
            Weekday::Sun => self.sunday,
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
        }
    }

    pub fn any(&self) -> bool {
        WEEKDAY_CODES.iter().any(|(_, day)| self.is_set(*day))
    }

    /// Enabled days in Monday-first order.
    pub fn days(&self) -> Vec<Weekday> {
        WEEKDAY_CODES
            .iter()
            .map(|(_, day)| *day)
            .filter(|day| self.is_set(*day))
            .collect()
    }

    fn flag_mut(&mut self, day: Weekday) -> &mut bool {
        match day {
            Weekday::Sun => &mut self.sunday,
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
        }
    }
}

/// How a local calendar event repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatSchedule {
    pub starts_on: DateTime<Utc>,
    pub ends_on: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub repeat_this_event: bool,
    pub repeat_on: Option<Frequency>,
    pub repeat_till: Option<NaiveDate>,
    #[serde(flatten)]
    pub weekdays: WeekdayFlags,
}

impl RepeatSchedule {
    /// Build the schedule for a remote event.
    ///
    /// `now` anchors the date picked for monthly ordinal rules.
    pub fn from_remote(
        recurrence: Option<&str>,
        start: &EventTime,
        end: &EventTime,
        now: DateTime<Utc>,
    ) -> Self {
        let mut schedule = RepeatSchedule {
            starts_on: start.to_utc(),
            ends_on: Some(end.to_utc()),
            all_day: start.is_date_only(),
            repeat_this_event: recurrence.is_some(),
            repeat_on: None,
            repeat_till: None,
            weekdays: WeekdayFlags::default(),
        };

        let Some(line) = recurrence else {
            return schedule;
        };

        let rule = RecurrenceRule::parse(line);
        schedule.repeat_on = rule.frequency;

        match rule.frequency {
            Some(Frequency::Daily) | Some(Frequency::Yearly) => {
                schedule.ends_on = None;
                schedule.repeat_till = rule.until_date();
            }
            Some(Frequency::Weekly) => {
                if let Some(days) = rule.byday_value() {
                    schedule.repeat_till = rule.until_date();
                    for code in days.split(',') {
                        match weekday_from_code(code.trim()) {
                            Some(day) => schedule.weekdays.set(day),
                            None => tracing::debug!(code, "ignoring unknown BYDAY code"),
                        }
                    }
                }
            }
            Some(Frequency::Monthly) => {
                if let Some(byday) = rule.byday_value() {
                    schedule.apply_monthly(byday, now);
                    schedule.repeat_till = rule.until_date();
                }
            }
            None => {
                tracing::debug!(line, "recurrence has no recognized frequency");
            }
        }

        schedule
    }

    /// Pin a monthly ordinal rule (e.g. `4TH`) to a short slot on the
    /// resolved date. The event's own times are dropped.
    fn apply_monthly(&mut self, byday: &str, now: DateTime<Utc>) {
        let ordinal = MONTHLY_ORDINALS
            .iter()
            .find(|n| byday.contains(**n))
            .and_then(|n| n.parse::<i32>().ok());

        let weekday = WEEKDAY_CODES
            .iter()
            .find(|(code, _)| byday.contains(code))
            .map(|(_, day)| *day);

        let (Some(ordinal), Some(weekday)) = (ordinal, weekday) else {
            tracing::warn!(byday, "monthly rule without ordinal weekday, keeping event times");
            return;
        };

        let starts_on = ordinal::resolve_from(now, ordinal, weekday);
        self.starts_on = starts_on;
        self.ends_on = Some(starts_on + Duration::minutes(MONTHLY_SLOT_MINUTES));
    }
}
