//! RRULE tokenizing.
//!
//! Only the subset Nextcloud emits for its "repeat" dialog is understood:
//! `FREQ` (daily, weekly, monthly, yearly), `UNTIL` and `BYDAY`. Anything
//! else in the rule is ignored rather than rejected.

use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

const FREQUENCIES: [(&str, Frequency); 4] = [
    ("RRULE:FREQ=DAILY", Frequency::Daily),
    ("RRULE:FREQ=WEEKLY", Frequency::Weekly),
    ("RRULE:FREQ=MONTHLY", Frequency::Monthly),
    ("RRULE:FREQ=YEARLY", Frequency::Yearly),
];

/// Two-letter BYDAY codes, in the order they are scanned.
pub const WEEKDAY_CODES: [(&str, Weekday); 7] = [
    ("MO", Weekday::Mon),
    ("TU", Weekday::Tue),
    ("WE", Weekday::Wed),
    ("TH", Weekday::Thu),
    ("FR", Weekday::Fri),
    ("SA", Weekday::Sat),
    ("SU", Weekday::Sun),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Look up a full frequency token such as `RRULE:FREQ=WEEKLY`.
    pub fn from_token(token: &str) -> Option<Self> {
        FREQUENCIES
            .iter()
            .find(|(code, _)| *code == token)
            .map(|(_, freq)| *freq)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        };
        f.write_str(label)
    }
}

/// Map a BYDAY code (`MO`, `TU`, ...) to a weekday.
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    WEEKDAY_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, day)| *day)
}

/// The pieces of a recurrence line the schedule mapper cares about.
///
/// `until` and `byday` keep the raw `KEY=value` token; use
/// [`until_date`](Self::until_date) and [`byday_value`](Self::byday_value)
/// to read them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Option<Frequency>,
    pub until: Option<String>,
    pub byday: Option<String>,
}

impl RecurrenceRule {
    /// Split a line like `RRULE:FREQ=WEEKLY;BYDAY=MO,TU,TH;UNTIL=20191028`.
    ///
    /// Never fails. Unknown tokens are skipped and missing parts stay `None`.
    pub fn parse(line: &str) -> Self {
        let mut rule = RecurrenceRule::default();

        for token in line.split(';') {
            if token.contains("RRULE:FREQ") {
                rule.frequency = Frequency::from_token(token.trim());
            } else if token.contains("UNTIL") {
                rule.until = Some(token.to_string());
            } else if token.contains("BYDAY") {
                rule.byday = Some(token.to_string());
            }
        }

        rule
    }

    /// Parsed UNTIL date. Only the `YYYYMMDD` prefix is read, so both
    /// `UNTIL=20191028` and `UNTIL=20191028T235959Z` work.
    pub fn until_date(&self) -> Option<NaiveDate> {
        let value = token_value(self.until.as_deref()?);
        let date = value.get(..8)?;
        NaiveDate::parse_from_str(date, "%Y%m%d").ok()
    }

    /// The value part of the BYDAY token, e.g. `MO,TU,TH` or `4TH`.
    pub fn byday_value(&self) -> Option<&str> {
        self.byday.as_deref().map(token_value)
    }
}

fn token_value(token: &str) -> &str {
    token.split_once('=').map(|(_, v)| v.trim()).unwrap_or("")
}
