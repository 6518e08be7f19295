//! Resolve "Nth weekday of the month" rules to a concrete date.
//!
//! Monthly rules like `BYDAY=4TH` (fourth Thursday) are stored locally as a
//! single start date that the local calendar then repeats monthly. The date
//! is picked near "now": the first matching weekday on or after now, shifted
//! week by week until its week-of-month equals the ordinal.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

/// "Last week of the month" is approximated as the 4th week. Nextcloud emits
/// -1 (or -2) for it, and every weekday has a 4th-week occurrence in every
/// month, so the search always lands.
pub const LAST_WEEK_ORDINAL: u32 = 4;

const MAX_ORDINAL: u32 = 5;

/// Upper bound on week steps. The walk only crosses into neighbouring
/// months when the target week is missing (a Monday in week 1 needs a month
/// that starts on a Monday), and such a month is never two years away.
const MAX_WEEK_STEPS: usize = 104;

/// Week of month, counting Monday-started weeks:
/// `ceil((day_of_month + weekday_of_first_day) / 7)`.
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_offset = date.with_day(1).unwrap_or(date).weekday().num_days_from_monday();
    (date.day() + first_offset).div_ceil(7)
}

/// Resolve relative to the current time.
pub fn resolve(ordinal: i32, weekday: Weekday) -> DateTime<Utc> {
    resolve_from(Utc::now(), ordinal, weekday)
}

/// Resolve relative to `anchor`, keeping the anchor's time of day.
///
/// When the month reached first has no occurrence of `weekday` in the
/// requested week (1st and 5th weeks are not guaranteed), the walk keeps
/// going in the same direction into the neighbouring months until one does.
pub fn resolve_from(anchor: DateTime<Utc>, ordinal: i32, weekday: Weekday) -> DateTime<Utc> {
    let target = target_week(ordinal);

    let mut current = anchor;
    while current.weekday() != weekday {
        current += Duration::days(1);
    }

    for _ in 0..MAX_WEEK_STEPS {
        let week = week_of_month(current.date_naive());
        if week == target {
            return current;
        }

        current = if week < target {
            current + Duration::weeks(1)
        } else {
            current - Duration::weeks(1)
        };
    }

    tracing::warn!(
        target_week = target,
        %weekday,
        %anchor,
        "no matching week found, using last candidate"
    );
    current
}

fn target_week(ordinal: i32) -> u32 {
    if ordinal < 0 {
        LAST_WEEK_ORDINAL
    } else {
        (ordinal as u32).clamp(1, MAX_ORDINAL)
    }
}
