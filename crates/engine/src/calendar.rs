//! Calendar month helpers.
//!
//! Timestamps are stored in UTC, but "this month" is the month on the wall
//! clock of the configured time zone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// First instant of the calendar month `now` falls in, seen from `tz`.
#[must_use]
pub fn month_start(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    NaiveDate::from_ymd_opt(local.year(), local.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or(now)
}

/// Half-open range `[start, end)` of the calendar month `at` falls in.
#[must_use]
pub fn month_bounds(at: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = month_start(at, tz);
    // 32 days past the first always lands in the following month.
    let end = month_start(start + Duration::days(32), tz);
    (start, end)
}

/// Whether `a` and `b` share (year, month) in `tz`.
#[must_use]
pub fn same_month(a: DateTime<Utc>, b: DateTime<Utc>, tz: Tz) -> bool {
    let (a, b) = (a.with_timezone(&tz), b.with_timezone(&tz));
    a.year() == b.year() && a.month() == b.month()
}
