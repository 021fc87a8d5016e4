//! Staff submission window.
//!
//! Polls for a meal date may only be created, edited or deleted until 06:00
//! local time on the day before the meal (hour configurable). Weekends are
//! globally ineligible. The admission decision is a pure function of two
//! timestamps; the ticking UI clock merely re-evaluates it every second.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// Whether the date falls on a Saturday or Sunday.
#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The submission deadline for a meal date: `deadline_hour`:00 local time on
/// the preceding day. `None` only at the calendar edge.
#[must_use]
pub fn deadline(meal_date: NaiveDate, deadline_hour: u32) -> Option<NaiveDateTime> {
    meal_date
        .pred_opt()
        .and_then(|day_before| day_before.and_hms_opt(deadline_hour, 0, 0))
}

/// Time left until the submission deadline, clamped to zero.
///
/// Zero when the meal date is today or in the past, and from the deadline
/// instant onwards. Non-increasing as `now` advances for a fixed meal date.
#[must_use]
pub fn remaining(now: NaiveDateTime, meal_date: NaiveDate, deadline_hour: u32) -> Duration {
    if meal_date <= now.date() {
        return Duration::zero();
    }
    match deadline(meal_date, deadline_hour) {
        Some(deadline) if deadline > now => deadline - now,
        _ => Duration::zero(),
    }
}

/// Whether the submission window for a meal date is still open.
#[must_use]
pub fn is_open(now: NaiveDateTime, meal_date: NaiveDate, deadline_hour: u32) -> bool {
    remaining(now, meal_date, deadline_hour) > Duration::zero()
}

/// Format a countdown as `HH:MM:SS`, with a leading days segment (`D:`) only
/// when at least one full day remains.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}:{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
