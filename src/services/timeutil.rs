//! Time and distance primitives.
//!
//! Clock times cross the contract boundary as "HH:MM" strings; internally
//! everything is minute offsets. Malformed input yields `None`, never a
//! panic. Callers must check before deriving further values.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Parse "HH:MM" (24h) into minutes since midnight. Rejects out-of-range
/// hour/minute and malformed strings.
pub fn time_to_minutes(s: &str) -> Option<i32> {
    let (h, m) = s.split_once(':')?;
    if h.is_empty() || m.is_empty() || m.len() != 2 {
        return None;
    }
    let hours: i32 = h.trim().parse().ok()?;
    let minutes: i32 = m.trim().parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Format minutes since midnight as "HH:MM", wrapping modulo 24h.
/// Negative input wraps backwards.
pub fn minutes_to_time(minutes: i32) -> String {
    let wrapped = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

/// Add minutes to an "HH:MM" time, wrapping modulo 24h.
pub fn add_minutes(time: &str, minutes: i32) -> Option<String> {
    Some(minutes_to_time(time_to_minutes(time)? + minutes))
}

/// Subtract minutes from an "HH:MM" time, wrapping modulo 24h.
pub fn subtract_minutes(time: &str, minutes: i32) -> Option<String> {
    add_minutes(time, -minutes)
}

/// Straight travel time from distance and a minutes-per-km rate.
pub fn travel_minutes(distance_km: f64, minutes_per_km: f64) -> i32 {
    (distance_km * minutes_per_km).round() as i32
}

/// Minutes from `from` to `to` (may be negative).
pub fn minutes_between(from: &str, to: &str) -> Option<i32> {
    Some(time_to_minutes(to)? - time_to_minutes(from)?)
}

/// Combine an ISO date and "HH:MM" into a datetime. `None` on malformed
/// input rather than a panic.
pub fn to_date_time(date: NaiveDate, time: &str) -> Option<NaiveDateTime> {
    let minutes = time_to_minutes(time)?;
    let t = NaiveTime::from_hms_opt(minutes as u32 / 60, minutes as u32 % 60, 0)?;
    Some(date.and_time(t))
}

/// Roll an end instant forward by 24h when it precedes its start: an end
/// interval must never compute earlier than its start (hub returns that
/// span midnight land on the next calendar day).
pub fn ensure_end_after_start(start: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
    if end < start {
        end + Duration::hours(24)
    } else {
        end
    }
}

/// Same roll in minute-offset space: end stays >= start by crossing into
/// the next day's offsets (values above 24h×60).
pub fn roll_end_minutes(start_minutes: i32, end_minutes: i32) -> i32 {
    if end_minutes < start_minutes {
        end_minutes + MINUTES_PER_DAY
    } else {
        end_minutes
    }
}
