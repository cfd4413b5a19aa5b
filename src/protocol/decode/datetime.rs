//! DATE, TIMESTAMP and INTERVAL value decoding.
//!
//! Temporal values travel as signed microseconds relative to
//! 2000-01-01 00:00:00. Intervals travel as months (year-to-month) or
//! microseconds (day-to-second).

use crate::error::{Error, Result};
use crate::protocol::constants::DATETIME_EPOCH_YEAR;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

const US_PER_SECOND: i64 = 1_000_000;
const US_PER_MINUTE: i64 = 60 * US_PER_SECOND;
const US_PER_HOUR: i64 = 60 * US_PER_MINUTE;
const US_PER_DAY: i64 = 24 * US_PER_HOUR;

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(DATETIME_EPOCH_YEAR, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert wire microseconds to a datetime.
pub fn decode_datetime(micros: i64) -> Result<NaiveDateTime> {
    epoch()
        .checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| Error::type_error(format!("datetime out of range: {} us", micros)))
}

/// Convert a datetime to wire microseconds.
pub fn encode_datetime(dt: &NaiveDateTime) -> i64 {
    dt.signed_duration_since(epoch())
        .num_microseconds()
        .unwrap_or(i64::MAX)
}

/// Convert wire microseconds since midnight to a time of day.
pub fn decode_time(micros: i64) -> Result<NaiveTime> {
    let of_day = micros.rem_euclid(US_PER_DAY);
    let secs = (of_day / US_PER_SECOND) as u32;
    let nanos = ((of_day % US_PER_SECOND) * 1000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .ok_or_else(|| Error::type_error(format!("time out of range: {} us", micros)))
}

/// Format a year-to-month interval as `[-]Y-MM`.
///
/// Negative intervals keep their sign in front of the magnitude.
pub fn format_interval_ym(months: i32) -> String {
    let sign = if months < 0 { "-" } else { "" };
    let abs = months.unsigned_abs();
    format!("{}{}-{:02}", sign, abs / 12, abs % 12)
}

/// Format a day-to-second interval as `[-]DD HH:MM:SS.f`.
///
/// Negative intervals keep their sign in front of the magnitude. The
/// fraction drops trailing zeros and is `0` for whole seconds.
pub fn format_interval_ds(micros: i64) -> String {
    const SECOND: u64 = US_PER_SECOND as u64;
    const MINUTE: u64 = US_PER_MINUTE as u64;
    const HOUR: u64 = US_PER_HOUR as u64;
    const DAY: u64 = US_PER_DAY as u64;

    let sign = if micros < 0 { "-" } else { "" };
    let mut rest = micros.unsigned_abs();
    let days = rest / DAY;
    rest %= DAY;
    let hours = rest / HOUR;
    rest %= HOUR;
    let minutes = rest / MINUTE;
    rest %= MINUTE;
    let seconds = rest / SECOND;
    let fraction = rest % SECOND;

    let fraction = if fraction == 0 {
        "0".to_string()
    } else {
        format!("{:06}", fraction).trim_end_matches('0').to_string()
    };
    format!(
        "{}{:02} {:02}:{:02}:{:02}.{}",
        sign, days, hours, minutes, seconds, fraction
    )
}
