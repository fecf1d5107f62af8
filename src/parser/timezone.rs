//! Civil-time conversion for the venue timezone (Australian Eastern).
//!
//! The source site publishes venue-local times with no offset. Daylight
//! saving (AEDT, UTC+11) runs from the first Sunday in October to the
//! first Sunday in April; standard time (AEST, UTC+10) otherwise. The
//! boundary months use a day-of-month approximation rather than the exact
//! Sunday, which keeps the conversion a pure function of the date.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// UTC offset in hours for a civil date in the venue timezone.
pub fn utc_offset_hours(date: NaiveDate) -> i64 {
    use chrono::Datelike;
    match date.month() {
        11 | 12 | 1 | 2 => 11,
        5..=9 => 10,
        10 => {
            if date.day() >= 7 {
                11
            } else {
                10
            }
        }
        3 => {
            if date.day() <= 7 {
                11
            } else {
                10
            }
        }
        // April reverts to standard time
        _ => 10,
    }
}

/// Convert a venue-civil datetime to UTC.
pub fn civil_to_utc(local: NaiveDateTime) -> DateTime<Utc> {
    let offset = utc_offset_hours(local.date());
    Utc.from_utc_datetime(&(local - Duration::hours(offset)))
}

/// The venue-civil date on which a UTC instant falls.
pub fn venue_civil_date(utc: DateTime<Utc>) -> NaiveDate {
    // First approximation with the standard offset, then re-resolve in
    // case the instant lands on the other side of a DST boundary.
    let approx = (utc + Duration::hours(10)).date_naive();
    let offset = utc_offset_hours(approx);
    (utc + Duration::hours(offset)).date_naive()
}
