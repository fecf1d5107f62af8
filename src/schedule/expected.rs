//! Expected-date generation for recurring templates.

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{Frequency, RecurringGame};

/// Civil dates on which a template is expected to run within
/// `[start, end]` inclusive.
///
/// Output is sorted ascending with no duplicates, every date falls on the
/// template's weekday, and dates outside the template's own start/end
/// bounds are excluded.
pub fn expected_dates(template: &RecurringGame, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let lower = match template.start_date {
        Some(s) if s > start => s,
        _ => start,
    };
    let upper = match template.end_date {
        Some(e) if e < end => e,
        _ => end,
    };
    if lower > upper {
        return Vec::new();
    }

    match template.frequency {
        Frequency::Weekly => matching_days(template, lower, upper, 1),
        Frequency::Fortnightly => fortnightly(template, lower, upper),
        Frequency::Monthly => nth_weekday_months(template, lower, upper, 1),
        Frequency::Quarterly => nth_weekday_months(template, lower, upper, 3),
        Frequency::Yearly => nth_weekday_months(template, lower, upper, 12),
    }
}

/// First date on or after `from` that falls on the template's weekday.
fn first_matching_day(template: &RecurringGame, from: NaiveDate) -> NaiveDate {
    let mut date = from;
    while date.weekday() != template.day_of_week {
        date += Duration::days(1);
    }
    date
}

fn matching_days(
    template: &RecurringGame,
    lower: NaiveDate,
    upper: NaiveDate,
    step_weeks: i64,
) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut date = first_matching_day(template, lower);
    while date <= upper {
        dates.push(date);
        date += Duration::weeks(step_weeks);
    }
    dates
}

/// Every second matching day, with parity anchored at the template's own
/// start date so two adjacent windows agree on which weeks are "on".
fn fortnightly(template: &RecurringGame, lower: NaiveDate, upper: NaiveDate) -> Vec<NaiveDate> {
    let anchor_from = template.start_date.unwrap_or(lower);
    let anchor = first_matching_day(template, anchor_from);

    let mut dates = Vec::new();
    let mut date = first_matching_day(template, lower);
    while date <= upper {
        let weeks_from_anchor = (date - anchor).num_days() / 7;
        if weeks_from_anchor % 2 == 0 {
            dates.push(date);
        }
        date += Duration::weeks(1);
    }
    dates
}

/// The ordinal (1st, 2nd, ...) of a weekday within its month.
fn weekday_ordinal(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

/// The nth matching weekday of a given month, if the month has one.
fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: chrono::Weekday,
    ordinal: u32,
) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset =
        (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    let day = 1 + offset + (ordinal - 1) * 7;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Monthly/quarterly/yearly: repeat the nth-weekday-of-month pattern seen
/// at the anchor, every `month_step` months.
fn nth_weekday_months(
    template: &RecurringGame,
    lower: NaiveDate,
    upper: NaiveDate,
    month_step: u32,
) -> Vec<NaiveDate> {
    let anchor_from = template.start_date.unwrap_or(lower);
    let anchor = first_matching_day(template, anchor_from);
    let ordinal = weekday_ordinal(anchor);

    let mut dates = Vec::new();
    let mut year = anchor.year();
    let mut month = anchor.month();

    loop {
        if let Some(date) = nth_weekday_of_month(year, month, template.day_of_week, ordinal) {
            if date > upper {
                break;
            }
            if date >= lower {
                dates.push(date);
            }
        } else if NaiveDate::from_ymd_opt(year, month, 1).map(|d| d > upper).unwrap_or(true) {
            break;
        }

        let total = year as i64 * 12 + (month as i64 - 1) + month_step as i64;
        year = (total / 12) as i32;
        month = (total % 12) as u32 + 1;
    }

    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn template(day: Weekday, frequency: Frequency, start: Option<NaiveDate>) -> RecurringGame {
        RecurringGame {
            id: "T1".into(),
            entity_id: "E1".into(),
            venue_id: "V1".into(),
            display_name: "Test".into(),
            day_of_week: day,
            frequency,
            start_date: start,
            end_date: None,
            is_active: true,
            is_paused: false,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weekly_tuesdays_in_january() {
        let t = template(Weekday::Tue, Frequency::Weekly, Some(d(2025, 1, 1)));
        let dates = expected_dates(&t, d(2025, 1, 1), d(2025, 1, 31));
        assert_eq!(
            dates,
            vec![d(2025, 1, 7), d(2025, 1, 14), d(2025, 1, 21), d(2025, 1, 28)]
        );
        assert!(dates.iter().all(|x| x.weekday() == Weekday::Tue));
    }

    #[test]
    fn test_fortnightly_parity_is_window_independent() {
        let t = template(Weekday::Tue, Frequency::Fortnightly, Some(d(2025, 1, 1)));
        // Anchor is Tue 2025-01-07; even weeks from it are on
        let january = expected_dates(&t, d(2025, 1, 1), d(2025, 1, 31));
        assert_eq!(january, vec![d(2025, 1, 7), d(2025, 1, 21)]);

        // A window starting mid-cycle keeps the same parity
        let later = expected_dates(&t, d(2025, 1, 10), d(2025, 2, 10));
        assert_eq!(later, vec![d(2025, 1, 21), d(2025, 2, 4)]);
    }

    #[test]
    fn test_monthly_nth_weekday_pattern() {
        // Anchor Tue 2025-01-14 is the second Tuesday
        let t = template(Weekday::Tue, Frequency::Monthly, Some(d(2025, 1, 8)));
        let dates = expected_dates(&t, d(2025, 1, 1), d(2025, 3, 31));
        assert_eq!(dates, vec![d(2025, 1, 14), d(2025, 2, 11), d(2025, 3, 11)]);
        assert!(dates.iter().all(|x| weekday_ordinal(*x) == 2));
    }

    #[test]
    fn test_quarterly_and_yearly() {
        let t = template(Weekday::Sun, Frequency::Quarterly, Some(d(2025, 1, 1)));
        let dates = expected_dates(&t, d(2025, 1, 1), d(2025, 12, 31));
        assert_eq!(dates, vec![d(2025, 1, 5), d(2025, 4, 6), d(2025, 7, 6), d(2025, 10, 5)]);

        let t = template(Weekday::Sun, Frequency::Yearly, Some(d(2025, 1, 1)));
        let dates = expected_dates(&t, d(2025, 1, 1), d(2027, 12, 31));
        assert_eq!(dates, vec![d(2025, 1, 5), d(2026, 1, 4), d(2027, 1, 3)]);
    }

    #[test]
    fn test_template_bounds_clip_window() {
        let mut t = template(Weekday::Tue, Frequency::Weekly, Some(d(2025, 1, 10)));
        t.end_date = Some(d(2025, 1, 25));
        let dates = expected_dates(&t, d(2025, 1, 1), d(2025, 1, 31));
        assert_eq!(dates, vec![d(2025, 1, 14), d(2025, 1, 21)]);
    }

    #[test]
    fn test_empty_when_window_precedes_start() {
        let t = template(Weekday::Tue, Frequency::Weekly, Some(d(2025, 6, 1)));
        assert!(expected_dates(&t, d(2025, 1, 1), d(2025, 1, 31)).is_empty());
    }

    #[test]
    fn test_sorted_and_unique() {
        let t = template(Weekday::Fri, Frequency::Weekly, None);
        let dates = expected_dates(&t, d(2025, 3, 1), d(2025, 5, 31));
        let mut sorted = dates.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(dates, sorted);
    }
}
