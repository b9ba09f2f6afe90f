use chrono::{prelude::*, Duration};
use chrono_tz::Tz;

pub fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 100 != 0 && year % 4 == 0)
}

// month: January -> 1
pub fn get_month_length(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Years a reminder can be scheduled in
pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2100;

/// Validates a civil calendar date, e.g. rejects the 30th of February
pub fn valid_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
        return None;
    }
    if day < 1 || day > get_month_length(year, month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Number of whole months between the month of `from` and the month of `to`
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64 - from.month() as i64
}

/// The first day of the month that is `months` months after the month of `date`
pub fn first_of_month_after(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let index = date.year() as i64 * 12 + date.month0() as i64 + months;
    let year = index.div_euclid(12) as i32;
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// The Monday of the ISO week `date` belongs to
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Converts a civil date and time in `tz` into an absolute instant.
///
/// A civil time that falls inside a daylight-saving gap does not exist, so
/// the first valid instant after the gap is used instead. An ambiguous civil
/// time (clocks turned back) resolves to the earlier of the two instants.
pub fn localize(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }
    // Gaps are at most a few hours wide, step forward until we are out of it
    let mut probe = naive;
    for _ in 0..(4 * 60) {
        probe += Duration::minutes(1);
        if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
            return dt.with_timezone(&Utc);
        }
    }
    // No real-world zone has a gap this wide, treat the civil time as UTC
    Utc.from_utc_datetime(&naive)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono_tz::America::New_York;

    #[test]
    fn it_accepts_valid_dates() {
        let valid_dates = vec![(2018, 1, 1), (2025, 12, 31), (2020, 2, 29), (2020, 4, 30)];

        for (y, m, d) in valid_dates {
            assert!(valid_date(y, m, d).is_some());
        }
    }

    #[test]
    fn it_rejects_invalid_dates() {
        let invalid_dates = vec![(2020, 1, 32), (2021, 2, 29), (2020, 0, 1), (2020, 1, 0), (2020, 13, 1)];

        for (y, m, d) in invalid_dates {
            assert!(valid_date(y, m, d).is_none());
        }
    }

    #[test]
    fn month_arithmetic() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            first_of_month_after(jan, 1),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
        assert_eq!(
            first_of_month_after(jan, 12),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(
            first_of_month_after(jan, -1),
            NaiveDate::from_ymd_opt(2023, 12, 1)
        );
        let dec = NaiveDate::from_ymd_opt(2024, 12, 3).unwrap();
        assert_eq!(months_between(jan, dec), 11);
        assert_eq!(months_between(dec, jan), -11);
    }

    #[test]
    fn localize_handles_dst_gap_and_overlap() {
        // 2024-03-10 02:30 does not exist in New York
        let gap = localize(
            &New_York,
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            NaiveTime::from_hms_opt(2, 30, 0).unwrap(),
        );
        assert_eq!(gap, Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap());

        // 2024-11-03 01:30 happens twice, the EDT one comes first
        let overlap = localize(
            &New_York,
            NaiveDate::from_ymd_opt(2024, 11, 3).unwrap(),
            NaiveTime::from_hms_opt(1, 30, 0).unwrap(),
        );
        assert_eq!(overlap, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }
}
