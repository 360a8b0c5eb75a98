use chrono::{Datelike, NaiveDate, Weekday};

/// Count Monday-Friday days in the closed range `[start, end]`.
///
/// Returns 0 when `start > end`. Holidays are not considered.
pub fn count_business_days(start: NaiveDate, end: NaiveDate) -> u32 {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_weekday(*d))
        .map(|_| 1)
        .sum()
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_week() {
        // 2024-03-04 is a Monday
        assert_eq!(count_business_days(date(2024, 3, 4), date(2024, 3, 10)), 5);
        assert_eq!(count_business_days(date(2024, 3, 4), date(2024, 3, 8)), 5);
    }

    #[test]
    fn test_same_day() {
        assert_eq!(count_business_days(date(2024, 3, 6), date(2024, 3, 6)), 1);
        // Saturday
        assert_eq!(count_business_days(date(2024, 3, 9), date(2024, 3, 9)), 0);
        // Sunday
        assert_eq!(count_business_days(date(2024, 3, 10), date(2024, 3, 10)), 0);
    }

    #[test]
    fn test_reversed_range_is_zero() {
        assert_eq!(count_business_days(date(2024, 3, 8), date(2024, 3, 4)), 0);
    }

    #[test]
    fn test_weekend_only_range() {
        assert_eq!(count_business_days(date(2024, 3, 9), date(2024, 3, 10)), 0);
    }

    #[test]
    fn test_spans_month_and_leap_day() {
        // Mon 2024-02-26 .. Fri 2024-03-08: two full weeks, includes Feb 29
        assert_eq!(count_business_days(date(2024, 2, 26), date(2024, 3, 8)), 10);
    }

    #[test]
    fn test_matches_brute_force_over_a_year() {
        let start = date(2023, 1, 1);
        for offset in 0..400 {
            let end = start + chrono::Duration::days(offset);
            let mut expected = 0;
            let mut d = start;
            while d <= end {
                if d.weekday().number_from_monday() <= 5 {
                    expected += 1;
                }
                d = d.succ_opt().unwrap();
            }
            assert_eq!(count_business_days(start, end), expected, "end={end}");
        }
    }
}
