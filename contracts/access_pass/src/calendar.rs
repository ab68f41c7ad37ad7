//! Calendar arithmetic on ledger timestamps (seconds since the Unix epoch, UTC).
//!
//! Billing cycles are whole calendar months; quota is counted per calendar day.

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Index of the calendar day containing `timestamp`, after shifting by `offset_seconds`.
pub fn day_index(timestamp: u64, offset_seconds: i64) -> u64 {
    let shifted = if offset_seconds >= 0 {
        timestamp.saturating_add(offset_seconds as u64)
    } else {
        timestamp.saturating_sub(offset_seconds.unsigned_abs())
    };
    shifted / SECONDS_PER_DAY
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let m = month as i64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`]: `(year, month, day)`.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if is_leap(year) => 29,
        _ => 28,
    }
}

/// `timestamp` moved forward by `months` calendar months, keeping the time of day.
///
/// The day of month is clamped to the target month's length, so Jan 31 + 1
/// month is Feb 28 (or 29) while Jan 31 + 2 months is Mar 31.
/// Returns `None` on overflow.
pub fn add_months(timestamp: u64, months: u32) -> Option<u64> {
    let days = (timestamp / SECONDS_PER_DAY) as i64;
    let secs_of_day = timestamp % SECONDS_PER_DAY;
    let (year, month, day) = civil_from_days(days);

    let month_zero = (month as i64 - 1).checked_add(months as i64)?;
    let target_year = year.checked_add(month_zero / 12)?;
    let target_month = (month_zero % 12) as u32 + 1;
    let target_day = day.min(days_in_month(target_year, target_month));

    let target_days = days_from_civil(target_year, target_month, target_day);
    let target_days = u64::try_from(target_days).ok()?;
    target_days
        .checked_mul(SECONDS_PER_DAY)?
        .checked_add(secs_of_day)
}

#[cfg(test)]
mod test {
    use super::*;

    const JAN_1_2026: u64 = 1_767_225_600;
    const JAN_31_2026: u64 = JAN_1_2026 + 30 * SECONDS_PER_DAY;

    #[test]
    fn test_civil_round_trip_known_dates() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2026, 1, 1), 20_454);
        assert_eq!(civil_from_days(20_454), (2026, 1, 1));
        assert_eq!(civil_from_days(days_from_civil(2024, 2, 29)), (2024, 2, 29));
    }

    #[test]
    fn test_add_one_month() {
        assert_eq!(add_months(JAN_1_2026, 1), Some(JAN_1_2026 + 31 * SECONDS_PER_DAY));
    }

    #[test]
    fn test_add_months_clamps_end_of_month() {
        let feb_28 = JAN_1_2026 + (31 + 27) * SECONDS_PER_DAY;
        let mar_31 = JAN_1_2026 + (31 + 28 + 30) * SECONDS_PER_DAY;
        assert_eq!(add_months(JAN_31_2026, 1), Some(feb_28));
        assert_eq!(add_months(JAN_31_2026, 2), Some(mar_31));
    }

    #[test]
    fn test_add_months_crosses_year_and_keeps_time_of_day() {
        let dec_15_noon = days_from_civil(2025, 12, 15) as u64 * SECONDS_PER_DAY + 43_200;
        let jan_15_noon = days_from_civil(2026, 1, 15) as u64 * SECONDS_PER_DAY + 43_200;
        assert_eq!(add_months(dec_15_noon, 1), Some(jan_15_noon));
    }

    #[test]
    fn test_leap_february() {
        let jan_31_2024 = days_from_civil(2024, 1, 31) as u64 * SECONDS_PER_DAY;
        let feb_29_2024 = days_from_civil(2024, 2, 29) as u64 * SECONDS_PER_DAY;
        assert_eq!(add_months(jan_31_2024, 1), Some(feb_29_2024));
    }

    #[test]
    fn test_day_index_applies_offset() {
        let late_evening = JAN_1_2026 + 23 * 3600 + 30 * 60;
        assert_eq!(day_index(late_evening, 0), 20_454);
        // One hour east of UTC the same instant is already the next day.
        assert_eq!(day_index(late_evening, 3600), 20_455);
        assert_eq!(day_index(JAN_1_2026, -3600), 20_453);
    }
}
