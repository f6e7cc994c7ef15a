//! Business-day calendar arithmetic.
//!
//! The calendar is Monday to Friday only. Holidays are not modelled, so a
//! market holiday counts as a working day everywhere in the pipeline.
//!
//! Weekend inputs are snapped back to the preceding Friday before any offset
//! is applied, for past and future offsets alike. That means "one working
//! day before Saturday" is Thursday, not Friday.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Returns true for Monday through Friday.
#[must_use]
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Maps Saturday and Sunday to the preceding Friday; any other day is returned unchanged.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use stock_forecast_core::calendar::most_recent_working_date;
///
/// let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
/// let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// assert_eq!(most_recent_working_date(sunday), friday);
/// ```
#[must_use]
pub fn most_recent_working_date(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date - Duration::days(2),
        _ => date,
    }
}

/// Returns the date `n` business days before `date`.
///
/// A negative `n` moves forward in time: `-5` is the date five business days
/// after `date`.
///
/// The date is first anchored on the Friday of its week. Weekdays move
/// forward to that Friday and `n` grows by the same number of days; weekend
/// days snap back to the previous Friday without adjusting `n`. From the
/// Friday anchor, every full block of five business days spans seven
/// calendar days, so the calendar offset is `n + 2 * floor(n / 5)`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use stock_forecast_core::calendar::nth_previous_working_date;
///
/// let thursday = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
/// assert_eq!(
///     nth_previous_working_date(7, thursday),
///     NaiveDate::from_ymd_opt(2024, 4, 23).unwrap()
/// );
/// assert_eq!(
///     nth_previous_working_date(-5, thursday),
///     NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()
/// );
/// ```
#[must_use]
pub fn nth_previous_working_date(n: i64, date: NaiveDate) -> NaiveDate {
    let (anchor, n) = match date.weekday() {
        Weekday::Sat => (date - Duration::days(1), n),
        Weekday::Sun => (date - Duration::days(2), n),
        weekday => {
            let to_friday = 4 - i64::from(weekday.num_days_from_monday());
            (date + Duration::days(to_friday), n + to_friday)
        }
    };

    // div_euclid floors for a positive divisor, so -1 / 5 lands on -1.
    let calendar_days = n + 2 * n.div_euclid(5);

    anchor - Duration::days(calendar_days)
}

/// Returns every business day in `[start, end]`, in ascending order.
///
/// An inverted range yields an empty vector.
#[must_use]
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_business_day(*d))
        .collect()
}

/// Counts business days strictly after `from` up to and including `to`.
///
/// Returns zero when `to` is not after `from`.
#[must_use]
pub fn business_days_after(from: NaiveDate, to: NaiveDate) -> usize {
    from.succ_opt()
        .map(|next| business_days_between(next, to).len())
        .unwrap_or(0)
}
