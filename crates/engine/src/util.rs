use chrono::{Datelike, NaiveDate};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Normalizes a user-supplied name for matching: NFD, combining marks
/// stripped, lowercased, whitespace collapsed.
///
/// The bank catalog stores this form in `name_norm` so "BCA", " bca " and
/// "Bça" resolve to the same row.
#[must_use]
pub fn normalize_name(value: &str) -> String {
    let stripped: String = value.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of days in `date`'s calendar month (28-31).
#[must_use]
pub fn days_in_month(date: NaiveDate) -> i64 {
    let (next_year, next_month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let first_of_month = date.with_day(1).unwrap_or(date);
    let first_of_next =
        NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap_or(first_of_month);
    (first_of_next - first_of_month).num_days()
}
