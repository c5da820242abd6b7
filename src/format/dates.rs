use chrono::{Datelike, NaiveDate};

/// Two-digit year followed by three-digit day of year, e.g. `82056`.
pub fn yydoy(date: NaiveDate) -> String {
    format!("{:02}{:03}", date.year().rem_euclid(100), date.ordinal())
}

/// Full year followed by three-digit day of year, e.g. `1982056`.
pub fn yyyydoy(date: NaiveDate) -> String {
    format!("{:04}{:03}", date.year(), date.ordinal())
}
