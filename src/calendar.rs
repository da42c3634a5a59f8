//! Conversion between decimal years and calendar dates.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};

fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Decimal year of a date, e.g. 1 July 2001 is about 2001.5.
pub fn date_to_year_fraction(date: NaiveDate) -> f64 {
    let year = date.year();
    year as f64 + (date.ordinal0() as f64) / days_in_year(year) as f64
}

/// Date containing the instant `year_fraction`.
pub fn year_fraction_to_date(year_fraction: f64) -> Result<NaiveDate> {
    let year = year_fraction.floor();
    let n_days = days_in_year(year as i32);
    // Guard against `frac * n_days` rounding up to the next year.
    let ordinal0 = (((year_fraction - year) * n_days as f64 + 1e-9).floor() as u32).min(n_days - 1);
    NaiveDate::from_yo_opt(year as i32, ordinal0 + 1)
        .with_context(|| format!("year fraction {year_fraction} is out of range"))
}

/// Calendar dates of the simulation times.
///
/// `time_min` corresponds to `time_min_date`; one time unit is one year.
pub fn step_dates(times: &[f64], time_min: f64, time_min_date: NaiveDate) -> Result<Vec<NaiveDate>> {
    let origin = date_to_year_fraction(time_min_date);
    times
        .iter()
        .map(|&t| year_fraction_to_date(origin + t - time_min))
        .collect()
}
