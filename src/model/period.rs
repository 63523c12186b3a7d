use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Calendar month an accrual run applies to, written `YYYY-MM`.
///
/// Field order gives the chronological `Ord`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{:04}-{:02}", year, month)]
#[serde(try_from = "String", into = "String")]
pub struct AccrualPeriod {
    year: i32,
    month: u32,
}

impl AccrualPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::validation(format!("invalid month {month}")));
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for AccrualPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("period must be YYYY-MM, got {s:?}"));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for AccrualPeriod {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccrualPeriod> for String {
    fn from(p: AccrualPeriod) -> Self {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        let p: AccrualPeriod = "2026-03".parse().unwrap();
        assert_eq!(p.year(), 2026);
        assert_eq!(p.month(), 3);
        assert_eq!(p.to_string(), "2026-03");
    }

    #[test]
    fn rejects_bad_input() {
        assert!("2026-13".parse::<AccrualPeriod>().is_err());
        assert!("2026-3".parse::<AccrualPeriod>().is_err());
        assert!("march".parse::<AccrualPeriod>().is_err());
    }

    #[test]
    fn orders_chronologically() {
        let dec: AccrualPeriod = "2025-12".parse().unwrap();
        let jan: AccrualPeriod = "2026-01".parse().unwrap();
        assert!(dec < jan);
        assert_eq!(
            AccrualPeriod::containing(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()),
            jan
        );
    }

    #[test]
    fn serde_uses_string_form() {
        let p: AccrualPeriod = serde_json::from_str("\"2026-07\"").unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"2026-07\"");
    }
}
