use std::fmt;

use chrono::{Datelike, Local};

use crate::errors::*;

#[derive(Eq, PartialEq, Debug, Ord, PartialOrd, Clone)]
pub struct Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl Date {
    pub fn today() -> Date {
        let now = Local::now().date_naive();
        Date {
            year: now.year(),
            month: now.month() as u8,
            day: now.day() as u8,
        }
    }

    /// Parses `YYYY-MM-DD` (any single-byte separator).
    pub fn parse_ymd(s: &str) -> Result<Date> {
        let field = |range: std::ops::Range<usize>| {
            s.get(range)
                .ok_or_else(|| Error::from(format!("Date '{}' is too short", s)))
        };
        let year = field(0..4)?
            .parse::<i32>()
            .chain_err(|| format!("Invalid year in '{}'", s))?;
        let month = field(5..7)?
            .parse::<u8>()
            .chain_err(|| format!("Invalid month in '{}'", s))?;
        let day = field(8..10)?
            .parse::<u8>()
            .chain_err(|| format!("Invalid day in '{}'", s))?;

        Ok(Date { year, month, day })
    }
}
