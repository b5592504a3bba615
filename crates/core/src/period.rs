use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    /// 1-based month number.
    pub month: u32,
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthKey { year, month })
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Moves forward (positive) or backward (negative) by whole months.
    pub fn shift(self, months: i32) -> Self {
        let index = self.index() + months as i64;
        MonthKey {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Number of month boundaries from `self` to `later`; negative when `later` is earlier.
    pub fn months_until(self, later: MonthKey) -> i64 {
        later.index() - self.index()
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    fn index(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }
}

/// An inclusive run of calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthWindow {
    pub start: MonthKey,
    pub end: MonthKey,
}

impl fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl MonthWindow {
    /// The `months` calendar months ending with (and including) the month of `now`.
    pub fn trailing<D: Datelike>(now: &D, months: u32) -> Self {
        let end = MonthKey::of(now);
        let span = months.max(1) as i32 - 1;
        MonthWindow {
            start: end.shift(-span),
            end,
        }
    }

    pub fn contains(self, month: MonthKey) -> bool {
        month >= self.start && month <= self.end
    }

    pub fn len(self) -> u32 {
        (self.start.months_until(self.end) + 1).max(0) as u32
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}
