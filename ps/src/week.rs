//! Week keys and date arithmetic
//!
//! A week is identified by the date of its Monday, formatted `YYYY-MM-DD`.
//! Any date normalizes to the Monday of its containing week; Sunday belongs to
//! the week that started six days earlier.

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::{PlanningError, PlanningResult};
use crate::slot::{Shift, SlotKey};

/// Number of scheduled days per week (Monday to Friday)
pub const WORK_DAYS: usize = 5;

/// Calendar years a parsed or shifted week may fall in
pub const YEARS: RangeInclusive<i32> = 1..=9999;

/// Canonical identifier of a Monday-anchored week
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    /// Week containing `date`
    pub fn of(date: NaiveDate) -> Self {
        let back = date.weekday().num_days_from_monday() as i64;
        Self(date - TimeDelta::days(back))
    }

    /// Week containing today's local calendar date
    pub fn current() -> Self {
        Self::of(Local::now().date_naive())
    }

    pub fn monday(&self) -> NaiveDate {
        self.0
    }

    pub fn friday(&self) -> NaiveDate {
        self.0 + TimeDelta::days(4)
    }

    /// The five scheduled dates, Monday first
    pub fn days(&self) -> [NaiveDate; WORK_DAYS] {
        std::array::from_fn(|i| self.0 + TimeDelta::days(i as i64))
    }

    /// All slots of the week in display order (day, then morning before afternoon)
    pub fn slots(&self) -> Vec<SlotKey> {
        self.days()
            .into_iter()
            .flat_map(|date| Shift::ALL.into_iter().map(move |shift| SlotKey::weekday(date, shift)))
            .collect()
    }

    /// Step forward (positive) or backward (negative) by whole weeks
    ///
    /// Panics if the result falls outside the calendar range chrono can
    /// represent; use [`WeekKey::checked_shift`] for untrusted offsets.
    pub fn shift(&self, delta_weeks: i32) -> Self {
        Self::of(self.0 + TimeDelta::weeks(delta_weeks as i64))
    }

    /// Like [`WeekKey::shift`], but fails when the result leaves [`YEARS`]
    pub fn checked_shift(&self, delta_weeks: i32) -> PlanningResult<Self> {
        self.0
            .checked_add_signed(TimeDelta::weeks(delta_weeks as i64))
            .filter(|d| YEARS.contains(&d.year()))
            .map(Self::of)
            .ok_or_else(|| PlanningError::InvalidKey(format!("{} shifted by {} weeks is out of range", self, delta_weeks)))
    }

    /// Whether `date` falls in this week (weekend included)
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }

    /// Human label, e.g. `Week of 15 to 19 January 2024`
    pub fn label(&self) -> String {
        let monday = self.monday();
        let friday = self.friday();
        if monday.month() == friday.month() {
            format!("Week of {} to {}", monday.day(), friday.format("%-d %B %Y"))
        } else if monday.year() == friday.year() {
            format!("Week of {} to {}", monday.format("%-d %B"), friday.format("%-d %B %Y"))
        } else {
            format!("Week of {} to {}", monday.format("%-d %B %Y"), friday.format("%-d %B %Y"))
        }
    }

    /// Parse a stored key, which must already be a Monday
    pub fn parse_canonical(s: &str) -> Result<Self, PlanningError> {
        let key: WeekKey = s.parse()?;
        if key.0.to_string() != s.trim() {
            return Err(PlanningError::InvalidKey(format!("{} is not a Monday", s)));
        }
        Ok(key)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Accepts any `YYYY-MM-DD` date within [`YEARS`] and normalizes it to its week
impl FromStr for WeekKey {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| PlanningError::InvalidKey(format!("{}: {}", s, e)))?;
        if !YEARS.contains(&date.year()) {
            return Err(PlanningError::InvalidKey(format!("{}: year outside 1 to 9999", s)));
        }
        Ok(Self::of(date))
    }
}

impl From<NaiveDate> for WeekKey {
    fn from(date: NaiveDate) -> Self {
        Self::of(date)
    }
}

impl serde::Serialize for WeekKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for WeekKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse_canonical(&s).map_err(serde::de::Error::custom)
    }
}
