//! Calendar-day bucketing for usage counts.

use core::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Error parsing a [`DayKey`] from a string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("day key must be a YYYY-MM-DD date: {0}")]
pub struct DayKeyError(String);

/// A UTC calendar-day bucket (`YYYY-MM-DD`).
///
/// Usage counts are keyed by day. A new day implies a fresh bucket, so counts
/// reset implicitly at midnight UTC without any cleanup job; prior days are
/// retained as history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// The bucket for the current UTC day.
    #[must_use]
    pub fn today() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// The bucket containing the given instant.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.date_naive())
    }

    /// Parse a `DayKey` from a `YYYY-MM-DD` string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid ISO 8601 calendar date.
    pub fn parse(s: &str) -> Result<Self, DayKeyError> {
        s.parse::<NaiveDate>()
            .map(Self)
            .map_err(|_| DayKeyError(s.to_owned()))
    }

    /// Returns the underlying calendar date.
    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for DayKey {
    type Err = DayKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DayKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
