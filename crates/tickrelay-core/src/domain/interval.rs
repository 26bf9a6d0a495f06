use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::ValidationError;

/// Bar granularity for historical price requests.
///
/// The label form (`"1m"` .. `"1d"`) is what appears on the wire and in
/// per-source cache keys; [`Interval::span`] is what adapters use to step
/// through a requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

const LABELS: [(Interval, &str); 5] = [
    (Interval::OneMinute, "1m"),
    (Interval::FiveMinutes, "5m"),
    (Interval::FifteenMinutes, "15m"),
    (Interval::OneHour, "1h"),
    (Interval::OneDay, "1d"),
];

impl Interval {
    /// Wall-clock width of one bar.
    pub const fn span(self) -> Duration {
        match self {
            Self::OneMinute => Duration::minutes(1),
            Self::FiveMinutes => Duration::minutes(5),
            Self::FifteenMinutes => Duration::minutes(15),
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::days(1),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        LABELS
            .iter()
            .find(|(_, label)| *label == wanted)
            .map(|(interval, _)| *interval)
            .ok_or(ValidationError::InvalidInterval { value: wanted })
    }
}

impl TryFrom<String> for Interval {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_owned()
    }
}
