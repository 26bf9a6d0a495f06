use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Point in time pinned to the UTC offset.
///
/// The wire and cache-key form is RFC3339 with the `Z` suffix. Offsets
/// other than UTC are refused at the boundary so that historical range
/// keys built from two timestamps compare byte-for-byte.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parse an RFC3339 string carrying the UTC offset.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        OffsetDateTime::parse(input, &Rfc3339)
            .map_err(|_| not_utc(input))
            .and_then(|parsed| Self::from_offset_datetime(parsed).map_err(|_| not_utc(input)))
    }

    /// Accept an already-parsed datetime, still requiring the UTC offset.
    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() == UtcOffset::UTC {
            Ok(Self(value))
        } else {
            Err(not_utc(&value.to_string()))
        }
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn to_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.0.to_string())
    }
}

fn not_utc(value: &str) -> ValidationError {
    ValidationError::TimestampNotUtc {
        value: value.to_owned(),
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl TryFrom<String> for UtcDateTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UtcDateTime> for String {
    fn from(value: UtcDateTime) -> Self {
        value.to_rfc3339()
    }
}
