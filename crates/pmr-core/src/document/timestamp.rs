//! Point-in-time values stored in documents.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A point in time with microsecond precision.
///
/// Stored as microseconds since the Unix epoch so it never gets confused with a
/// plain seconds or milliseconds value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp {
    micros: i64,
}

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub fn as_micros(&self) -> i64 {
        self.micros
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            micros: dt.timestamp_micros(),
        }
    }

    /// Convert to a chrono datetime, clamping values chrono cannot represent.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.micros.div_euclid(MICROS_PER_SECOND);
        let nanos = (self.micros.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
        DateTime::from_timestamp(secs, nanos).unwrap_or(if self.micros < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    /// Shift by a (possibly negative) number of minutes.
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self {
            micros: self
                .micros
                .saturating_add(minutes.saturating_mul(60 * MICROS_PER_SECOND)),
        }
    }

    /// Signed duration from `earlier` to `self`.
    pub fn since(&self, earlier: Timestamp) -> Duration {
        Duration::microseconds(self.micros.saturating_sub(earlier.micros))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_datetime().to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}
