//! Host timestamps: signed microseconds since 2000-01-01 00:00:00 UTC.
use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Microseconds between the Unix epoch and 2000-01-01 00:00:00 UTC.
pub const HOST_EPOCH_UNIX_MICROS: i64 = 946_684_800_000_000;

const MICROS_PER_SECOND: i64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Open upper bound. Later than every real timestamp.
    pub const INFINITY: Timestamp = Timestamp(i64::MAX);
    pub const NEG_INFINITY: Timestamp = Timestamp(i64::MIN);
    pub const EPOCH: Timestamp = Timestamp(0);

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_micros().saturating_sub(HOST_EPOCH_UNIX_MICROS))
    }

    /// `None` for the infinite sentinels and anything chrono cannot represent.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_infinite() {
            return None;
        }
        let unix = self.0.checked_add(HOST_EPOCH_UNIX_MICROS)?;
        let secs = unix.div_euclid(MICROS_PER_SECOND);
        let nanos = (unix.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    pub fn is_infinite(self) -> bool {
        self == Self::INFINITY || self == Self::NEG_INFINITY
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_micros(duration)))
    }

    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_micros(duration)))
    }
}

/// Durations too large for i64 microseconds clamp to the matching bound.
fn duration_micros(duration: Duration) -> i64 {
    match duration.num_microseconds() {
        Some(micros) => micros,
        None if duration < Duration::zero() => i64::MIN,
        None => i64::MAX,
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for i64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INFINITY {
            return write!(f, "infinity");
        }
        if *self == Self::NEG_INFINITY {
            return write!(f, "-infinity");
        }
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Micros, true)),
            None => write!(f, "{}us", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn host_epoch_is_zero() {
        let dt = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Timestamp::from(dt), Timestamp::EPOCH);
        assert_eq!(Timestamp::EPOCH.to_datetime(), Some(dt));
    }

    #[test]
    fn datetime_conversion() {
        // 662770800000000 us after the host epoch
        let ts = Timestamp(662_770_800_000_000);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2020, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(Timestamp::from(dt), ts);

        let before = Timestamp(-1);
        let dt = before.to_datetime().unwrap();
        assert_eq!(Timestamp::from(dt), before);
    }

    #[test]
    fn infinite_sentinels() {
        assert!(Timestamp::INFINITY.is_infinite());
        assert!(Timestamp::NEG_INFINITY.is_infinite());
        assert!(Timestamp::INFINITY > Timestamp::now());
        assert_eq!(Timestamp::INFINITY.to_datetime(), None);
        assert_eq!(Timestamp::INFINITY.to_string(), "infinity");
        assert_eq!(Timestamp::NEG_INFINITY.to_string(), "-infinity");
    }

    #[test]
    fn saturating_arithmetic() {
        let ts = Timestamp(10 * MICROS_PER_SECOND);
        assert_eq!(ts.saturating_sub(Duration::seconds(4)), Timestamp(6 * MICROS_PER_SECOND));
        assert_eq!(ts.saturating_add(Duration::seconds(4)), Timestamp(14 * MICROS_PER_SECOND));
        assert_eq!(Timestamp(i64::MIN + 1).saturating_sub(Duration::seconds(1)), Timestamp::NEG_INFINITY);
        assert_eq!(
            Timestamp(-10 * MICROS_PER_SECOND).saturating_sub(Duration::days(100_000_000_000)),
            Timestamp::NEG_INFINITY
        );
    }

    #[test]
    fn display_is_rfc3339() {
        assert_eq!(Timestamp::EPOCH.to_string(), "2000-01-01T00:00:00.000000Z");
    }
}
