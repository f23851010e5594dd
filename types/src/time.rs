//! Timestamps and the clock seam.
//!
//! The canister reports time as nanoseconds since the Unix epoch, so that is
//! the unit carried here. Rendering to calendar strings is UTC.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanoseconds since the Unix epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Current system time.
    pub fn now() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self(u64::try_from(nanos).unwrap_or_default())
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0 / NANOS_PER_SEC
    }

    fn to_datetime(self) -> DateTime<Utc> {
        let secs = i64::try_from(self.as_secs()).unwrap_or(i64::MAX);
        let sub = (self.0 % NANOS_PER_SEC) as u32;
        DateTime::from_timestamp(secs, sub).unwrap_or_default()
    }

    /// Calendar date, `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        self.to_datetime().format("%Y-%m-%d").to_string()
    }

    /// Wall-clock time, `HH:MM`.
    pub fn clock_string(&self) -> String {
        self.to_datetime().format("%H:%M").to_string()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to_datetime().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parse an RFC 3339 string. Returns `None` for malformed or pre-epoch input.
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        let dt = DateTime::parse_from_rfc3339(s).ok()?;
        let nanos = dt.timestamp_nanos_opt()?;
        u64::try_from(nanos).ok().map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
