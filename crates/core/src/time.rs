//! Tick-based timestamps for stored attributes
//!
//! Timestamp attributes are stored as `<ticks>|UTC` or `<ticks>|LOC`, where
//! ticks count 100-nanosecond intervals since 0001-01-01T00:00:00 and the
//! suffix records whether the wall clock reading was UTC or local time.
//!
//! ```
//! use keybranch_core::time::{StoredTime, TimeZoneKind};
//!
//! let t = StoredTime::new(621_355_968_000_000_000, TimeZoneKind::Utc);
//! assert_eq!(t.encode(), "621355968000000000|UTC");
//! assert_eq!(t.unix_millis(), 0);
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Ticks per second (one tick is 100ns)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks per millisecond
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Tick count of 1970-01-01T00:00:00
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Tick count of 9999-12-31T23:59:59.9999999, the last representable reading
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

const UTC_SUFFIX: &str = "UTC";
const LOCAL_SUFFIX: &str = "LOC";

/// Which clock a stored reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeZoneKind {
    /// Coordinated universal time
    Utc,
    /// Local wall clock
    Local,
}

impl TimeZoneKind {
    /// Suffix used in the stored form
    pub const fn suffix(&self) -> &'static str {
        match self {
            TimeZoneKind::Utc => UTC_SUFFIX,
            TimeZoneKind::Local => LOCAL_SUFFIX,
        }
    }
}

/// A timestamp as persisted: tick count plus zone marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredTime {
    ticks: i64,
    zone: TimeZoneKind,
}

impl StoredTime {
    /// Create from raw ticks
    pub const fn new(ticks: i64, zone: TimeZoneKind) -> Self {
        StoredTime { ticks, zone }
    }

    /// Create from a UTC instant
    ///
    /// Instants before year 1 or after year 9999 clamp to the nearest
    /// representable reading.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        StoredTime::new(naive_to_ticks(&dt.naive_utc()), TimeZoneKind::Utc)
    }

    /// Create from a local instant; ticks record the local wall clock
    pub fn from_local(dt: DateTime<Local>) -> Self {
        StoredTime::new(naive_to_ticks(&dt.naive_local()), TimeZoneKind::Local)
    }

    /// Raw tick count
    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Zone marker
    pub const fn zone(&self) -> TimeZoneKind {
        self.zone
    }

    /// Milliseconds since the Unix epoch of the wall clock reading
    ///
    /// Used as the sort score of timestamp attributes; exact in `f64` for
    /// any date a tick count can hold.
    pub fn unix_millis(&self) -> i64 {
        self.ticks
            .saturating_sub(UNIX_EPOCH_TICKS)
            .div_euclid(TICKS_PER_MILLISECOND)
    }

    /// Wall clock reading without zone
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let since_epoch = self.ticks.checked_sub(UNIX_EPOCH_TICKS)?;
        let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
        let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
    }

    /// The instant this reading denotes
    ///
    /// Local readings are resolved against the current local zone; an
    /// ambiguous local time resolves to the earlier instant.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let naive = self.to_naive()?;
        match self.zone {
            TimeZoneKind::Utc => Some(Utc.from_utc_datetime(&naive)),
            TimeZoneKind::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Stored form: `<ticks>|UTC` or `<ticks>|LOC`
    pub fn encode(&self) -> String {
        format!("{}|{}", self.ticks, self.zone.suffix())
    }

    /// Parse the stored form
    ///
    /// `attribute` names the field in the error raised for malformed input.
    /// Tick counts outside `0..=MAX_TICKS` are malformed.
    pub fn parse(attribute: &str, raw: &str) -> Result<Self> {
        let malformed = || Error::conversion(attribute, "<ticks>|UTC or <ticks>|LOC", raw);
        let (ticks, suffix) = raw.rsplit_once('|').ok_or_else(malformed)?;
        let zone = match suffix {
            UTC_SUFFIX => TimeZoneKind::Utc,
            LOCAL_SUFFIX => TimeZoneKind::Local,
            _ => return Err(malformed()),
        };
        let ticks = ticks.parse::<i64>().map_err(|_| malformed())?;
        if !(0..=MAX_TICKS).contains(&ticks) {
            return Err(malformed());
        }
        Ok(StoredTime::new(ticks, zone))
    }
}

impl fmt::Display for StoredTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<DateTime<Utc>> for StoredTime {
    fn from(dt: DateTime<Utc>) -> Self {
        StoredTime::from_utc(dt)
    }
}

impl From<DateTime<Local>> for StoredTime {
    fn from(dt: DateTime<Local>) -> Self {
        StoredTime::from_local(dt)
    }
}

fn naive_to_ticks(naive: &NaiveDateTime) -> i64 {
    let utc = naive.and_utc();
    utc.timestamp()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(UNIX_EPOCH_TICKS)
        .saturating_add(i64::from(utc.timestamp_subsec_nanos() / 100))
        .clamp(0, MAX_TICKS)
}
