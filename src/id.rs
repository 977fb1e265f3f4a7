use std::{fmt, str::FromStr};

use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::{NoContext, Timestamp, Uuid};

/// Document identifier. Ids are UUIDv7, so byte order follows creation time
/// and the creation instant can be read back out of the id itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// An id whose embedded timestamp is `at`. Instants before the epoch clamp to it.
    pub fn at(at: OffsetDateTime) -> Self {
        let nanos = at.unix_timestamp_nanos().max(0);
        let secs = (nanos / 1_000_000_000) as u64;
        let subsec = (nanos % 1_000_000_000) as u32;
        Self(Uuid::new_v7(Timestamp::from_unix(NoContext, secs, subsec)))
    }

    pub fn created_at(&self) -> OffsetDateTime {
        timestamp_of(self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

/// Creation instant encoded in `id`, at millisecond precision.
///
/// Ids that don't carry a timestamp (anything but v7/v6/v1) report the UNIX epoch.
pub fn timestamp_of(id: &Id) -> OffsetDateTime {
    let Some(ts) = id.0.get_timestamp() else {
        return OffsetDateTime::UNIX_EPOCH;
    };
    let (secs, nanos) = ts.to_unix();
    OffsetDateTime::from_unix_timestamp_nanos(secs as i128 * 1_000_000_000 + nanos as i128)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Short random alphanumeric id for records embedded inside another document
/// (comments, chat messages), where uniqueness only matters within the parent.
pub fn short_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl From<Uuid> for Id {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
