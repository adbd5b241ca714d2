use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable identity shared by resources, worlds and entities.
///
/// `0` is reserved as [`Uuid::INVALID`] and is never handed out. On disk the
/// value is written as a decimal string so 64-bit IDs survive JSON readers
/// that only keep doubles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uuid(u64);

impl Uuid {
    pub const INVALID: Uuid = Uuid(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uuid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Uuid)
    }
}

impl From<u64> for Uuid {
    fn from(value: u64) -> Self {
        Uuid(value)
    }
}

impl Serialize for Uuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Uuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UuidVisitor)
    }
}

struct UuidVisitor;

impl<'de> Visitor<'de> for UuidVisitor {
    type Value = Uuid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned 64-bit id as a string or integer")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Uuid, E> {
        Ok(Uuid(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Uuid, E> {
        u64::try_from(value)
            .map(Uuid)
            .map_err(|_| E::custom(format!("negative id {value}")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Uuid, E> {
        value
            .parse()
            .map_err(|_| E::custom(format!("unable to parse id from '{value}'")))
    }
}

/// Opaque token for storage owned by the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub(crate) u64);

impl NativeHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}
