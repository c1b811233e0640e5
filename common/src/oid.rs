// Object identifiers used as document keys.
//
// Layout (12 bytes):
// - 4 bytes: big-endian seconds since the Unix epoch
// - 5 bytes: random value picked once per process
// - 3 bytes: big-endian counter, seeded randomly and incremented per id

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use lazy_static::lazy_static;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::time::get_current_time_in_seconds;

pub const OBJECT_ID_SIZE: usize = 12;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

lazy_static! {
    static ref PROCESS_UNIQUE: [u8; 5] = rand::thread_rng().gen();
    static ref COUNTER: AtomicU32 = AtomicU32::new(rand::thread_rng().gen_range(0..=COUNTER_MASK));
}

#[derive(Debug, Error, PartialEq)]
pub enum OidError {
    #[error("Invalid object id hex '{0}': {1}")]
    InvalidHex(String, hex::FromHexError),

    #[error("Invalid object id length: expected {OBJECT_ID_SIZE} bytes, got {0}")]
    InvalidLength(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_SIZE]);

impl ObjectId {
    // Generate a fresh identifier
    pub fn new() -> Self {
        let timestamp = get_current_time_in_seconds() as u32;
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_ID_SIZE];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; OBJECT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    // Parse 24 hex digits (case-insensitive)
    pub fn parse_str(value: &str) -> Result<Self, OidError> {
        let decoded =
            hex::decode(value).map_err(|e| OidError::InvalidHex(value.to_string(), e))?;
        let bytes: [u8; OBJECT_ID_SIZE] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| OidError::InvalidLength(decoded.len()))?;
        Ok(Self(bytes))
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn timestamp_seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for ObjectId {
    fn deserialize<D: Deserializer<'a>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::parse_str(&hex).map_err(serde::de::Error::custom)
    }
}
