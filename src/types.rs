//! Core types shared across the engine
//!
//! Keys and values are raw byte strings. Keys are ordered lexicographically
//! by unsigned byte value, which is exactly `Ord` for `[u8]`; the empty key
//! sorts first.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Raw key bytes
pub type Key = Vec<u8>;

/// Raw value bytes
pub type Value = Vec<u8>;

/// A live `(key, value)` pair as yielded by cursors
pub type KvPair = (Key, Value);

/// What a storage layer (memtable or SSTable) holds for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A live value
    Value(Value),

    /// A tombstone (deleted key)
    Tombstone,
}

impl Record {
    /// Convert to the externally visible form (tombstone reads as absent)
    pub fn into_value(self) -> Option<Value> {
        match self {
            Record::Value(v) => Some(v),
            Record::Tombstone => None,
        }
    }

    /// Approximate in-memory footprint of the payload
    pub fn payload_len(&self) -> usize {
        match self {
            Record::Value(v) => v.len(),
            Record::Tombstone => 0,
        }
    }
}

/// Traversal direction over the key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending key order
    #[default]
    Forward,

    /// Descending key order
    Reverse,
}

/// A string that names neither direction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction '{0}': expected 'forward' or 'reverse'")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "reverse" => Ok(Direction::Reverse),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}
