//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.
//! One entry holds every operation of one mutation, so a batch is logged,
//! checksummed and replayed as a unit.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};

/// Frame header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single payload; anything larger is treated as corruption
pub const MAX_PAYLOAD_SIZE: u32 = 256 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operations to apply, in order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// The key this operation touches
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        Self {
            lsn,
            operations,
            timestamp: now_millis(),
        }
    }

    /// Encode as a full frame: `[lsn][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        encode_frame(&EntryRef {
            lsn: self.lsn,
            operations: &self.operations,
            timestamp: self.timestamp,
        })
    }

    /// Encode a frame for `operations` without taking ownership of them
    pub fn encode(lsn: u64, operations: &[Operation]) -> Result<Vec<u8>> {
        encode_frame(&EntryRef {
            lsn,
            operations,
            timestamp: now_millis(),
        })
    }

    /// Decode a full frame, verifying length and checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(KvError::Corruption(format!(
                "WAL frame truncated: {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        let header = FrameHeader::parse(&bytes[..HEADER_SIZE])?;
        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != header.len as usize {
            return Err(KvError::Corruption(format!(
                "WAL payload length mismatch: header says {}, got {}",
                header.len,
                payload.len()
            )));
        }
        header.decode_payload(payload)
    }
}

/// Parsed frame header
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    pub(crate) fn parse(mut header: &[u8]) -> Result<Self> {
        let lsn = header.get_u64_le();
        let crc = header.get_u32_le();
        let len = header.get_u32_le();
        if len > MAX_PAYLOAD_SIZE {
            return Err(KvError::Corruption(format!(
                "WAL payload length {} exceeds maximum {}",
                len, MAX_PAYLOAD_SIZE
            )));
        }
        Ok(Self { lsn, crc, len })
    }

    pub(crate) fn decode_payload(&self, payload: &[u8]) -> Result<WalEntry> {
        let actual = compute_crc(self.lsn, self.len, payload);
        if actual != self.crc {
            return Err(KvError::Corruption(format!(
                "WAL CRC mismatch at lsn {}: expected {:#010x}, got {:#010x}",
                self.lsn, self.crc, actual
            )));
        }
        let entry: WalEntry = bincode::deserialize(payload)
            .map_err(|e| KvError::Corruption(format!("WAL payload undecodable: {}", e)))?;
        if entry.lsn != self.lsn {
            return Err(KvError::Corruption(format!(
                "WAL LSN mismatch: header {}, payload {}",
                self.lsn, entry.lsn
            )));
        }
        Ok(entry)
    }
}

/// Borrowed twin of `WalEntry`; bincode encodes both identically
#[derive(Serialize)]
struct EntryRef<'a> {
    lsn: u64,
    operations: &'a [Operation],
    timestamp: u64,
}

/// Size is checked before encoding so an oversized entry is never buffered
fn encode_frame(entry: &EntryRef<'_>) -> Result<Vec<u8>> {
    let size = bincode::serialized_size(entry)?;
    if size > u64::from(MAX_PAYLOAD_SIZE) {
        return Err(KvError::Storage(format!(
            "WAL entry too large: {} bytes (max {})",
            size, MAX_PAYLOAD_SIZE
        )));
    }
    let payload = bincode::serialize(entry)?;
    let len = payload.len() as u32;
    let crc = compute_crc(entry.lsn, len, &payload);

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u64_le(entry.lsn);
    frame.put_u32_le(crc);
    frame.put_u32_le(len);
    frame.put_slice(&payload);
    Ok(frame.to_vec())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn compute_crc(lsn: u64, len: u32, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(&len.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}
