//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups and ordered range
//! walks via an in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use bytes::Buf;
use parking_lot::Mutex;

use crate::error::{KvError, Result};
use crate::types::{Direction, Record};

use super::{ENTRY_HEADER_SIZE, FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
///
/// The file handle sits behind a mutex so lookups take `&self` and readers
/// can share the table list under a read lock.
pub struct SSTableReader {
    path: PathBuf,
    /// File handle for reading entries
    file: Mutex<BufReader<File>>,
    /// In-memory index: key → file offset
    index: BTreeMap<Vec<u8>, u64>,
    /// Metadata
    entry_count: u64,
    /// Index block starting offset (end of data block)
    index_offset: u64,
    file_size: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Validates header, footer and both checksums, then loads the index
    /// into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(path, format!("file too small ({} bytes)", file_size)));
        }

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let mut buf = &header[..];

        if &buf[0..4] != MAGIC {
            return Err(corrupt(path, format!("invalid magic {:?}", &header[0..4])));
        }
        buf.advance(4);

        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported version {}", version)));
        }

        let entry_count = buf.get_u64_le();

        // Read footer to get index offset and checksums
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;
        let mut buf = &footer[..];
        let index_offset = buf.get_u64_le();
        let data_crc = buf.get_u32_le();
        let index_crc = buf.get_u32_le();

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(path, format!("index offset {} out of range", index_offset)));
        }

        // Verify the data block checksum
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut hasher = crc32fast::Hasher::new();
        let mut remaining = index_offset - HEADER_SIZE;
        let mut chunk = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            file.read_exact(&mut chunk[..n])?;
            hasher.update(&chunk[..n]);
            remaining -= n as u64;
        }
        if hasher.finalize() != data_crc {
            return Err(corrupt(path, "data block checksum mismatch".to_string()));
        }

        // Index block size = file_size - footer_size - index_offset
        let index_block_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_block_size as usize];
        file.read_exact(&mut index_data)?;
        if crc32fast::hash(&index_data) != index_crc {
            return Err(corrupt(path, "index block checksum mismatch".to_string()));
        }

        // Parse index entries: [key_len(4)][offset(8)][key]
        let mut index = BTreeMap::new();
        let mut buf = &index_data[..];
        while buf.has_remaining() {
            if buf.remaining() < 12 {
                return Err(corrupt(path, "truncated index entry".to_string()));
            }
            let key_len = buf.get_u32_le() as usize;
            let offset = buf.get_u64_le();
            if buf.remaining() < key_len || offset >= index_offset {
                return Err(corrupt(path, "malformed index entry".to_string()));
            }
            let key = buf[..key_len].to_vec();
            buf.advance(key_len);
            index.insert(key, offset);
        }

        if index.len() as u64 != entry_count {
            return Err(corrupt(
                path,
                format!("index has {} keys, header says {}", index.len(), entry_count),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            entry_count,
            index_offset,
            file_size,
        })
    }

    /// Look up a key in O(log n) via the in-memory index
    ///
    /// Returns:
    /// - `Ok(Some(Record::Value(v)))`: key found with value
    /// - `Ok(Some(Record::Tombstone))`: key deleted in this table
    /// - `Ok(None)`: key not in this SSTable
    pub fn get(&self, key: &[u8]) -> Result<Option<Record>> {
        match self.index.get(key) {
            Some(&offset) => self.read_record(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Read the record stored at an index offset
    pub fn read_record(&self, offset: u64) -> Result<Record> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; ENTRY_HEADER_SIZE];
        file.read_exact(&mut header)?;
        let mut buf = &header[..];
        let key_len = buf.get_u32_le() as u64;
        let val_len = buf.get_u32_le();

        if val_len == TOMBSTONE_MARKER {
            return Ok(Record::Tombstone);
        }

        let value_end = offset + ENTRY_HEADER_SIZE as u64 + key_len + val_len as u64;
        if value_end > self.index_offset {
            return Err(corrupt(
                &self.path,
                format!("entry at offset {} overruns data block", offset),
            ));
        }

        // Skip the key (the index already matched it)
        file.seek_relative(key_len as i64)?;

        let mut value = vec![0u8; val_len as usize];
        file.read_exact(&mut value)?;
        Ok(Record::Value(value))
    }

    /// Index entries from `start` onward in `direction`.
    ///
    /// Forward walks keys `>= start` ascending; reverse walks keys `<= start`
    /// descending. Values are fetched separately with [`read_record`].
    ///
    /// [`read_record`]: SSTableReader::read_record
    pub fn range<'s>(
        &'s self,
        start: Bound<&[u8]>,
        direction: Direction,
    ) -> Box<dyn Iterator<Item = (&'s [u8], u64)> + 's> {
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match direction {
            Direction::Forward => (start, Bound::Unbounded),
            Direction::Reverse => (Bound::Unbounded, start),
        };
        let iter = self
            .index
            .range::<[u8], _>(bounds)
            .map(|(k, &off)| (k.as_slice(), off));
        match direction {
            Direction::Forward => Box::new(iter),
            Direction::Reverse => Box::new(iter.rev()),
        }
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Size of the file on disk
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the minimum key in this SSTable (for range filtering)
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Get the maximum key in this SSTable (for range filtering)
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false, // Empty SSTable
        }
    }
}

impl std::fmt::Debug for SSTableReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SSTableReader")
            .field("path", &self.path)
            .field("entry_count", &self.entry_count)
            .field("file_size", &self.file_size)
            .finish()
    }
}

fn corrupt(path: &Path, reason: String) -> KvError {
    KvError::Corruption(format!("SSTable {}: {}", path.display(), reason))
}
