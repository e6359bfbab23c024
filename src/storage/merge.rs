//! Merge Iterator
//!
//! K-way merge over sorted sources (memtable range + SSTable ranges) in
//! either direction.
//!
//! Sources are ordered by priority: index 0 is the newest (memtable), higher
//! indices are older SSTables. When several sources hold the same key only
//! the newest one is yielded; the others are skipped. Tombstones are yielded
//! as such and left to the caller to filter.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::types::{Direction, Record};

use super::SSTableReader;

/// A record whose value may still be on disk
#[derive(Clone, Copy)]
pub enum Pending<'a> {
    /// Already in memory
    Memory(&'a Record),

    /// Stored at `offset` in `table`
    Disk { table: &'a SSTableReader, offset: u64 },
}

impl Pending<'_> {
    /// Fetch the record, reading from disk if needed
    pub fn resolve(&self) -> Result<Record> {
        match self {
            Pending::Memory(record) => Ok((*record).clone()),
            Pending::Disk { table, offset } => table.read_record(*offset),
        }
    }
}

/// One sorted input to the merge
pub type MergeSource<'a> = Box<dyn Iterator<Item = (&'a [u8], Pending<'a>)> + 'a>;

struct HeapEntry<'a> {
    key: &'a [u8],
    source: usize,
    pending: Pending<'a>,
    direction: Direction,
}

impl Ord for HeapEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the entry that should come out first must
        // compare greatest.
        let by_key = match self.direction {
            Direction::Forward => other.key.cmp(self.key),
            Direction::Reverse => self.key.cmp(other.key),
        };
        by_key.then_with(|| other.source.cmp(&self.source))
    }
}

impl PartialOrd for HeapEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry<'_> {}

/// Merges multiple sorted sources into one strictly ordered stream.
///
/// Every source must already be strictly ordered in `direction`.
pub struct MergeIterator<'a> {
    sources: Vec<MergeSource<'a>>,
    heap: BinaryHeap<HeapEntry<'a>>,
    direction: Direction,
}

impl<'a> MergeIterator<'a> {
    /// Build the initial heap from the head of every source
    pub fn new(sources: Vec<MergeSource<'a>>, direction: Direction) -> Self {
        let mut merge = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            direction,
        };
        for source in 0..merge.sources.len() {
            merge.advance(source);
        }
        merge
    }

    fn advance(&mut self, source: usize) {
        if let Some((key, pending)) = self.sources[source].next() {
            self.heap.push(HeapEntry {
                key,
                source,
                pending,
                direction: self.direction,
            });
        }
    }
}

impl<'a> Iterator for MergeIterator<'a> {
    type Item = (&'a [u8], Pending<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let winner = self.heap.pop()?;

        // Drop shadowed versions of the same key from older sources
        while let Some(top) = self.heap.peek() {
            if top.key != winner.key {
                break;
            }
            if let Some(shadowed) = self.heap.pop() {
                self.advance(shadowed.source);
            }
        }

        self.advance(winner.source);
        Some((winner.key, winner.pending))
    }
}
