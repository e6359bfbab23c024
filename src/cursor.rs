//! Cursor
//!
//! A one-directional walk over the database in key order. Entries are read
//! in chunks: each chunk comes from one consistent view, and the next chunk
//! resumes strictly after the last key returned. A cursor therefore never
//! yields a key twice or out of order, but writes made while it is running
//! may or may not show up in later chunks.
//!
//! The cursor holds its database open: dropping every `Database` handle
//! while a cursor is alive leaves the files locked until the cursor goes
//! too. Once the database is closed, the next call fails with
//! `InvalidState`, even if entries were already read ahead.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::ops::Bound;
use std::sync::Arc;

use crate::db::Shared;
use crate::error::{KvError, Result};
use crate::types::{Direction, KvPair};

/// Ordered iterator over a database's entries.
///
/// Yields `Result<(key, value)>`. After the first error the cursor is
/// exhausted.
pub struct Cursor {
    shared: Arc<Shared>,
    direction: Direction,
    /// Where the next chunk starts
    position: Bound<Vec<u8>>,
    buffer: VecDeque<KvPair>,
    exhausted: bool,
}

impl Cursor {
    pub(crate) fn new(shared: Arc<Shared>, start: Bound<Vec<u8>>, direction: Direction) -> Self {
        Self {
            shared,
            direction,
            position: start,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn refill(&mut self) -> Result<()> {
        let limit = self.shared.prefetch();
        let start = match &self.position {
            Bound::Included(key) => Bound::Included(key.as_slice()),
            Bound::Excluded(key) => Bound::Excluded(key.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let direction = self.direction;

        let chunk = self
            .shared
            .with_engine(|engine| engine.scan(start, direction, limit))?;

        if chunk.len() < limit {
            self.exhausted = true;
        }
        if let Some((last, _)) = chunk.last() {
            self.position = Bound::Excluded(last.clone());
        }
        self.buffer.extend(chunk);
        Ok(())
    }
}

impl Iterator for Cursor {
    type Item = Result<KvPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted && self.buffer.is_empty() {
            return None;
        }
        // Buffered entries are not served from a closed database
        if !self.shared.is_open() {
            self.buffer.clear();
            self.exhausted = true;
            return Some(Err(KvError::closed()));
        }
        if let Some(pair) = self.buffer.pop_front() {
            return Some(Ok(pair));
        }
        match self.refill() {
            Ok(()) => self.buffer.pop_front().map(Ok),
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Cursor {}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("direction", &self.direction)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
