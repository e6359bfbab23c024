//! Storage test suite
//!
//! SSTable format, storage manager, flush and compaction.
