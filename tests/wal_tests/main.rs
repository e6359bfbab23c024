//! WAL test suite
//!
//! Frame encoding, writer, reader and crash recovery.

mod writer_tests;
