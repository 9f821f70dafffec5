//! # Engine Module
//!
//! This module has the ambient plumbing that lets the rest of the store
//! drive a real, ordered, transactional key/value engine. The engine
//! itself — its page format, its MVCC implementation — is someone else's
//! concern; what lives here is the thin contract the store needs from it
//! (ordered byte-string keys, two named sub-databases, range scans) and one
//! concrete binding of that contract onto [`sled`].

use crate::error::StoreResult;

pub mod sled_engine;
mod write_gate;

pub use sled_engine::SledEngine;
pub use write_gate::{ExclusiveReadGuard, WriteGate, WriterGuard};

/// An ordered byte-string map, addressable by raw key bytes. This is the
/// contract the store's key format (see [`crate::key`]) is designed
/// against: callers rely on `range` visiting keys in the same order the
/// bytes compare lexicographically.
pub trait ByteMap {
    fn insert(&self, key: &[u8], value: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    fn remove(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// All entries with key in `[from, to)`, in ascending key order.
    fn range(&self, from: &[u8], to: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// The last entry with key in `[from, to)`, if any.
    fn last_in_range(&self, from: &[u8], to: &[u8]) -> StoreResult<Option<(Vec<u8>, Vec<u8>)>>;
}
