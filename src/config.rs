//! # Store Configuration Module
//!
//! Bundles the open-time configuration surface of a store: where it lives
//! on disk, its initial and incremental capacity, and a handful of
//! durability/layout knobs that the chosen engine adapter either consumes
//! directly or passes through as a no-op, documented per field below.

use std::path::PathBuf;

use crate::collection::chunk::DEFAULT_CHUNK_SIZE;

/// Open-time configuration for a [`crate::store::Store`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory the store's files live under.
    pub path: PathBuf,

    /// Logical name for the store, used to namespace its sub-databases.
    pub name: String,

    /// Initial map size, in MiB. Consumed by engines that pre-size a memory
    /// map; a no-op for engines that grow transparently.
    pub initial_map_size_mb: u64,

    /// Minimum space, in KiB, a write transaction should reserve before it
    /// begins, triggering a capacity check/grow if the backing file is
    /// close to full.
    pub min_reserved_kb: u32,

    /// Growth increment, in KiB, applied when the capacity check above
    /// fails.
    pub growth_increment_kb: u32,

    /// Whether to create a separate lock file guarding writer exclusion
    /// across processes. The in-process writer-exclusion gate always
    /// applies regardless of this flag; it only controls the extra
    /// cross-process file lock.
    pub create_lock_file: bool,

    /// Whether to use write-mapped I/O (vs. write-then-msync). A hint the
    /// engine adapter may ignore if its backing engine doesn't distinguish
    /// the two.
    pub write_mapped: bool,

    /// Default chunk size, in bytes, for newly created collections.
    pub default_chunk_size: usize,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            initial_map_size_mb: 64,
            min_reserved_kb: 64,
            growth_increment_kb: 1024,
            create_lock_file: true,
            write_mapped: true,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.default_chunk_size = bytes;
        self
    }

    pub fn with_initial_map_size_mb(mut self, mb: u64) -> Self {
        self.initial_map_size_mb = mb;
        self
    }

    pub fn with_growth_increment_kb(mut self, kb: u32) -> Self {
        self.growth_increment_kb = kb;
        self
    }
}
