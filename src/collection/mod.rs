//! # Chunked-Collection Engine
//!
//! Top-level ordered collections, keyed by `(COLLECTION_CLSID,
//! collectionId, chunkId)` with per-collection metadata at
//! `(COLLINFO_CLSID, collectionId, 0)` (SPEC_FULL.md section 4.5). The pure
//! codecs for chunk headers, collection metadata, and fixed-width elements
//! live in this module's submodules; the class-registry- and
//! transaction-aware operations (`put`, `append`, cursors, zero-copy
//! sub-range reads) are implemented as methods on
//! [`crate::txn::ReadTxn`]/[`crate::txn::WriteTxn`], since object-kind
//! elements need the same schema lookups and child-reference resolution a
//! top-level object write does.

pub mod chunk;
pub mod element;
pub mod info;

pub use chunk::{Chunk, ChunkHeader, DEFAULT_CHUNK_SIZE};
pub use element::{ElementData, ElementSpec};
pub use info::{ChunkInfo, CollectionInfo};

/// The result of [`crate::txn::ReadTxn::get_data_collection`]: `owned =
/// false` means the bytes came from a single chunk fetch with no
/// cross-chunk assembly (the zero-copy path SPEC_FULL.md section 4.5
/// describes); `owned = true` means the range spanned multiple chunks and
/// had to be concatenated into a fresh buffer.
///
/// The engine adapter's [`crate::engine::ByteMap`] contract hands back
/// owned `Vec<u8>` from every read, so this flag tracks the *algorithm's*
/// single-chunk-vs-assembled distinction rather than true pointer aliasing
/// into mapped memory — see DESIGN.md for the rationale.
#[derive(Debug, Clone)]
pub struct DataRange {
    pub bytes: Vec<u8>,
    pub owned: bool,
}
