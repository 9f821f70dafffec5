#![warn(missing_docs)]
//! # Flexobject
//!
//! An embedded, transactional, schema-aware object store over an ordered
//! key/value engine: objects are encoded into compact shallow buffers under
//! a reconciled class schema, transactions are single-writer/multi-reader
//! with overlay-buffered writes, and top-level chunked collections provide
//! ordered sequences with sub-range reads that avoid materializing the
//! whole collection.
//!
//! The store never assumes a global instance: every operation borrows from
//! an explicit [`Store`], opened against a [`StoreConfig`] and a set of
//! [`ClassSpec`] declarations reconciled against whatever schema the engine
//! already has on disk.

/* MODULES */

pub mod buffer;
pub mod codec;
pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod object;
pub mod schema;
pub mod store;
pub mod txn;
pub mod value;

/* PUBLIC API SURFACE */

pub use collection::{Chunk, ChunkHeader, ChunkInfo, CollectionInfo, DataRange, ElementData, ElementSpec};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use key::{ObjectKey, StorageKey};
pub use schema::{ClassSpec, PropertyDescriptor, SchemaCompatibility, StorageLayout};
pub use store::Store;
pub use txn::{Appender, CollectionCursor, MemberCursor, MemberElement, ObjectCursor, ReadTxn, SuspendedReadTxn, WriteTxn};
pub use value::{FieldValue, ObjectData, ReferenceValue, Value};
