//! # Collection Info Module
//!
//! The per-collection metadata record persisted at
//! `(COLLINFO_CLSID, collectionId, 0)`: the ordered list of chunk ranges
//! that together cover the collection's element indices. Native-endian
//! per SPEC_FULL.md section 6 — these records are not intended to be
//! portable across platforms of differing endianness, a deliberate
//! trade-off this store preserves rather than canonicalizes.

use crate::error::{StoreError, StoreResult};
use crate::key::{ObjectId, StorageKey, COLLINFO_CLSID};

/// `chunkId(2) ‖ startIndex(8) ‖ elementCount(8) ‖ dataSize(8)`, native-endian.
pub const CHUNK_INFO_ENTRY_SIZE: usize = 2 + 8 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub chunk_id: u16,
    pub start_index: u64,
    pub element_count: u64,
    pub data_size: u64,
}

/// A collection's ordered chunk ranges. Chunks are contiguous:
/// `chunks[i].start_index + chunks[i].element_count == chunks[i+1].start_index`.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub collection_id: ObjectId,
    pub chunks: Vec<ChunkInfo>,
}

impl CollectionInfo {
    pub fn new(collection_id: ObjectId) -> Self {
        Self {
            collection_id,
            chunks: Vec::new(),
        }
    }

    pub fn storage_key(collection_id: ObjectId) -> StorageKey {
        StorageKey::object(COLLINFO_CLSID, collection_id)
    }

    pub fn next_chunk_id(&self) -> u16 {
        self.chunks.iter().map(|c| c.chunk_id).max().map_or(0, |m| m + 1)
    }

    pub fn next_start_index(&self) -> u64 {
        self.chunks
            .last()
            .map_or(0, |c| c.start_index + c.element_count)
    }

    pub fn total_elements(&self) -> u64 {
        self.next_start_index()
    }

    /// Appends a chunk range, enforcing the contiguity invariant.
    pub fn push_chunk(&mut self, chunk: ChunkInfo) -> StoreResult<()> {
        let expected = self.next_start_index();
        if chunk.start_index != expected {
            return Err(StoreError::Persistence(format!(
                "collection {} chunk {} starts at {}, expected contiguous start {}",
                self.collection_id, chunk.chunk_id, chunk.start_index, expected
            )));
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Index (into `self.chunks`) of the chunk holding element `at`, found
    /// by bisecting on `start_index + element_count`, per the sub-range
    /// read algorithm in SPEC_FULL.md section 4.5.
    pub fn chunk_containing(&self, at: u64) -> Option<usize> {
        if at >= self.total_elements() {
            return None;
        }
        let pos = self
            .chunks
            .partition_point(|c| c.start_index + c.element_count <= at);
        if pos < self.chunks.len() {
            Some(pos)
        } else {
            None
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 8 + self.chunks.len() * CHUNK_INFO_ENTRY_SIZE);
        out.extend_from_slice(&self.collection_id.to_ne_bytes());
        out.extend_from_slice(&(self.chunks.len() as u64).to_ne_bytes());
        for c in &self.chunks {
            out.extend_from_slice(&c.chunk_id.to_ne_bytes());
            out.extend_from_slice(&c.start_index.to_ne_bytes());
            out.extend_from_slice(&c.element_count.to_ne_bytes());
            out.extend_from_slice(&c.data_size.to_ne_bytes());
        }
        out
    }

    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        if data.len() < 12 {
            return Err(StoreError::Persistence("truncated collection info header".into()));
        }
        let collection_id = u32::from_ne_bytes(data[0..4].try_into().unwrap());
        let chunk_count = u64::from_ne_bytes(data[4..12].try_into().unwrap()) as usize;
        let mut cursor = 12usize;
        let mut chunks = Vec::with_capacity(chunk_count);
        for _ in 0..chunk_count {
            if data.len() < cursor + CHUNK_INFO_ENTRY_SIZE {
                return Err(StoreError::Persistence("truncated collection info entry".into()));
            }
            let chunk_id = u16::from_ne_bytes(data[cursor..cursor + 2].try_into().unwrap());
            cursor += 2;
            let start_index = u64::from_ne_bytes(data[cursor..cursor + 8].try_into().unwrap());
            cursor += 8;
            let element_count = u64::from_ne_bytes(data[cursor..cursor + 8].try_into().unwrap());
            cursor += 8;
            let data_size = u64::from_ne_bytes(data[cursor..cursor + 8].try_into().unwrap());
            cursor += 8;
            chunks.push(ChunkInfo {
                chunk_id,
                start_index,
                element_count,
                data_size,
            });
        }
        Ok(Self {
            collection_id,
            chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut info = CollectionInfo::new(7);
        info.push_chunk(ChunkInfo {
            chunk_id: 0,
            start_index: 0,
            element_count: 10,
            data_size: 40,
        })
        .unwrap();
        info.push_chunk(ChunkInfo {
            chunk_id: 1,
            start_index: 10,
            element_count: 5,
            data_size: 20,
        })
        .unwrap();
        let bytes = info.encode();
        let decoded = CollectionInfo::decode(&bytes).unwrap();
        assert_eq!(decoded.collection_id, 7);
        assert_eq!(decoded.chunks.len(), 2);
        assert_eq!(decoded.total_elements(), 15);
    }

    #[test]
    fn rejects_non_contiguous_chunk() {
        let mut info = CollectionInfo::new(1);
        info.push_chunk(ChunkInfo {
            chunk_id: 0,
            start_index: 0,
            element_count: 10,
            data_size: 10,
        })
        .unwrap();
        let err = info.push_chunk(ChunkInfo {
            chunk_id: 1,
            start_index: 11,
            element_count: 5,
            data_size: 5,
        });
        assert!(err.is_err());
    }

    #[test]
    fn bisects_to_the_right_chunk() {
        let mut info = CollectionInfo::new(1);
        info.push_chunk(ChunkInfo { chunk_id: 0, start_index: 0, element_count: 10, data_size: 10 }).unwrap();
        info.push_chunk(ChunkInfo { chunk_id: 1, start_index: 10, element_count: 10, data_size: 10 }).unwrap();
        info.push_chunk(ChunkInfo { chunk_id: 2, start_index: 20, element_count: 10, data_size: 10 }).unwrap();
        assert_eq!(info.chunk_containing(0), Some(0));
        assert_eq!(info.chunk_containing(9), Some(0));
        assert_eq!(info.chunk_containing(10), Some(1));
        assert_eq!(info.chunk_containing(25), Some(2));
        assert_eq!(info.chunk_containing(30), None);
    }
}
