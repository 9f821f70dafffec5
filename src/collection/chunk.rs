//! # Chunk Module
//!
//! The on-disk unit a collection's element stream is split into. Each chunk
//! is one `classdata` record at `(COLLECTION_CLSID, collectionId, chunkId)`:
//! a small local header (native-endian, per SPEC_FULL.md section 4.5's
//! explicit byte-format decision) followed by that chunk's raw element
//! bytes back to back. Chunking exists so that a sub-range read only has to
//! fetch the chunks overlapping the requested range, not the whole
//! collection.

use crate::error::{StoreError, StoreResult};

/// Default chunk capacity, in bytes of element payload, used when a
/// [`crate::config::StoreConfig`] doesn't override it. Large enough to
/// amortize per-chunk overhead, small enough that a sub-range read over a
/// big collection doesn't pull in the whole thing.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// `dataSize(4) ‖ startIndex(4) ‖ elementCount(4)`, all native-endian and
/// local to this chunk (global offsets live in [`super::info::CollectionInfo`]).
pub const CHUNK_HEADER_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Size, in bytes, of this chunk's element payload.
    pub data_size: u32,
    /// Index of this chunk's first element within the collection.
    pub start_index: u32,
    pub element_count: u32,
}

impl ChunkHeader {
    pub fn new(data_size: u32, start_index: u32, element_count: u32) -> Self {
        Self {
            data_size,
            start_index,
            element_count,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.data_size.to_ne_bytes());
        out.extend_from_slice(&self.start_index.to_ne_bytes());
        out.extend_from_slice(&self.element_count.to_ne_bytes());
    }

    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        if data.len() < CHUNK_HEADER_SIZE {
            return Err(StoreError::Persistence(format!(
                "truncated chunk header: need {} bytes, have {}",
                CHUNK_HEADER_SIZE,
                data.len()
            )));
        }
        Ok(Self {
            data_size: u32::from_ne_bytes(data[0..4].try_into().unwrap()),
            start_index: u32::from_ne_bytes(data[4..8].try_into().unwrap()),
            element_count: u32::from_ne_bytes(data[8..12].try_into().unwrap()),
        })
    }
}

/// One fully-decoded chunk record: its header plus a borrowed view of its
/// element payload.
pub struct Chunk<'a> {
    pub header: ChunkHeader,
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn decode(record: &'a [u8]) -> StoreResult<Self> {
        let header = ChunkHeader::decode(record)?;
        let payload = &record[CHUNK_HEADER_SIZE..];
        if payload.len() != header.data_size as usize {
            return Err(StoreError::Persistence(format!(
                "corrupt chunk: header declares {} bytes, record has {}",
                header.data_size,
                payload.len()
            )));
        }
        Ok(Self { header, payload })
    }

    pub fn encode(header: ChunkHeader, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + payload.len());
        header.encode(&mut out);
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = ChunkHeader::new(120, 40, 30);
        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert_eq!(ChunkHeader::decode(&buf).unwrap(), header);
    }

    #[test]
    fn chunk_rejects_payload_length_mismatch() {
        let header = ChunkHeader::new(4, 0, 1);
        let mut record = Vec::new();
        header.encode(&mut record);
        record.extend_from_slice(&[1, 2, 3]); // only 3 bytes, header says 4
        assert!(Chunk::decode(&record).is_err());
    }
}
