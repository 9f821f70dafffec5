//! # Collection Element Module
//!
//! Declares the three element kinds a collection may hold. Value and raw
//! elements are fixed-width and self-contained, so their codecs live here,
//! pure and schema-free. Object elements are encoded and decoded in
//! [`crate::txn`] instead: like a top-level object, they need a class
//! descriptor lookup and (for `embedded_key` fields) child-reference
//! resolution, both of which only a transaction can provide.

use crate::error::{StoreError, StoreResult};
use crate::object;
use crate::value::{ObjectData, Value};

/// The declared shape of a collection's elements, fixed for the life of
/// the collection by whichever call created it.
#[derive(Debug, Clone)]
pub enum ElementSpec {
    /// Each element is a full (possibly polymorphic) object; `class_name`
    /// is the declared/base type a cursor dispatches substitution against.
    Object { class_name: String },
    /// Each element is one primitive scalar of a fixed `type_id`/width.
    Value { type_id: u16, width: usize },
    /// Each element is `width` raw bytes, copied verbatim.
    Raw { width: usize },
}

impl ElementSpec {
    /// `Some(width)` for the two fixed-width kinds; `None` for `Object`,
    /// whose encoded size varies per instance.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ElementSpec::Object { .. } => None,
            ElementSpec::Value { width, .. } => Some(*width),
            ElementSpec::Raw { width } => Some(*width),
        }
    }

    pub fn declared_class_name(&self) -> Option<&str> {
        match self {
            ElementSpec::Object { class_name } => Some(class_name),
            _ => None,
        }
    }
}

/// One decoded element, tagged by the same three kinds as [`ElementSpec`].
#[derive(Debug, Clone)]
pub enum ElementData {
    Object(ObjectData),
    Value(Value),
    Raw(Vec<u8>),
}

pub fn encode_value_element(width: usize, value: &Value) -> StoreResult<Vec<u8>> {
    object::check_float_native_width(value, width)?;
    let bytes = object::encode_value(value);
    if bytes.len() != width {
        return Err(StoreError::InvalidArgument(format!(
            "value element encodes to {} bytes, collection declared width {}",
            bytes.len(),
            width
        )));
    }
    Ok(bytes)
}

pub fn encode_raw_element(width: usize, bytes: &[u8]) -> StoreResult<Vec<u8>> {
    if bytes.len() != width {
        return Err(StoreError::InvalidArgument(format!(
            "raw element is {} bytes, collection declared width {}",
            bytes.len(),
            width
        )));
    }
    Ok(bytes.to_vec())
}

/// Splits a flat run of fixed-width element bytes back into individual
/// elements; used by both the value and raw-data decode paths.
pub fn split_fixed_width(payload: &[u8], width: usize) -> StoreResult<Vec<&[u8]>> {
    if width == 0 || payload.len() % width != 0 {
        return Err(StoreError::Persistence(format!(
            "chunk payload of {} bytes is not a multiple of element width {}",
            payload.len(),
            width
        )));
    }
    Ok(payload.chunks_exact(width).collect())
}

/// Packs a run of already-encoded element byte strings into one or more
/// chunks, each at least `chunk_target_bytes` long except possibly the
/// last, starting numbering from `next_chunk_id`/`next_start_index`.
pub fn pack_chunks(
    encoded_elements: &[Vec<u8>],
    chunk_target_bytes: usize,
    mut next_chunk_id: u16,
    mut next_start_index: u64,
) -> Vec<(super::info::ChunkInfo, Vec<u8>)> {
    let mut chunks = Vec::new();
    let mut payload = Vec::new();
    let mut count = 0u64;
    let mut chunk_start = next_start_index;

    for elem in encoded_elements {
        payload.extend_from_slice(elem);
        count += 1;
        if payload.len() >= chunk_target_bytes {
            chunks.push((
                super::info::ChunkInfo {
                    chunk_id: next_chunk_id,
                    start_index: chunk_start,
                    element_count: count,
                    data_size: payload.len() as u64,
                },
                std::mem::take(&mut payload),
            ));
            next_chunk_id += 1;
            next_start_index += count;
            chunk_start = next_start_index;
            count = 0;
        }
    }
    if !payload.is_empty() {
        chunks.push((
            super::info::ChunkInfo {
                chunk_id: next_chunk_id,
                start_index: chunk_start,
                element_count: count,
                data_size: payload.len() as u64,
            },
            payload,
        ));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_elements_into_chunks_honoring_target_size() {
        let elements: Vec<Vec<u8>> = (0..10u8).map(|b| vec![b; 4]).collect();
        let chunks = pack_chunks(&elements, 16, 0, 0);
        assert!(chunks.len() >= 2);
        let total: u64 = chunks.iter().map(|(c, _)| c.element_count).sum();
        assert_eq!(total, 10);
        for (i, (info, _)) in chunks.iter().enumerate() {
            assert_eq!(info.chunk_id, i as u16);
        }
        assert_eq!(chunks[0].0.start_index, 0);
    }

    #[test]
    fn split_fixed_width_rejects_misaligned_payload() {
        assert!(split_fixed_width(&[1, 2, 3], 2).is_err());
        assert_eq!(split_fixed_width(&[1, 2, 3, 4], 2).unwrap().len(), 2);
    }
}
