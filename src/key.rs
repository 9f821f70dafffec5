//! # Key Module
//!
//! Defines the fixed-width identifier types and the 8-byte [`StorageKey`]
//! that every record in the store is addressed by. The byte layout here is
//! load-bearing: the field order must match the underlying engine's
//! lexicographic key comparator so that within-class iteration visits
//! objects in `objectId` order, and within-object iteration visits
//! `propertyId = 0` (the object buffer) before any sub-property record.

use crate::error::{StoreError, StoreResult};

/* IDENTIFIER TYPES */

pub type ClassId = u16;
pub type ObjectId = u32;
pub type PropertyId = u16;

/// Reserved class id for a collection's element-stream chunks.
pub const COLLECTION_CLSID: ClassId = 1;

/// Reserved class id for a collection's [`crate::collection::info::CollectionInfo`] record.
pub const COLLINFO_CLSID: ClassId = 2;

/// The first class id available for user-declared classes.
pub const MIN_USER_CLASS_ID: ClassId = 10;

/// The `propertyId` denoting "the object proper" (its shallow buffer).
pub const OBJECT_PROPERTY_ID: PropertyId = 0;

/// Number of bytes in the serialized form of a [`StorageKey`].
pub const STORAGE_KEY_SIZE: usize = 8;

/* STORAGE KEY */

/// An 8-byte, big-endian `classId ‖ objectId ‖ propertyId` triple. Field
/// declaration order matches serialized byte order, so deriving `Ord` here
/// produces exactly the ordering the underlying engine's comparator must
/// provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey {
    pub class_id: ClassId,
    pub object_id: ObjectId,
    pub property_id: PropertyId,
}

impl StorageKey {
    pub fn new(class_id: ClassId, object_id: ObjectId, property_id: PropertyId) -> Self {
        Self {
            class_id,
            object_id,
            property_id,
        }
    }

    /// The key of an object's shallow buffer (`propertyId = 0`).
    pub fn object(class_id: ClassId, object_id: ObjectId) -> Self {
        Self::new(class_id, object_id, OBJECT_PROPERTY_ID)
    }

    pub fn to_bytes(self) -> [u8; STORAGE_KEY_SIZE] {
        let mut buf = [0u8; STORAGE_KEY_SIZE];
        buf[0..2].copy_from_slice(&self.class_id.to_be_bytes());
        buf[2..6].copy_from_slice(&self.object_id.to_be_bytes());
        buf[6..8].copy_from_slice(&self.property_id.to_be_bytes());
        buf
    }

    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        if data.len() != STORAGE_KEY_SIZE {
            return Err(StoreError::Persistence(format!(
                "corrupt storage key: expected {} bytes, got {}",
                STORAGE_KEY_SIZE,
                data.len()
            )));
        }
        Ok(Self {
            class_id: u16::from_be_bytes([data[0], data[1]]),
            object_id: u32::from_be_bytes([data[2], data[3], data[4], data[5]]),
            property_id: u16::from_be_bytes([data[6], data[7]]),
        })
    }

    /// Lower bound (inclusive) of every key belonging to `class_id`.
    pub fn class_lower(class_id: ClassId) -> [u8; STORAGE_KEY_SIZE] {
        StorageKey::new(class_id, 0, 0).to_bytes()
    }

    /// Upper bound (exclusive) of every key belonging to `class_id`: the
    /// lower bound of the next class.
    pub fn class_upper(class_id: ClassId) -> [u8; STORAGE_KEY_SIZE] {
        StorageKey::new(class_id.wrapping_add(1), 0, 0).to_bytes()
    }

    /// Lower bound (inclusive) of every key belonging to `(class_id, object_id)`.
    pub fn object_lower(class_id: ClassId, object_id: ObjectId) -> [u8; STORAGE_KEY_SIZE] {
        StorageKey::new(class_id, object_id, 0).to_bytes()
    }

    /// Upper bound (exclusive) of every key belonging to `(class_id, object_id)`.
    pub fn object_upper(class_id: ClassId, object_id: ObjectId) -> [u8; STORAGE_KEY_SIZE] {
        StorageKey::new(class_id, object_id, PropertyId::MAX)
            .next()
            .to_bytes()
    }

    /// The key immediately following this one in lexicographic order.
    fn next(self) -> Self {
        if self.property_id < PropertyId::MAX {
            Self::new(self.class_id, self.object_id, self.property_id + 1)
        } else if self.object_id < ObjectId::MAX {
            Self::new(self.class_id, self.object_id + 1, 0)
        } else {
            Self::new(self.class_id + 1, 0, 0)
        }
    }
}

/// The identity half of a persisted object: enough to address it again, but
/// without the in-memory refcount bookkeeping the store keeps alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub class_id: ClassId,
    pub object_id: ObjectId,
}

impl ObjectKey {
    pub fn new(class_id: ClassId, object_id: ObjectId) -> Self {
        Self {
            class_id,
            object_id,
        }
    }

    pub fn storage_key(self) -> StorageKey {
        StorageKey::object(self.class_id, self.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let key = StorageKey::new(42, 1337, 7);
        let bytes = key.to_bytes();
        assert_eq!(StorageKey::from_bytes(&bytes).unwrap(), key);
    }

    #[test]
    fn orders_by_class_then_object_then_property() {
        let a = StorageKey::new(10, 1, 5);
        let b = StorageKey::new(10, 2, 0);
        let c = StorageKey::new(11, 0, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(a.to_bytes() < b.to_bytes());
        assert!(b.to_bytes() < c.to_bytes());
    }

    #[test]
    fn object_buffer_sorts_before_sub_properties() {
        let shallow = StorageKey::object(10, 5);
        let sub = StorageKey::new(10, 5, 1);
        assert!(shallow < sub);
    }

    #[test]
    fn class_bounds_cover_exactly_that_class() {
        let lower = StorageKey::class_lower(10);
        let upper = StorageKey::class_upper(10);
        let inside = StorageKey::new(10, ObjectId::MAX, PropertyId::MAX).to_bytes();
        let outside = StorageKey::new(11, 0, 0).to_bytes();
        assert!(lower.as_slice() <= inside.as_slice());
        assert!(inside.as_slice() < upper.as_slice());
        assert_eq!(upper, outside);
    }
}
