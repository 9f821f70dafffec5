//! # Sled Engine Binding
//!
//! The one concrete binding of the [`super::ByteMap`] contract onto
//! [`sled`]. `classdata` and `classmeta` are separate trees so the two
//! sub-databases the rest of the store assumes never collide on keys; sled
//! already orders keys lexicographically by byte string, which is exactly
//! the comparator [`crate::key::StorageKey`] is designed against.

use std::path::Path;

use crate::error::{StoreError, StoreResult};

use super::ByteMap;

/// A store's binding onto a single [`sled::Db`], holding the two named
/// sub-databases the rest of the crate drives.
pub struct SledEngine {
    db: sled::Db,
    classdata: sled::Tree,
    classmeta: sled::Tree,
}

impl SledEngine {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = sled::open(path)?;
        let classdata = db.open_tree("classdata")?;
        let classmeta = db.open_tree("classmeta")?;
        Ok(Self {
            db,
            classdata,
            classmeta,
        })
    }

    pub fn classdata(&self) -> &sled::Tree {
        &self.classdata
    }

    pub fn classmeta(&self) -> &sled::Tree {
        &self.classmeta
    }

    /// Flushes both trees to disk. Called on a clean `Store` shutdown; sled
    /// also flushes lazily in the background, so this is a durability
    /// convenience rather than a correctness requirement.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl ByteMap for sled::Tree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(sled::Tree::insert(self, key, value)?.map(|v| v.to_vec()))
    }

    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(sled::Tree::get(self, key)?.map(|v| v.to_vec()))
    }

    fn remove(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(sled::Tree::remove(self, key)?.map(|v| v.to_vec()))
    }

    fn range(&self, from: &[u8], to: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        for entry in sled::Tree::range(self, from.to_vec()..to.to_vec()) {
            let (k, v) = entry.map_err(|e| StoreError::Persistence(e.to_string()))?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }

    fn last_in_range(&self, from: &[u8], to: &[u8]) -> StoreResult<Option<(Vec<u8>, Vec<u8>)>> {
        match sled::Tree::range(self, from.to_vec()..to.to_vec()).next_back() {
            Some(entry) => {
                let (k, v) = entry.map_err(|e| StoreError::Persistence(e.to_string()))?;
                Ok(Some((k.to_vec(), v.to_vec())))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_classdata() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        engine.classdata().insert(b"k1", b"v1").unwrap();
        assert_eq!(engine.classdata().get(b"k1").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn range_visits_keys_in_lexicographic_order() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        for k in [b"a", b"c", b"b"] {
            engine.classdata().insert(k, b"x").unwrap();
        }
        let got: Vec<u8> = engine
            .classdata()
            .range(b"a", b"z")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k[0])
            .collect();
        assert_eq!(got, vec![b'a', b'b', b'c']);
    }

    #[test]
    fn classdata_and_classmeta_are_independent() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        engine.classdata().insert(b"k", b"data").unwrap();
        assert_eq!(engine.classmeta().get(b"k").unwrap(), None);
    }
}
