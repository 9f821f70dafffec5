//! # Transaction Engine Module
//!
//! Wraps the engine binding with the read/write contract from SPEC_FULL.md
//! section 4.4: concurrent readers, one writer at a time (via
//! [`crate::engine::WriteGate`]), the four property storage layouts, and
//! the shallow-buffer serialization recursion. A [`WriteTxn`] buffers every
//! mutation in an in-memory [`Overlay`] so `abort` can discard it and
//! `commit` applies it to the engine atomically from the caller's
//! perspective; reads issued through the same `WriteTxn` see the overlay
//! first, satisfying "operations observe their own writes" (SPEC_FULL.md
//! section 5).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use log::{debug, trace, warn};

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::collection::{self, Chunk, ChunkHeader, CollectionInfo, DataRange, ElementData, ElementSpec};
use crate::engine::{ByteMap, WriterGuard};
use crate::error::{StoreError, StoreResult};
use crate::key::{ClassId, ObjectId, ObjectKey, PropertyId, StorageKey, COLLECTION_CLSID};
use crate::object::{self, ChildResolver, ObjectHeader, OBJECT_HEADER_SIZE};
use crate::schema::{ClassDescriptor, SchemaRegistry, StorageLayout};
use crate::store::Store;
use crate::value::{FieldValue, ObjectData, ReferenceValue, Value};

/* OVERLAY */

/// Buffered `classdata` mutations for one write transaction. `None` marks
/// a tombstone (a key the overlay deletes relative to the committed
/// state).
#[derive(Default)]
pub(crate) struct Overlay {
    data: HashMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Overlay {
    fn get(&self, base: &dyn ByteMap, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.data.get(key) {
            Some(Some(v)) => Ok(Some(v.clone())),
            Some(None) => Ok(None),
            None => base.get(key),
        }
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.data.insert(key, Some(value));
    }

    fn remove(&mut self, key: Vec<u8>) {
        self.data.insert(key, None);
    }

    fn range(&self, base: &dyn ByteMap, from: &[u8], to: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = base.range(from, to)?.into_iter().collect();
        for (k, v) in &self.data {
            if k.as_slice() >= from && k.as_slice() < to {
                match v {
                    Some(val) => {
                        merged.insert(k.clone(), val.clone());
                    }
                    None => {
                        merged.remove(k);
                    }
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn last_in_range(&self, base: &dyn ByteMap, from: &[u8], to: &[u8]) -> StoreResult<Option<(Vec<u8>, Vec<u8>)>> {
        Ok(self.range(base, from, to)?.into_iter().next_back())
    }

    fn commit(self, base: &dyn ByteMap) -> StoreResult<()> {
        for (key, value) in self.data {
            match value {
                Some(bytes) => {
                    base.insert(&key, &bytes)?;
                }
                None => {
                    base.remove(&key)?;
                }
            }
        }
        Ok(())
    }
}

/// A read-through view combining an `Overlay` with the underlying engine
/// tree, implementing [`ByteMap`] so every generic read helper in this
/// module works identically for [`ReadTxn`] (no overlay) and [`WriteTxn`]
/// (overlay-backed).
struct OverlayView<'a> {
    base: &'a dyn ByteMap,
    overlay: &'a Overlay,
}

impl ByteMap for OverlayView<'_> {
    fn insert(&self, _key: &[u8], _value: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Err(StoreError::InvalidArgument("OverlayView is read-only".into()))
    }
    fn remove(&self, _key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Err(StoreError::InvalidArgument("OverlayView is read-only".into()))
    }
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.overlay.get(self.base, key)
    }
    fn range(&self, from: &[u8], to: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.overlay.range(self.base, from, to)
    }
    fn last_in_range(&self, from: &[u8], to: &[u8]) -> StoreResult<Option<(Vec<u8>, Vec<u8>)>> {
        self.overlay.last_in_range(self.base, from, to)
    }
}

/* READ TRANSACTION */

pub struct ReadTxn<'s> {
    pub(crate) store: &'s Store,
    /// Per-transaction cache of decoded [`CollectionInfo`] records, kept
    /// alive across [`ReadTxn::reset`]/[`SuspendedReadTxn::renew`] so a
    /// long-lived cursor loop doesn't re-decode the same collection's
    /// chunk index on every snapshot refresh (SPEC_FULL.md section 5).
    collection_info_cache: RefCell<HashMap<ObjectId, CollectionInfo>>,
}

impl<'s> ReadTxn<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        trace!("begin read transaction");
        Self {
            store,
            collection_info_cache: RefCell::new(HashMap::new()),
        }
    }

    fn classdata(&self) -> &dyn ByteMap {
        self.store.engine.classdata()
    }

    pub fn load_object(&self, class_name: &str, object_id: ObjectId) -> StoreResult<Option<ObjectData>> {
        let registry_guard = self.store.registry()?;
        let registry = registry_guard.as_ref().unwrap();
        let descriptor = lookup_class(registry, class_name)?;
        load_object_shallow(self.classdata(), registry, descriptor, object_id)
    }

    pub fn get_object(&self, class_name: &str, object_id: ObjectId) -> StoreResult<ObjectData> {
        self.load_object(class_name, object_id)?.ok_or_else(|| {
            StoreError::Persistence(format!(
                "no object {}:{} found",
                class_name, object_id
            ))
        })
    }

    /// Re-fetches `object_id` against this transaction's current view,
    /// discarding whatever fields `data` previously held. `data` only
    /// supplies the class to look up; callers hold it from an earlier
    /// `loadObject`/`getObject` in the same transaction and want it
    /// refreshed rather than looking the class up again by name.
    pub fn reload_object(&self, data: &ObjectData, object_id: ObjectId) -> StoreResult<ObjectData> {
        self.get_object(&data.class_name, object_id)
    }

    /// Suspends this transaction, releasing nothing the underlying engine
    /// needs back (the adapter hands out no pinned snapshot handle to
    /// release) but preserving the `CollectionInfo` cache so a later
    /// [`SuspendedReadTxn::renew`] resumes without re-populating it.
    pub fn reset(self) -> SuspendedReadTxn<'s> {
        trace!("reset read transaction");
        SuspendedReadTxn {
            store: self.store,
            collection_info_cache: self.collection_info_cache,
        }
    }

    /// Realizes a `property`-layout field on demand (a lazy scalar vector
    /// or key-vector of references).
    pub fn load_member(
        &self,
        class_name: &str,
        object_id: ObjectId,
        property_name: &str,
    ) -> StoreResult<FieldValue> {
        let registry_guard = self.store.registry()?;
        let registry = registry_guard.as_ref().unwrap();
        let descriptor = lookup_class(registry, class_name)?;
        let (index, prop) = descriptor
            .properties
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == property_name)
            .ok_or_else(|| StoreError::InvalidArgument(format!("no such property '{}'", property_name)))?;
        if prop.layout != StorageLayout::Property {
            return Err(StoreError::InvalidArgument(format!(
                "property '{}' is not separately stored",
                property_name
            )));
        }
        read_property_record(self.classdata(), descriptor.class_id, object_id, (index + 1) as PropertyId, prop)
    }

    /// A cursor over one object's `property`-layout vector (a lazy scalar
    /// vector or key-vector of references). Unlike [`ReadTxn::open_cursor`]
    /// over a chunked top-level collection, a `property`-layout record is
    /// stored and loaded whole, so this cursor realizes [`ReadTxn::load_member`]
    /// once and walks the resulting in-memory vector; it exists for
    /// interface symmetry with the collection cursor rather than to avoid
    /// materializing the record.
    pub fn open_member_cursor(
        &self,
        class_name: &str,
        object_id: ObjectId,
        property_name: &str,
    ) -> StoreResult<MemberCursor> {
        let field = self.load_member(class_name, object_id, property_name)?;
        let values: Vec<MemberElement> = match field {
            FieldValue::ScalarVector(values) => {
                values.into_iter().map(MemberElement::Scalar).collect()
            }
            FieldValue::ReferenceVector(refs) => {
                refs.into_iter().map(MemberElement::Reference).collect()
            }
            other => {
                return Err(StoreError::InvalidArgument(format!(
                    "property '{}' is not a lazy vector: {:?}",
                    property_name,
                    std::mem::discriminant(&other)
                )))
            }
        };
        Ok(MemberCursor {
            elements: values.into_iter(),
        })
    }

    /// A polymorphic cursor over every live instance of `class_name` and
    /// its registered subclasses, in `(classId, objectId)` order.
    pub fn open_cursor(&self, class_name: &str) -> StoreResult<ObjectCursor<'_>> {
        let registry_guard = self.store.registry()?;
        let registry = registry_guard.as_ref().unwrap();
        let class_ids = registry.all_class_ids(class_name)?;
        ObjectCursor::new(self.classdata(), class_name.to_string(), class_ids)
    }

    /// The persisted chunk-range metadata for `collection_id`, served from
    /// this transaction's cache when already loaded.
    pub fn load_collection_info(&self, collection_id: ObjectId) -> StoreResult<CollectionInfo> {
        if let Some(info) = self.collection_info_cache.borrow().get(&collection_id) {
            return Ok(info.clone());
        }
        let info = read_collection_info(self.classdata(), collection_id)?
            .ok_or_else(|| StoreError::Persistence(format!("no collection with id {}", collection_id)))?;
        self.collection_info_cache
            .borrow_mut()
            .insert(collection_id, info.clone());
        Ok(info)
    }

    /// Loads every chunk of `collection_id` and decodes its elements
    /// against `spec`, in index order.
    pub fn get_collection_full(&self, collection_id: ObjectId, spec: &ElementSpec) -> StoreResult<Vec<ElementData>> {
        let info = self.load_collection_info(collection_id)?;
        let registry_guard = self.store.registry()?;
        let registry = registry_guard.as_ref().unwrap();
        let mut out = Vec::new();
        for chunk_info in &info.chunks {
            let record = read_chunk(self.classdata(), collection_id, chunk_info.chunk_id)?;
            let decoded = Chunk::decode(&record)?;
            out.extend(decode_chunk_elements(decoded.payload, spec, registry)?);
        }
        Ok(out)
    }

    /// A cursor walking `collection_id`'s elements in chunk/index order.
    pub fn open_collection_cursor(&self, collection_id: ObjectId, spec: ElementSpec) -> StoreResult<CollectionCursor> {
        let elements = self.get_collection_full(collection_id, &spec)?;
        Ok(CollectionCursor {
            elements: elements.into_iter(),
        })
    }

    /// Reads the half-open element range `[start, start+length)` of a
    /// fixed-width (`Value`/`Raw`) collection, per the sub-range read
    /// algorithm in SPEC_FULL.md section 4.5: a request contained in one
    /// chunk avoids cross-chunk assembly (`owned = false`); a request
    /// spanning chunks is copied into a fresh buffer (`owned = true`).
    pub fn get_data_collection(
        &self,
        collection_id: ObjectId,
        spec: &ElementSpec,
        start: u64,
        length: u64,
    ) -> StoreResult<DataRange> {
        let width = spec.fixed_width().ok_or_else(|| {
            StoreError::InvalidArgument("get_data_collection requires a fixed-width (value or raw) collection".into())
        })?;
        if length == 0 {
            return Ok(DataRange {
                bytes: Vec::new(),
                owned: false,
            });
        }
        let info = self.load_collection_info(collection_id)?;
        let end = start
            .checked_add(length)
            .ok_or_else(|| StoreError::InvalidArgument("requested range overflows".into()))?;
        if end > info.total_elements() {
            return Err(StoreError::InvalidArgument(format!(
                "requested range [{}, {}) exceeds collection length {}",
                start,
                end,
                info.total_elements()
            )));
        }
        let first_idx = info.chunk_containing(start).unwrap();
        let last_idx = info.chunk_containing(end - 1).unwrap();

        if first_idx == last_idx {
            let chunk_info = info.chunks[first_idx];
            let record = read_chunk(self.classdata(), collection_id, chunk_info.chunk_id)?;
            let decoded = Chunk::decode(&record)?;
            let offset = (start - chunk_info.start_index) as usize * width;
            let len_bytes = length as usize * width;
            let slice = decoded
                .payload
                .get(offset..offset + len_bytes)
                .ok_or_else(|| StoreError::Persistence("chunk payload shorter than its declared range".into()))?;
            Ok(DataRange {
                bytes: slice.to_vec(),
                owned: false,
            })
        } else {
            let mut buf = Vec::with_capacity(length as usize * width);
            for idx in first_idx..=last_idx {
                let chunk_info = info.chunks[idx];
                let record = read_chunk(self.classdata(), collection_id, chunk_info.chunk_id)?;
                let decoded = Chunk::decode(&record)?;
                let lo = if idx == first_idx {
                    (start - chunk_info.start_index) as usize * width
                } else {
                    0
                };
                let hi = if idx == last_idx {
                    (end - chunk_info.start_index) as usize * width
                } else {
                    decoded.payload.len()
                };
                buf.extend_from_slice(&decoded.payload[lo..hi]);
            }
            Ok(DataRange { bytes: buf, owned: true })
        }
    }
}

/// A [`ReadTxn`] that has given up its place via [`ReadTxn::reset`]. Its
/// only content worth carrying across the suspension is the per-transaction
/// `CollectionInfo` cache; call [`SuspendedReadTxn::renew`] to resume
/// reading against the store's current state.
pub struct SuspendedReadTxn<'s> {
    store: &'s Store,
    collection_info_cache: RefCell<HashMap<ObjectId, CollectionInfo>>,
}

impl<'s> SuspendedReadTxn<'s> {
    /// Resumes reading, handing the `CollectionInfo` cache back to the
    /// renewed transaction untouched.
    pub fn renew(self) -> ReadTxn<'s> {
        trace!("renew read transaction");
        ReadTxn {
            store: self.store,
            collection_info_cache: self.collection_info_cache,
        }
    }
}

/* WRITE TRANSACTION */

pub struct WriteTxn<'s> {
    store: &'s Store,
    _guard: WriterGuard<'s>,
    append: bool,
    overlay: Overlay,
    pending_max_object_id: HashMap<ClassId, u32>,
    collection_id_cursor: Option<u32>,
}

impl<'s> WriteTxn<'s> {
    pub(crate) fn new(store: &'s Store, guard: WriterGuard<'s>, append: bool) -> Self {
        debug!("begin write transaction (append={})", append);
        Self {
            store,
            _guard: guard,
            append,
            overlay: Overlay::default(),
            pending_max_object_id: HashMap::new(),
            collection_id_cursor: None,
        }
    }

    fn view(&self) -> OverlayView<'_> {
        OverlayView {
            base: self.store.engine.classdata(),
            overlay: &self.overlay,
        }
    }

    fn next_object_id(&mut self, descriptor: &ClassDescriptor) -> u32 {
        let current = self
            .pending_max_object_id
            .get(&descriptor.class_id)
            .copied()
            .unwrap_or(descriptor.max_object_id);
        let next = current + 1;
        self.pending_max_object_id.insert(descriptor.class_id, next);
        next
    }

    fn put_raw(&mut self, key: StorageKey, value: Vec<u8>) -> StoreResult<()> {
        self.overlay.put(key.to_bytes().to_vec(), value);
        Ok(())
    }

    pub fn load_object(&self, class_name: &str, object_id: ObjectId) -> StoreResult<Option<ObjectData>> {
        let registry_guard = self.store.registry()?;
        let registry = registry_guard.as_ref().unwrap();
        let descriptor = lookup_class(registry, class_name)?;
        load_object_shallow(&self.view(), registry, descriptor, object_id)
    }

    pub fn get_object(&self, class_name: &str, object_id: ObjectId) -> StoreResult<ObjectData> {
        self.load_object(class_name, object_id)?
            .ok_or_else(|| StoreError::Persistence(format!("no object {}:{} found", class_name, object_id)))
    }

    /// Re-fetches `object_id` against this transaction's overlay-backed
    /// view (so it sees the write transaction's own uncommitted writes),
    /// discarding whatever fields `data` previously held.
    pub fn reload_object(&self, data: &ObjectData, object_id: ObjectId) -> StoreResult<ObjectData> {
        self.get_object(&data.class_name, object_id)
    }

    /// Assigns a new `objectId` and persists `data` as a fresh instance of
    /// its class.
    pub fn put_object(&mut self, data: &ObjectData) -> StoreResult<ObjectKey> {
        self.save_new(data)
    }

    /// `new_object = true` behaves like [`WriteTxn::put_object`]; otherwise
    /// overwrites the instance at `key`.
    pub fn save_object(&mut self, key: Option<ObjectKey>, data: &ObjectData) -> StoreResult<ObjectKey> {
        match key {
            None => self.save_new(data),
            Some(key) => {
                if self.append {
                    return Err(StoreError::InvalidArgument(
                        "append mode only allows sequential put_object, not writes at an explicit key".into(),
                    ));
                }
                self.write_object_at(key.class_id, key.object_id, data)?;
                Ok(key)
            }
        }
    }

    fn save_new(&mut self, data: &ObjectData) -> StoreResult<ObjectKey> {
        let class_id = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = lookup_class(registry, &data.class_name)?;
            descriptor.class_id
        };
        let object_id = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = registry.class_by_id(class_id).unwrap();
            self.next_object_id(descriptor)
        };
        self.write_object_at(class_id, object_id, data)?;
        Ok(ObjectKey::new(class_id, object_id))
    }

    /// Full rewrite of the shallow buffer, per `update_object`.
    pub fn update_object(&mut self, key: ObjectKey, data: &ObjectData) -> StoreResult<()> {
        if self.append {
            return Err(StoreError::InvalidArgument(
                "append mode does not allow rewriting an existing object".into(),
            ));
        }
        self.write_object_at(key.class_id, key.object_id, data)
    }

    fn write_object_at(&mut self, class_id: ClassId, object_id: ObjectId, data: &ObjectData) -> StoreResult<()> {
        let registry_guard = self.store.registry()?;
        let registry = registry_guard.as_ref().unwrap();
        let descriptor = registry
            .class_by_id(class_id)
            .ok_or_else(|| StoreError::InvalidArgument(format!("class id {} not registered", class_id)))?;
        if descriptor.compatibility != crate::schema::SchemaCompatibility::Full {
            return Err(StoreError::InvalidArgument(format!(
                "class '{}' is not fully save-compatible with its persisted schema",
                descriptor.name
            )));
        }
        if self.append
            && descriptor
                .properties
                .iter()
                .any(|p| matches!(p.layout, StorageLayout::EmbeddedKey | StorageLayout::Property))
        {
            return Err(StoreError::InvalidArgument(format!(
                "append mode requires homogeneous simple objects; class '{}' references other mapped objects",
                descriptor.name
            )));
        }
        drop(registry_guard);

        let mut wb = WriteBuffer::new();
        wb.start(256);
        {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = registry.class_by_id(class_id).unwrap();
            object::write_shallow(&mut wb, descriptor, data, registry, self)?;
        }
        let body = wb.into_bytes();

        self.bump_reference_counts(class_id, object_id, data)?;
        self.write_property_fields(class_id, object_id, data)?;

        let mut record = Vec::with_capacity(OBJECT_HEADER_SIZE + body.len());
        ObjectHeader::new(class_id, object_id, body.len() as u32, false).encode(&mut record);
        record.extend_from_slice(&body);
        self.put_raw(StorageKey::object(class_id, object_id), record)?;
        Ok(())
    }

    /// Writes every `property`-layout field (separately stored) for this
    /// object: lazy scalar vectors and key-vectors of references.
    fn write_property_fields(&mut self, class_id: ClassId, object_id: ObjectId, data: &ObjectData) -> StoreResult<()> {
        let properties = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            registry.class_by_id(class_id).unwrap().properties.clone()
        };
        if data.fields.len() != properties.len() {
            return Err(StoreError::InvalidArgument(format!(
                "class with {} properties given {} field values",
                properties.len(),
                data.fields.len()
            )));
        }
        for (position, prop) in properties.iter().enumerate() {
            if !prop.enabled {
                continue;
            }
            let field = &data.fields[position];
            if prop.layout != StorageLayout::Property {
                continue;
            }
            let property_id = (position + 1) as PropertyId;
            let bytes = match field {
                FieldValue::ScalarVector(values) => encode_scalar_vector(values, prop.byte_size)?,
                FieldValue::ReferenceVector(refs) => self.encode_reference_vector(refs)?,
                _ => {
                    return Err(StoreError::InvalidArgument(format!(
                        "property '{}' has layout 'property' but an incompatible field shape",
                        prop.name
                    )))
                }
            };
            self.overlay
                .put(StorageKey::new(class_id, object_id, property_id).to_bytes().to_vec(), bytes);
        }
        Ok(())
    }

    fn encode_reference_vector(&mut self, refs: &[ReferenceValue]) -> StoreResult<Vec<u8>> {
        let mut out = Vec::new();
        crate::codec::write_uint(&mut out, refs.len() as u64, 4);
        for r in refs {
            let key = match r {
                ReferenceValue::Existing(key) => {
                    self.adjust_refcount(*key, 1)?;
                    *key
                }
                ReferenceValue::ToSave(child) => {
                    let mut wb = WriteBuffer::new();
                    wb.start(64);
                    let key = self.resolve(&mut wb, child)?;
                    key
                }
            };
            out.extend_from_slice(&key.storage_key().to_bytes());
        }
        Ok(out)
    }

    /// Bumps the refcount of every `embedded_key` reference this object
    /// newly embeds (both `ToSave` children, implicitly owned from
    /// creation, and reused `Existing` references).
    fn bump_reference_counts(&mut self, class_id: ClassId, _object_id: ObjectId, data: &ObjectData) -> StoreResult<()> {
        let properties = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            registry.class_by_id(class_id).unwrap().properties.clone()
        };
        for (prop, field) in properties.iter().zip(data.fields.iter()) {
            if !prop.enabled || prop.layout != StorageLayout::EmbeddedKey {
                continue;
            }
            if let FieldValue::Reference(Some(ReferenceValue::Existing(key))) = field {
                self.adjust_refcount(*key, 1)?;
            }
        }
        Ok(())
    }

    fn adjust_refcount(&mut self, key: ObjectKey, delta: i64) -> StoreResult<()> {
        let class_refcounted = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            registry.class_by_id(key.class_id).map(|d| d.refcounted).unwrap_or(false)
        };
        if !class_refcounted {
            return Ok(());
        }
        let mut counts = self.store.refcounts.lock().expect("refcount lock poisoned");
        let entry = counts.entry(key).or_insert(0);
        *entry = (*entry as i64 + delta).max(0) as u32;
        let should_delete = *entry == 0 && delta < 0;
        drop(counts);
        if should_delete {
            warn!("refcount for {:?} reached zero; erasing referent", key);
            self.erase_object_record(key)?;
        }
        Ok(())
    }

    fn erase_object_record(&mut self, key: ObjectKey) -> StoreResult<()> {
        let descriptor_props = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            registry.class_by_id(key.class_id).map(|d| d.properties.clone())
        };
        self.overlay.remove(key.storage_key().to_bytes().to_vec());
        if let Some(properties) = descriptor_props {
            for (idx, prop) in properties.iter().enumerate() {
                if prop.layout == StorageLayout::Property {
                    let property_id = (idx + 1) as PropertyId;
                    self.overlay
                        .remove(StorageKey::new(key.class_id, key.object_id, property_id).to_bytes().to_vec());
                }
            }
        }
        Ok(())
    }

    /// Rewrites a single property without touching the rest of the
    /// object, per `updateMember`'s layout-dependent behavior.
    pub fn update_member(&mut self, key: ObjectKey, data: &ObjectData, property_name: &str) -> StoreResult<()> {
        if self.append {
            return Err(StoreError::InvalidArgument(
                "append mode does not allow updating a member of an existing object".into(),
            ));
        }
        let (position, layout) = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = registry
                .class_by_id(key.class_id)
                .ok_or_else(|| StoreError::InvalidArgument(format!("class id {} not registered", key.class_id)))?;
            let (i, prop) = descriptor
                .properties
                .iter()
                .enumerate()
                .find(|(_, p)| p.name == property_name)
                .ok_or_else(|| StoreError::InvalidArgument(format!("no such property '{}'", property_name)))?;
            (i, prop.layout)
        };
        match layout {
            StorageLayout::Property => self.write_property_fields(key.class_id, key.object_id, data),
            StorageLayout::EmbeddedKey | StorageLayout::AllEmbedded => {
                self.write_object_at(key.class_id, key.object_id, data)
            }
            StorageLayout::ObjectId => {
                let _ = position;
                Ok(())
            }
        }
    }

    /// Erases `(classId, objectId, 0)` and every separately-stored
    /// `property`-layout record; decrements the refcount of any embedded
    /// reference this object held.
    pub fn delete_object(&mut self, key: ObjectKey) -> StoreResult<()> {
        if self.append {
            return Err(StoreError::InvalidArgument(
                "append mode does not allow deleting an existing object".into(),
            ));
        }
        let existing = self.load_object(
            &{
                let registry_guard = self.store.registry()?;
                registry_guard
                    .as_ref()
                    .unwrap()
                    .class_by_id(key.class_id)
                    .ok_or_else(|| StoreError::InvalidArgument(format!("class id {} not registered", key.class_id)))?
                    .name
                    .clone()
            },
            key.object_id,
        )?;
        if let Some(data) = existing {
            let properties = {
                let registry_guard = self.store.registry()?;
                registry_guard.as_ref().unwrap().class_by_id(key.class_id).unwrap().properties.clone()
            };
            for (prop, field) in properties.iter().zip(data.fields.iter()) {
                if !prop.enabled || prop.layout != StorageLayout::EmbeddedKey {
                    continue;
                }
                if let FieldValue::Reference(Some(ReferenceValue::Existing(ref_key))) = field {
                    self.adjust_refcount(*ref_key, -1)?;
                }
            }
        }
        self.erase_object_record(key)
    }

    fn next_collection_id(&mut self) -> ObjectId {
        let current = self
            .collection_id_cursor
            .unwrap_or_else(|| *self.store.max_collection_id.lock().expect("max_collection_id lock poisoned"));
        let next = current + 1;
        self.collection_id_cursor = Some(next);
        next
    }

    /// Creates a new collection with `collection_id = ++maxCollectionId`,
    /// chunked per `spec` and the store's configured chunk size.
    pub fn put_collection(&mut self, spec: ElementSpec, elements: Vec<ElementData>) -> StoreResult<ObjectId> {
        let collection_id = self.next_collection_id();
        trace!("put_collection {} ({} elements)", collection_id, elements.len());
        self.write_collection_chunks(collection_id, &spec, elements, 0, 0)?;
        Ok(collection_id)
    }

    /// Extends an existing collection with more elements, starting new
    /// chunks at its current `nextChunkId`/`nextStartIndex`.
    pub fn append_collection(&mut self, collection_id: ObjectId, spec: ElementSpec, elements: Vec<ElementData>) -> StoreResult<()> {
        let info = read_collection_info(&self.view(), collection_id)?
            .ok_or_else(|| StoreError::InvalidArgument(format!("no collection with id {}", collection_id)))?;
        trace!(
            "append_collection {} (+{} elements, next_start_index={})",
            collection_id,
            elements.len(),
            info.next_start_index()
        );
        self.write_collection_chunks(collection_id, &spec, elements, info.next_chunk_id(), info.next_start_index())
    }

    /// Starts a streaming [`Appender`] that amortizes chunk-boundary cost
    /// across repeated `push` calls. Pass `collection_id = None` to create
    /// a new collection on the first flush, or `Some(id)` to append to an
    /// existing one.
    pub fn appender(&mut self, spec: ElementSpec, collection_id: Option<ObjectId>) -> Appender<'_, 's> {
        Appender::new(self, spec, collection_id)
    }

    fn write_collection_chunks(
        &mut self,
        collection_id: ObjectId,
        spec: &ElementSpec,
        elements: Vec<ElementData>,
        start_chunk_id: u16,
        start_index: u64,
    ) -> StoreResult<()> {
        let mut info =
            read_collection_info(&self.view(), collection_id)?.unwrap_or_else(|| CollectionInfo::new(collection_id));
        let chunk_target = self.store.config.default_chunk_size;

        let mut encoded = Vec::with_capacity(elements.len());
        for element in elements {
            encoded.push(self.encode_element(spec, element)?);
        }
        let packed = collection::element::pack_chunks(&encoded, chunk_target, start_chunk_id, start_index);

        for (chunk_info, payload) in packed {
            let header = ChunkHeader::new(
                payload.len() as u32,
                chunk_info.start_index as u32,
                chunk_info.element_count as u32,
            );
            let record = Chunk::encode(header, &payload);
            self.overlay.put(
                StorageKey::new(COLLECTION_CLSID, collection_id, chunk_info.chunk_id).to_bytes().to_vec(),
                record,
            );
            info.push_chunk(chunk_info)?;
        }
        self.overlay
            .put(CollectionInfo::storage_key(collection_id).to_bytes().to_vec(), info.encode());
        Ok(())
    }

    fn encode_element(&mut self, spec: &ElementSpec, element: ElementData) -> StoreResult<Vec<u8>> {
        match (spec, element) {
            (ElementSpec::Value { width, .. }, ElementData::Value(v)) => {
                collection::element::encode_value_element(*width, &v)
            }
            (ElementSpec::Raw { width }, ElementData::Raw(bytes)) => {
                collection::element::encode_raw_element(*width, &bytes)
            }
            (ElementSpec::Object { .. }, ElementData::Object(data)) => self.encode_object_element(&data),
            _ => Err(StoreError::InvalidArgument(
                "element kind does not match the collection's declared element spec".into(),
            )),
        }
    }

    /// Encodes one object element: an object header plus its shallow
    /// buffer, exactly like a top-level object write, except the record is
    /// handed back to be packed into a chunk instead of stored at its own
    /// top-level key.
    fn encode_object_element(&mut self, data: &ObjectData) -> StoreResult<Vec<u8>> {
        let class_id = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            lookup_class(registry, &data.class_name)?.class_id
        };
        let object_id = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = registry.class_by_id(class_id).unwrap();
            self.next_object_id(descriptor)
        };

        let mut wb = WriteBuffer::new();
        wb.start(128);
        {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = registry.class_by_id(class_id).unwrap();
            object::write_shallow(&mut wb, descriptor, data, registry, self)?;
        }
        let body = wb.into_bytes();

        self.bump_reference_counts(class_id, object_id, data)?;
        self.write_property_fields(class_id, object_id, data)?;

        let mut record = Vec::with_capacity(OBJECT_HEADER_SIZE + body.len());
        ObjectHeader::new(class_id, object_id, body.len() as u32, false).encode(&mut record);
        record.extend_from_slice(&body);
        Ok(record)
    }

    /// Applies every buffered mutation to the engine.
    pub fn commit(self) -> StoreResult<()> {
        debug!("commit write transaction");
        let Self {
            store,
            overlay,
            pending_max_object_id,
            collection_id_cursor,
            ..
        } = self;
        overlay.commit(store.engine.classdata())?;
        if !pending_max_object_id.is_empty() {
            let mut registry_guard = store.registry_mut()?;
            let registry = registry_guard.as_mut().unwrap();
            for (class_id, max_id) in pending_max_object_id {
                if let Some(descriptor) = registry.class_by_id(class_id) {
                    let name = descriptor.name.clone();
                    if let Some(d) = registry.class_mut(&name) {
                        d.max_object_id = max_id;
                    }
                }
            }
        }
        if let Some(max_id) = collection_id_cursor {
            *store.max_collection_id.lock().expect("max_collection_id lock poisoned") = max_id;
        }
        Ok(())
    }

    /// Discards every buffered mutation; the database is left exactly as
    /// it was before this transaction began.
    pub fn abort(self) {
        debug!("abort write transaction, discarding {} buffered keys", self.overlay.data.len());
    }
}

impl ChildResolver for WriteTxn<'_> {
    fn resolve(&mut self, wb: &mut WriteBuffer, child: &ObjectData) -> StoreResult<ObjectKey> {
        let class_id = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            lookup_class(registry, &child.class_name)?.class_id
        };
        let object_id = {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = registry.class_by_id(class_id).unwrap();
            self.next_object_id(descriptor)
        };

        wb.push();
        {
            let registry_guard = self.store.registry()?;
            let registry = registry_guard.as_ref().unwrap();
            let descriptor = registry.class_by_id(class_id).unwrap();
            object::write_shallow(wb, descriptor, child, registry, self)?;
        }
        let body = wb.pop();

        self.bump_reference_counts(class_id, object_id, child)?;
        self.write_property_fields(class_id, object_id, child)?;

        let mut record = Vec::with_capacity(OBJECT_HEADER_SIZE + body.len());
        ObjectHeader::new(class_id, object_id, body.len() as u32, false).encode(&mut record);
        record.extend_from_slice(&body);
        self.put_raw(StorageKey::object(class_id, object_id), record)?;
        Ok(ObjectKey::new(class_id, object_id))
    }
}

/* SHARED LOAD HELPERS */

fn lookup_class<'a>(registry: &'a SchemaRegistry, class_name: &str) -> StoreResult<&'a ClassDescriptor> {
    registry
        .class(class_name)
        .ok_or_else(|| StoreError::InvalidArgument(format!("unregistered class '{}'", class_name)))
}

fn load_object_shallow(
    data: &dyn ByteMap,
    registry: &SchemaRegistry,
    descriptor: &ClassDescriptor,
    object_id: ObjectId,
) -> StoreResult<Option<ObjectData>> {
    let key = StorageKey::object(descriptor.class_id, object_id);
    let record = match data.get(&key.to_bytes())? {
        Some(r) => r,
        None => return Ok(None),
    };
    let header = ObjectHeader::decode(&record)?;
    let body = &record[OBJECT_HEADER_SIZE..];
    if header.size as usize != body.len() {
        return Err(StoreError::Persistence(format!(
            "corrupt object {}:{}: header size {} does not match record length {}",
            descriptor.class_id,
            object_id,
            header.size,
            body.len()
        )));
    }
    if header.deleted {
        return Ok(None);
    }
    let mut reader = ReadBuffer::new(body);
    let result = object::read_shallow(&mut reader, descriptor, registry, Some(object_id))?;
    Ok(Some(result))
}

fn read_property_record(
    data: &dyn ByteMap,
    class_id: ClassId,
    object_id: ObjectId,
    property_id: PropertyId,
    prop: &crate::schema::PropertyDescriptor,
) -> StoreResult<FieldValue> {
    let key = StorageKey::new(class_id, object_id, property_id);
    let bytes = match data.get(&key.to_bytes())? {
        Some(b) => b,
        None => return Ok(default_property_field(prop)),
    };
    let mut reader = ReadBuffer::new(&bytes);
    let count = reader.read_uint(4)? as usize;
    if prop.class_name.is_some() {
        let mut refs = Vec::with_capacity(count);
        for _ in 0..count {
            let key_bytes = reader.read_bytes(crate::key::STORAGE_KEY_SIZE)?;
            let sk = StorageKey::from_bytes(key_bytes)?;
            refs.push(ReferenceValue::Existing(ObjectKey::new(sk.class_id, sk.object_id)));
        }
        Ok(FieldValue::ReferenceVector(refs))
    } else {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(object::read_value(&mut reader, prop.type_id, prop.byte_size)?);
        }
        Ok(FieldValue::ScalarVector(values))
    }
}

fn default_property_field(prop: &crate::schema::PropertyDescriptor) -> FieldValue {
    if prop.class_name.is_some() {
        FieldValue::ReferenceVector(Vec::new())
    } else {
        FieldValue::ScalarVector(Vec::new())
    }
}

fn encode_scalar_vector(values: &[Value], byte_size: usize) -> StoreResult<Vec<u8>> {
    let mut out = Vec::new();
    crate::codec::write_uint(&mut out, values.len() as u64, 4);
    for v in values {
        object::check_float_native_width(v, byte_size)?;
        out.extend_from_slice(&object::encode_value(v));
    }
    Ok(out)
}

/* CURSOR */

/// A polymorphic cursor walking every instance of one or more class ids
/// in `(classId, objectId)` order, skipping deleted records.
pub struct ObjectCursor<'a> {
    data: &'a dyn ByteMap,
    declared_class: String,
    entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl<'a> ObjectCursor<'a> {
    fn new(data: &'a dyn ByteMap, declared_class: String, class_ids: Vec<ClassId>) -> StoreResult<Self> {
        let mut all = Vec::new();
        for class_id in class_ids {
            let lower = StorageKey::class_lower(class_id);
            let upper = StorageKey::class_upper(class_id);
            all.extend(data.range(&lower, &upper)?);
        }
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self {
            data,
            declared_class,
            entries: all.into_iter(),
        })
    }

    /// Advances to the next live object, skipping deleted records and
    /// (if `registry` has no substitute for an unknown class) records
    /// whose class isn't registered at all. Returns the record's actual
    /// class name alongside its data, since a polymorphic cursor over a
    /// base class may yield subclass instances.
    pub fn next(&mut self, registry: &SchemaRegistry) -> StoreResult<Option<(String, ObjectKey, ObjectData)>> {
        for (key_bytes, record) in self.entries.by_ref() {
            let key = StorageKey::from_bytes(&key_bytes)?;
            if key.property_id != 0 {
                continue;
            }
            let header = ObjectHeader::decode(&record)?;
            if header.deleted {
                continue;
            }
            let body = &record[OBJECT_HEADER_SIZE..];
            let object_key = ObjectKey::new(key.class_id, key.object_id);
            match registry.class_by_id(key.class_id) {
                Some(descriptor) => {
                    let mut reader = ReadBuffer::new(body);
                    let data = object::read_shallow(&mut reader, descriptor, registry, Some(key.object_id))?;
                    return Ok(Some((descriptor.name.clone(), object_key, data)));
                }
                None => {
                    // Unknown concrete class: fall back to the declared
                    // type's substitute, reading only through its own
                    // (necessarily prefix-compatible) property list.
                    if let Some(declared) = registry.class(&self.declared_class) {
                        if let Some(sub_name) = &declared.substitute {
                            if let Some(sub_descriptor) = registry.class(sub_name) {
                                let mut reader = ReadBuffer::new(body);
                                let data =
                                    object::read_shallow(&mut reader, sub_descriptor, registry, Some(key.object_id))?;
                                return Ok(Some((sub_name.clone(), object_key, data)));
                            }
                        }
                    }
                    warn!(
                        "cursor skipped unresolvable class id {} (no substitute configured)",
                        key.class_id
                    );
                    continue;
                }
            }
        }
        Ok(None)
    }
}

/* COLLECTIONS */

fn read_collection_info(data: &dyn ByteMap, collection_id: ObjectId) -> StoreResult<Option<CollectionInfo>> {
    match data.get(&CollectionInfo::storage_key(collection_id).to_bytes())? {
        Some(bytes) => Ok(Some(CollectionInfo::decode(&bytes)?)),
        None => Ok(None),
    }
}

fn read_chunk(data: &dyn ByteMap, collection_id: ObjectId, chunk_id: u16) -> StoreResult<Vec<u8>> {
    let key = StorageKey::new(COLLECTION_CLSID, collection_id, chunk_id);
    data.get(&key.to_bytes())?
        .ok_or_else(|| StoreError::Persistence(format!("missing chunk {} of collection {}", chunk_id, collection_id)))
}

/// Decodes one chunk's payload into its elements, per `spec`. Object
/// elements are walked header-by-header like a mini top-level scan;
/// an on-disk class id the registry no longer knows falls back to the
/// declared element class's configured substitute, mirroring
/// [`ObjectCursor::next`].
fn decode_chunk_elements(payload: &[u8], spec: &ElementSpec, registry: &SchemaRegistry) -> StoreResult<Vec<ElementData>> {
    match spec {
        ElementSpec::Value { type_id, width } => {
            let parts = collection::element::split_fixed_width(payload, *width)?;
            let mut out = Vec::with_capacity(parts.len());
            for bytes in parts {
                let mut reader = ReadBuffer::new(bytes);
                out.push(ElementData::Value(object::read_value(&mut reader, *type_id, *width)?));
            }
            Ok(out)
        }
        ElementSpec::Raw { width } => Ok(collection::element::split_fixed_width(payload, *width)?
            .into_iter()
            .map(|b| ElementData::Raw(b.to_vec()))
            .collect()),
        ElementSpec::Object { class_name } => {
            let declared = lookup_class(registry, class_name)?;
            let mut out = Vec::new();
            let mut offset = 0usize;
            while offset < payload.len() {
                let header = ObjectHeader::decode(&payload[offset..])?;
                let record_len = OBJECT_HEADER_SIZE + header.size as usize;
                let record = payload
                    .get(offset..offset + record_len)
                    .ok_or_else(|| StoreError::Persistence("truncated object element in collection chunk".into()))?;
                let body = &record[OBJECT_HEADER_SIZE..];
                if !header.deleted {
                    let descriptor = match registry.class_by_id(header.class_id) {
                        Some(d) => d,
                        None => declared
                            .substitute
                            .as_deref()
                            .and_then(|s| registry.class(s))
                            .ok_or_else(|| {
                                StoreError::Persistence(format!(
                                    "unresolvable class id {} in collection element (no substitute configured)",
                                    header.class_id
                                ))
                            })?,
                    };
                    let mut reader = ReadBuffer::new(body);
                    let data = object::read_shallow(&mut reader, descriptor, registry, Some(header.object_id))?;
                    out.push(ElementData::Object(data));
                }
                offset += record_len;
            }
            Ok(out)
        }
    }
}

/// A cursor walking one collection's decoded elements in order.
pub struct CollectionCursor {
    elements: std::vec::IntoIter<ElementData>,
}

impl CollectionCursor {
    pub fn next(&mut self) -> Option<ElementData> {
        self.elements.next()
    }
}

/// One element of a `property`-layout vector, yielded by
/// [`ReadTxn::open_member_cursor`].
#[derive(Debug, Clone)]
pub enum MemberElement {
    Scalar(Value),
    Reference(ReferenceValue),
}

/// A cursor walking one object's lazy `property`-layout vector in order.
pub struct MemberCursor {
    elements: std::vec::IntoIter<MemberElement>,
}

impl MemberCursor {
    pub fn next(&mut self) -> Option<MemberElement> {
        self.elements.next()
    }
}

/// Buffers pushed elements and flushes them as collection chunks once
/// their encoded size crosses the store's configured chunk target,
/// amortizing the per-`append_collection` metadata rewrite across many
/// `push` calls instead of paying it per element.
pub struct Appender<'t, 's> {
    txn: &'t mut WriteTxn<'s>,
    spec: ElementSpec,
    collection_id: Option<ObjectId>,
    pending: Vec<ElementData>,
    pending_bytes: usize,
}

impl<'t, 's> Appender<'t, 's> {
    fn new(txn: &'t mut WriteTxn<'s>, spec: ElementSpec, collection_id: Option<ObjectId>) -> Self {
        Self {
            txn,
            spec,
            collection_id,
            pending: Vec::new(),
            pending_bytes: 0,
        }
    }

    /// Buffers one element, flushing if the buffered run has grown past
    /// the store's configured chunk size.
    pub fn push(&mut self, element: ElementData) -> StoreResult<()> {
        self.pending_bytes += estimate_encoded_size(&self.spec, &element);
        self.pending.push(element);
        if self.pending_bytes >= self.txn.store.config.default_chunk_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        self.pending_bytes = 0;
        match self.collection_id {
            Some(id) => self.txn.append_collection(id, self.spec.clone(), batch)?,
            None => {
                let id = self.txn.put_collection(self.spec.clone(), batch)?;
                self.collection_id = Some(id);
            }
        }
        Ok(())
    }

    /// Flushes any remainder and returns the collection id, creating an
    /// empty collection if `push` was never called.
    pub fn close(mut self) -> StoreResult<ObjectId> {
        self.flush()?;
        match self.collection_id {
            Some(id) => Ok(id),
            None => self.txn.put_collection(self.spec.clone(), Vec::new()),
        }
    }
}

fn estimate_encoded_size(spec: &ElementSpec, element: &ElementData) -> usize {
    match (spec, element) {
        (ElementSpec::Value { width, .. }, _) | (ElementSpec::Raw { width }, _) => *width,
        (ElementSpec::Object { .. }, ElementData::Object(data)) => {
            OBJECT_HEADER_SIZE + data.fields.len() * 8
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::config::StoreConfig;
    use crate::error::StoreError;
    use crate::schema::{type_id, PropertyDescriptor, StorageLayout};
    use crate::store::Store;
    use crate::value::{FieldValue, ObjectData, Value};
    use crate::ClassSpec;

    fn counter_class() -> ClassSpec {
        ClassSpec::new(
            "Counter",
            vec![PropertyDescriptor::new(
                "n",
                type_id::U32,
                4,
                false,
                None,
                StorageLayout::AllEmbedded,
            )],
        )
    }

    fn counter_data(n: u32) -> ObjectData {
        ObjectData::new("Counter", vec![FieldValue::Scalar(Value::U32(n))])
    }

    #[test]
    fn put_object_round_trips_through_overlay_and_commit() {
        let dir = tempdir().unwrap();
        let store = Store::open(StoreConfig::new(dir.path(), "txn")).unwrap();
        store.open_schema(vec![counter_class()], false).unwrap();

        let mut txn = store.begin_write(false, true).unwrap();
        let key = txn.put_object(&counter_data(7)).unwrap();
        // A write transaction must see its own uncommitted writes.
        let seen_before_commit = txn.load_object("Counter", key.object_id).unwrap().unwrap();
        assert_n_field(&seen_before_commit, 7);
        txn.commit().unwrap();

        let read = store.begin_read();
        let loaded = read.get_object("Counter", key.object_id).unwrap();
        assert_n_field(&loaded, 7);
    }

    fn assert_n_field(data: &ObjectData, expected: u32) {
        match &data.fields[0] {
            FieldValue::Scalar(Value::U32(n)) => assert_eq!(*n, expected),
            other => panic!("unexpected field shape: {:?}", other),
        }
    }

    #[test]
    fn append_mode_rejects_object_with_embedded_key_reference() {
        let dir = tempdir().unwrap();
        let store = Store::open(StoreConfig::new(dir.path(), "txn")).unwrap();
        let referencing = ClassSpec::new(
            "Holder",
            vec![PropertyDescriptor::new(
                "ref",
                type_id::OBJECT,
                0,
                false,
                Some("Counter".to_string()),
                StorageLayout::EmbeddedKey,
            )],
        );
        store.open_schema(vec![counter_class(), referencing], false).unwrap();

        let mut txn = store.begin_write(true, true).unwrap();
        let err = txn
            .put_object(&ObjectData::new("Holder", vec![FieldValue::Reference(None)]))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn append_mode_allows_simple_sequential_puts_but_rejects_explicit_key_save() {
        let dir = tempdir().unwrap();
        let store = Store::open(StoreConfig::new(dir.path(), "txn")).unwrap();
        store.open_schema(vec![counter_class()], false).unwrap();

        let mut txn = store.begin_write(true, true).unwrap();
        let first = txn.put_object(&counter_data(1)).unwrap();
        let second = txn.put_object(&counter_data(2)).unwrap();
        assert!(second.object_id > first.object_id);

        let err = txn.save_object(Some(first), &counter_data(99)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }
}
