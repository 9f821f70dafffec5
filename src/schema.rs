//! # Schema Registry Module
//!
//! Builds, on `Store::open_schema`, a closed registry of class descriptors
//! from the runtime class list the application supplies, reconciling it
//! against whatever class metadata is already persisted under the
//! `classmeta` sub-database. This replaces the source's template-driven
//! runtime type introspection with a table the rest of the store can walk.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Context};
use log::{debug, warn};

use crate::codec;
use crate::engine::ByteMap;
use crate::error::{PropertyDiff, StoreError, StoreResult};
use crate::key::{ClassId, MIN_USER_CLASS_ID};

/* TYPE IDS */

/// Numeric type tags for primitive property types; `0` denotes an
/// object-typed property (embedded or referenced).
pub mod type_id {
    pub const OBJECT: u16 = 0;
    pub const BOOL: u16 = 1;
    pub const I8: u16 = 2;
    pub const U8: u16 = 3;
    pub const I16: u16 = 4;
    pub const U16: u16 = 5;
    pub const I32: u16 = 6;
    pub const U32: u16 = 7;
    pub const I64: u16 = 8;
    pub const U64: u16 = 9;
    pub const F32: u16 = 10;
    pub const F64: u16 = 11;
    pub const STRING: u16 = 12;
    pub const RAW: u16 = 13;

    /// Any two of these are mutually compatible across schema versions; the
    /// integer encoder tolerates width differences up to 8 bytes.
    pub fn is_integer(id: u16) -> bool {
        matches!(id, BOOL | I8 | U8 | I16 | U16 | I32 | U32 | I64 | U64)
    }
}

/// Where a property's bytes physically live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLayout {
    AllEmbedded,
    EmbeddedKey,
    Property,
    ObjectId,
}

impl StorageLayout {
    fn code(self) -> u16 {
        match self {
            StorageLayout::AllEmbedded => 0,
            StorageLayout::EmbeddedKey => 1,
            StorageLayout::Property => 2,
            StorageLayout::ObjectId => 3,
        }
    }

    fn from_code(code: u16) -> StoreResult<Self> {
        Ok(match code {
            0 => StorageLayout::AllEmbedded,
            1 => StorageLayout::EmbeddedKey,
            2 => StorageLayout::Property,
            3 => StorageLayout::ObjectId,
            other => {
                return Err(StoreError::Persistence(format!(
                    "unknown storage layout code {}",
                    other
                )))
            }
        })
    }

    /// Whether this layout places bytes inside the enclosing shallow
    /// buffer; used by the reconciliation relaxation for subclassed
    /// layout changes.
    fn is_shallow(self) -> bool {
        matches!(self, StorageLayout::AllEmbedded | StorageLayout::EmbeddedKey)
    }
}

/// A single property of a class, as supplied by the application at
/// `open_schema` time (the runtime side of reconciliation).
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub type_id: u16,
    /// `0` means variable-size (e.g. a `String` or a variable-size
    /// embedded object).
    pub byte_size: usize,
    pub is_vector: bool,
    pub class_name: Option<String>,
    pub layout: StorageLayout,
    /// Always `true` for a freshly declared runtime property; flipped to
    /// `false` during reconciliation for runtime-only (appended)
    /// properties, which are readable but must not be written.
    pub enabled: bool,
}

impl PropertyDescriptor {
    pub fn new(
        name: impl Into<String>,
        type_id: u16,
        byte_size: usize,
        is_vector: bool,
        class_name: Option<String>,
        layout: StorageLayout,
    ) -> Self {
        Self {
            name: name.into(),
            type_id,
            byte_size,
            is_vector,
            class_name,
            layout,
            enabled: true,
        }
    }
}

/// The application-declared shape of one class, before `open_schema`
/// assigns it a runtime `ClassId` and reconciles it against persisted
/// metadata.
#[derive(Debug, Clone)]
pub struct ClassSpec {
    pub name: String,
    pub properties: Vec<PropertyDescriptor>,
    pub abstract_: bool,
    pub substitute: Option<String>,
    pub refcounted: bool,
    /// Direct superclass, if any; seeds the reconciled registry's `subs`
    /// sets (see [`SchemaRegistry::all_class_ids`]).
    pub superclass: Option<String>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            name: name.into(),
            properties,
            abstract_: false,
            substitute: None,
            refcounted: false,
            superclass: None,
        }
    }

    pub fn abstract_class(mut self) -> Self {
        self.abstract_ = true;
        self
    }

    pub fn with_substitute(mut self, class_name: impl Into<String>) -> Self {
        self.substitute = Some(class_name.into());
        self
    }

    pub fn refcounted(mut self) -> Self {
        self.refcounted = true;
        self
    }

    pub fn with_superclass(mut self, class_name: impl Into<String>) -> Self {
        self.superclass = Some(class_name.into());
        self
    }
}

/// Per-class reconciliation verdict, from most to least permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaCompatibility {
    /// Runtime and saved schemas agree; both loads and saves are safe.
    Full,
    /// The runtime schema appended properties absent from the saved one;
    /// loads are safe, saves would corrupt older records.
    Read,
    /// Unreconcilable; `open_schema` aborts unless best-effort is requested.
    None,
}

/// A fully reconciled class: its runtime id, its ordered property list
/// (each marked `enabled` or not), and its place in the inheritance graph.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub name: String,
    pub class_id: ClassId,
    pub properties: Vec<PropertyDescriptor>,
    pub abstract_: bool,
    pub substitute: Option<String>,
    pub subclasses: Vec<String>,
    pub refcounted: bool,
    pub compatibility: SchemaCompatibility,
    pub max_object_id: u32,
}

impl ClassDescriptor {
    /// Total size, in bytes, of the shallow buffer contributed by every
    /// fixed-width `enabled` property. Returns `None` if any enabled
    /// property has a variable size (the caller must compute per-instance).
    pub fn fixed_shallow_size(&self) -> Option<usize> {
        let mut total = 0usize;
        for p in &self.properties {
            if !p.enabled || p.layout == StorageLayout::ObjectId {
                continue;
            }
            match p.layout {
                StorageLayout::EmbeddedKey => total += crate::key::STORAGE_KEY_SIZE,
                StorageLayout::Property => {}
                StorageLayout::AllEmbedded => {
                    if p.byte_size == 0 {
                        return None;
                    }
                    total += p.byte_size;
                }
                StorageLayout::ObjectId => unreachable!(),
            }
        }
        Some(total)
    }
}

/// The reconciled class registry produced by [`SchemaRegistry::open`].
pub struct SchemaRegistry {
    by_name: HashMap<String, ClassDescriptor>,
    by_id: HashMap<ClassId, String>,
    max_class_id: ClassId,
}

impl SchemaRegistry {
    /// Reconciles `specs` against whatever is persisted in `classmeta`,
    /// assigning runtime class ids to new classes starting at
    /// [`MIN_USER_CLASS_ID`]. `classdata` is consulted to recompute each
    /// class's `max_object_id`. `best_effort` controls whether a `None`
    /// verdict for any one class aborts the whole call.
    pub fn open(
        classmeta: &dyn ByteMap,
        classdata: &dyn ByteMap,
        specs: Vec<ClassSpec>,
        best_effort: bool,
    ) -> StoreResult<Self> {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        let mut max_class_id: ClassId = MIN_USER_CLASS_ID - 1;

        // First pass: discover existing class ids so that newly declared
        // classes aren't assigned an id already used by another class
        // present only in `classmeta` (e.g. if the app dropped a class
        // from its runtime model entirely).
        for spec in &specs {
            if let Some(existing) = read_class_id(classmeta, &spec.name)? {
                max_class_id = max_class_id.max(existing);
            }
        }
        for name_entries in all_persisted_class_names(classmeta)? {
            if let Some(id) = read_class_id(classmeta, &name_entries)? {
                max_class_id = max_class_id.max(id);
            }
        }

        let mut subclass_map: HashMap<String, Vec<String>> = HashMap::new();
        for spec in &specs {
            if let Some(sup) = declared_superclass(&spec.name, &specs) {
                subclass_map.entry(sup).or_default().push(spec.name.clone());
            }
        }

        for spec in specs {
            let (class_id, persisted_props) = match read_class_id(classmeta, &spec.name)? {
                Some(id) => (id, read_persisted_properties(classmeta, &spec.name)?),
                None => {
                    max_class_id += 1;
                    (max_class_id, Vec::new())
                }
            };

            let has_subclasses = subclass_map.get(&spec.name).map(|v| !v.is_empty()).unwrap_or(false);
            let (properties, compatibility, diffs) =
                reconcile(&spec.name, &spec.properties, &persisted_props, has_subclasses);

            if compatibility == SchemaCompatibility::None {
                warn!(
                    "class '{}' is incompatible with its persisted schema ({} diffs)",
                    spec.name,
                    diffs.len()
                );
                if !best_effort {
                    return Err(StoreError::IncompatibleSchema {
                        class_name: spec.name.clone(),
                        diffs,
                    });
                }
            } else {
                debug!(
                    "class '{}' reconciled as {:?} (class_id={})",
                    spec.name, compatibility, class_id
                );
            }

            let max_object_id = scan_max_object_id(classdata, class_id)?;

            let descriptor = ClassDescriptor {
                name: spec.name.clone(),
                class_id,
                properties,
                abstract_: spec.abstract_,
                substitute: spec.substitute,
                subclasses: subclass_map.remove(&spec.name).unwrap_or_default(),
                refcounted: spec.refcounted,
                compatibility,
                max_object_id,
            };

            by_id.insert(class_id, spec.name.clone());
            by_name.insert(spec.name, descriptor);
        }

        Ok(Self {
            by_name,
            by_id,
            max_class_id,
        })
    }

    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.by_name.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassDescriptor> {
        self.by_name.get_mut(name)
    }

    pub fn class_by_id(&self, class_id: ClassId) -> Option<&ClassDescriptor> {
        self.by_id.get(&class_id).and_then(|name| self.by_name.get(name))
    }

    pub fn max_class_id(&self) -> ClassId {
        self.max_class_id
    }

    /// Persists (or re-persists) every registered class's property list
    /// into `classmeta`. Called once after a successful `open` so a
    /// newly-declared class's metadata survives the next open.
    pub fn persist(&self, classmeta: &dyn ByteMap) -> StoreResult<()> {
        for descriptor in self.by_name.values() {
            write_class_meta(classmeta, descriptor)?;
        }
        Ok(())
    }

    /// The transitive closure of `class_name` and every (recursively)
    /// declared subclass, as class ids. Seeds a polymorphic cursor.
    pub fn all_class_ids(&self, class_name: &str) -> StoreResult<Vec<ClassId>> {
        let mut out = Vec::new();
        let mut stack = vec![class_name.to_string()];
        let mut seen = HashSet::new();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let descriptor = self
                .by_name
                .get(&name)
                .ok_or_else(|| StoreError::InvalidArgument(format!("unknown class '{}'", name)))?;
            out.push(descriptor.class_id);
            stack.extend(descriptor.subclasses.iter().cloned());
        }
        Ok(out)
    }
}

fn declared_superclass(name: &str, specs: &[ClassSpec]) -> Option<String> {
    specs.iter().find(|s| s.name == name).and_then(|s| s.superclass.clone())
}

/// Reconciles a runtime property list against a persisted one per the
/// rules in SPEC_FULL.md section 4.3.
fn reconcile(
    class_name: &str,
    runtime: &[PropertyDescriptor],
    persisted: &[PersistedProperty],
    has_subclasses: bool,
) -> (Vec<PropertyDescriptor>, SchemaCompatibility, Vec<PropertyDiff>) {
    if persisted.is_empty() {
        // Brand new class: nothing to reconcile against.
        return (runtime.to_vec(), SchemaCompatibility::Full, Vec::new());
    }

    let mut diffs = Vec::new();
    let mut out = Vec::with_capacity(runtime.len());
    let mut compatibility = SchemaCompatibility::Full;

    let shared = runtime.len().min(persisted.len());
    for i in 0..shared {
        let rt = &runtime[i];
        let sv = &persisted[i];

        let mut position_ok = true;

        let type_ok = rt.type_id == sv.type_id
            || (type_id::is_integer(rt.type_id) && type_id::is_integer(sv.type_id));
        if !type_ok {
            diffs.push(PropertyDiff {
                class_name: class_name.to_string(),
                position: i,
                field: "type_id".into(),
                description: "incompatible primitive type".into(),
                runtime: rt.type_id.to_string(),
                saved: sv.type_id.to_string(),
            });
            position_ok = false;
        }

        if rt.byte_size != sv.byte_size {
            diffs.push(PropertyDiff {
                class_name: class_name.to_string(),
                position: i,
                field: "byte_size".into(),
                description: "byte size changed".into(),
                runtime: rt.byte_size.to_string(),
                saved: sv.byte_size.to_string(),
            });
            position_ok = false;
        }

        if rt.class_name != sv.class_name {
            diffs.push(PropertyDiff {
                class_name: class_name.to_string(),
                position: i,
                field: "class_name".into(),
                description: "referenced class name changed".into(),
                runtime: rt.class_name.clone().unwrap_or_default(),
                saved: sv.class_name.clone().unwrap_or_default(),
            });
            position_ok = false;
        }

        if rt.is_vector != sv.is_vector {
            diffs.push(PropertyDiff {
                class_name: class_name.to_string(),
                position: i,
                field: "is_vector".into(),
                description: "vector-ness changed".into(),
                runtime: rt.is_vector.to_string(),
                saved: sv.is_vector.to_string(),
            });
            position_ok = false;
        }

        if rt.layout != sv.layout {
            let hard = has_subclasses && (rt.layout.is_shallow() != sv.layout.is_shallow());
            if hard {
                diffs.push(PropertyDiff {
                    class_name: class_name.to_string(),
                    position: i,
                    field: "layout".into(),
                    description: "storage layout change shifts subclass shallow buffers".into(),
                    runtime: format!("{:?}", rt.layout),
                    saved: format!("{:?}", sv.layout),
                });
                position_ok = false;
            }
        }

        if !position_ok {
            compatibility = SchemaCompatibility::None;
        }
        out.push(rt.clone());
    }

    // Persisted-only properties beyond the runtime list: "removed".
    if persisted.len() > runtime.len() {
        if has_subclasses {
            for sv in &persisted[runtime.len()..] {
                diffs.push(PropertyDiff {
                    class_name: class_name.to_string(),
                    position: sv.property_id as usize,
                    field: sv.name.clone(),
                    description: "property removed from a class with subclasses".into(),
                    runtime: "<absent>".into(),
                    saved: sv.name.clone(),
                });
            }
            compatibility = SchemaCompatibility::None;
        }
        // Otherwise tolerated silently: the property simply no longer
        // exists on read or write.
    }

    // Runtime-only properties beyond the persisted list: "appended".
    if runtime.len() > persisted.len() {
        for extra in &runtime[persisted.len()..] {
            let mut p = extra.clone();
            p.enabled = false;
            out.push(p);
        }
        if compatibility == SchemaCompatibility::Full {
            compatibility = SchemaCompatibility::Read;
        }
    }

    (out, compatibility, diffs)
}

/* PERSISTED METADATA CODEC */

struct PersistedProperty {
    property_id: u16,
    name: String,
    type_id: u16,
    is_vector: bool,
    byte_size: usize,
    layout: StorageLayout,
    class_name: Option<String>,
}

fn meta_key(class_name: &str, property_id: u16) -> Vec<u8> {
    let mut key = Vec::with_capacity(class_name.len() + 3);
    key.extend_from_slice(class_name.as_bytes());
    key.push(0);
    key.extend_from_slice(&property_id.to_be_bytes());
    key
}

fn meta_prefix(class_name: &str) -> (Vec<u8>, Vec<u8>) {
    let mut lower = class_name.as_bytes().to_vec();
    lower.push(0);
    let mut upper = class_name.as_bytes().to_vec();
    upper.push(1);
    (lower, upper)
}

fn read_class_id(classmeta: &dyn ByteMap, class_name: &str) -> StoreResult<Option<ClassId>> {
    let key = meta_key(class_name, 0);
    match classmeta.get(&key)? {
        Some(value) => {
            if value.len() != 2 {
                return Err(StoreError::Persistence(format!(
                    "corrupt class-id record for '{}'",
                    class_name
                )));
            }
            Ok(Some(u16::from_ne_bytes([value[0], value[1]])))
        }
        None => Ok(None),
    }
}

fn all_persisted_class_names(classmeta: &dyn ByteMap) -> StoreResult<Vec<String>> {
    // Scans the entire classmeta tree and extracts distinct class-name
    // prefixes. Only used to seed `max_class_id` discovery; small enough
    // in practice (one entry per class plus one per property).
    let entries = classmeta.range(&[], &[0xFF; 1])?;
    let mut names = HashSet::new();
    for (key, _) in entries {
        if let Some(nul) = key.iter().position(|&b| b == 0) {
            if let Ok(name) = std::str::from_utf8(&key[..nul]) {
                names.insert(name.to_string());
            }
        }
    }
    Ok(names.into_iter().collect())
}

fn read_persisted_properties(
    classmeta: &dyn ByteMap,
    class_name: &str,
) -> StoreResult<Vec<PersistedProperty>> {
    let (lower, upper) = meta_prefix(class_name);
    let entries = classmeta.range(&lower, &upper)?;
    let mut out = Vec::new();
    for (key, value) in entries {
        // The key's trailing 2 bytes are the big-endian propertyId `meta_key`
        // appended (so lexicographic key order matches propertyId order);
        // the header record (propertyId=0) carries only a classId in its
        // value, not a propertyId, so it must be identified from the key.
        let key_property_id = key
            .get(key.len().saturating_sub(2)..)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .unwrap_or(0);
        if key_property_id == 0 {
            continue; // the [propertyId=0, classId] header record
        }
        if value.len() < 2 {
            return Err(StoreError::Persistence(format!(
                "truncated property record for class '{}'",
                class_name
            )));
        }
        // The value's own leading propertyId field is written native-endian
        // (see `write_class_meta`), unlike the key's big-endian suffix.
        let property_id = u16::from_ne_bytes([value[0], value[1]]);
        let property = decode_persisted_property(&value, property_id)
            .with_context(|| format!("class '{}' property {}", class_name, property_id))
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        out.push(property);
    }
    out.sort_by_key(|p| p.property_id);
    Ok(out)
}

/// Decodes one property record's fields past its leading `propertyId`,
/// composing several narrow fallible steps (a cstring read, three
/// fixed-width fields, an optional trailing cstring) before the caller
/// above narrows the result back down to [`StoreError`].
fn decode_persisted_property(value: &[u8], property_id: u16) -> anyhow::Result<PersistedProperty> {
    let mut cursor = 2usize;
    let (name, consumed) = codec::read_cstring(&value[cursor..]).context("property name")?;
    let name = name.to_string();
    cursor += consumed;

    let field = |range: std::ops::Range<usize>| -> anyhow::Result<&[u8]> {
        value
            .get(range.clone())
            .ok_or_else(|| anyhow!("truncated property record: need bytes {:?}, have {}", range, value.len()))
    };

    let type_id = u16::from_ne_bytes(field(cursor..cursor + 2)?.try_into()?);
    cursor += 2;
    let is_vector = field(cursor..cursor + 1)?[0] != 0;
    cursor += 1;
    let byte_size = u16::from_ne_bytes(field(cursor..cursor + 2)?.try_into()?) as usize;
    cursor += 2;
    let layout_code = u16::from_ne_bytes(field(cursor..cursor + 2)?.try_into()?);
    cursor += 2;
    let layout = StorageLayout::from_code(layout_code).context("storage layout code")?;
    let class_name = if cursor < value.len() {
        let (s, _) = codec::read_cstring(&value[cursor..]).context("referenced class name")?;
        Some(s.to_string())
    } else {
        None
    };

    Ok(PersistedProperty {
        property_id,
        name,
        type_id,
        is_vector,
        byte_size,
        layout,
        class_name,
    })
}

fn write_class_meta(classmeta: &dyn ByteMap, descriptor: &ClassDescriptor) -> StoreResult<()> {
    let header_key = meta_key(&descriptor.name, 0);
    classmeta.insert(&header_key, &descriptor.class_id.to_ne_bytes())?;

    for (idx, prop) in descriptor.properties.iter().enumerate() {
        let property_id = (idx + 1) as u16;
        let mut value = Vec::new();
        value.extend_from_slice(&property_id.to_ne_bytes());
        codec::write_cstring(&mut value, &prop.name);
        value.extend_from_slice(&prop.type_id.to_ne_bytes());
        value.push(prop.is_vector as u8);
        value.extend_from_slice(&(prop.byte_size as u16).to_ne_bytes());
        value.extend_from_slice(&prop.layout.code().to_ne_bytes());
        if let Some(class_name) = &prop.class_name {
            codec::write_cstring(&mut value, class_name);
        }
        let key = meta_key(&descriptor.name, property_id);
        classmeta.insert(&key, &value)?;
    }
    Ok(())
}

fn scan_max_object_id(classdata: &dyn ByteMap, class_id: ClassId) -> StoreResult<u32> {
    let lower = crate::key::StorageKey::class_lower(class_id);
    let upper = crate::key::StorageKey::class_upper(class_id);
    match classdata.last_in_range(&lower, &upper)? {
        Some((key, _)) => {
            let key = crate::key::StorageKey::from_bytes(&key)?;
            Ok(key.object_id)
        }
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SledEngine;
    use tempfile::tempdir;

    fn point_spec() -> ClassSpec {
        ClassSpec::new(
            "Point",
            vec![
                PropertyDescriptor::new("x", type_id::F32, 4, false, None, StorageLayout::AllEmbedded),
                PropertyDescriptor::new("y", type_id::F32, 4, false, None, StorageLayout::AllEmbedded),
            ],
        )
    }

    #[test]
    fn new_class_gets_full_compatibility_and_an_id() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        let registry = SchemaRegistry::open(
            engine.classmeta(),
            engine.classdata(),
            vec![point_spec()],
            false,
        )
        .unwrap();
        let class = registry.class("Point").unwrap();
        assert_eq!(class.compatibility, SchemaCompatibility::Full);
        assert_eq!(class.class_id, MIN_USER_CLASS_ID);
    }

    #[test]
    fn appended_property_yields_read_only_compatibility() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        {
            let registry = SchemaRegistry::open(
                engine.classmeta(),
                engine.classdata(),
                vec![point_spec()],
                false,
            )
            .unwrap();
            registry.persist(engine.classmeta()).unwrap();
        }

        let mut evolved = point_spec();
        evolved.properties.push(PropertyDescriptor::new(
            "z",
            type_id::F32,
            4,
            false,
            None,
            StorageLayout::AllEmbedded,
        ));
        let registry = SchemaRegistry::open(
            engine.classmeta(),
            engine.classdata(),
            vec![evolved],
            false,
        )
        .unwrap();
        let class = registry.class("Point").unwrap();
        assert_eq!(class.compatibility, SchemaCompatibility::Read);
        assert!(!class.properties[2].enabled);
        assert!(class.properties[0].enabled);
    }

    #[test]
    fn reopening_reassigns_the_same_class_id() {
        let dir = tempdir().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        let first_id = {
            let registry = SchemaRegistry::open(
                engine.classmeta(),
                engine.classdata(),
                vec![point_spec()],
                false,
            )
            .unwrap();
            registry.persist(engine.classmeta()).unwrap();
            registry.class("Point").unwrap().class_id
        };
        let registry = SchemaRegistry::open(
            engine.classmeta(),
            engine.classdata(),
            vec![point_spec()],
            false,
        )
        .unwrap();
        assert_eq!(registry.class("Point").unwrap().class_id, first_id);
    }
}
