//! # Object Buffer Module
//!
//! Pure (no I/O) codec for the object header and the *shallow buffer*: the
//! concatenation of a class's `all_embedded`- and `embedded_key`-layout
//! properties, in declared order. `property`-layout fields contribute
//! nothing here (they live at their own top-level key, written by
//! [`crate::txn`]); `objectid`-layout fields are populated from the
//! object's own key rather than read from bytes.
//!
//! Recursion for embedded child objects (`all_embedded` object-typed
//! properties and embedded vectors) is handled entirely in this module,
//! since it needs no engine access. `embedded_key` properties are the
//! boundary: a `Reference` field holding a not-yet-persisted
//! [`ReferenceValue::ToSave`] child is handed to a [`ChildResolver`],
//! which [`crate::txn::WriteTxn`] implements — resolving it means
//! assigning an id, writing the child's own top-level record through the
//! engine, and handing back the key to embed here. Per the buffer layer's
//! push/pop contract, the child's own shallow buffer is built on a pushed
//! frame so the outer buffer's cursor stays put while it is written.

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::key::{ClassId, ObjectId, ObjectKey, StorageKey, STORAGE_KEY_SIZE};
use crate::schema::{ClassDescriptor, PropertyDescriptor, SchemaRegistry, StorageLayout};
use crate::value::{FieldValue, ObjectData, ReferenceValue, Value};

/// `classId(2) ‖ objectId(4) ‖ size(4) ‖ deleted(1)`.
pub const OBJECT_HEADER_SIZE: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub class_id: ClassId,
    pub object_id: ObjectId,
    pub size: u32,
    pub deleted: bool,
}

impl ObjectHeader {
    pub fn new(class_id: ClassId, object_id: ObjectId, size: u32, deleted: bool) -> Self {
        Self {
            class_id,
            object_id,
            size,
            deleted,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.class_id.to_be_bytes());
        out.extend_from_slice(&self.object_id.to_be_bytes());
        out.extend_from_slice(&self.size.to_be_bytes());
        out.push(self.deleted as u8);
    }

    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        if data.len() < OBJECT_HEADER_SIZE {
            return Err(StoreError::Persistence(format!(
                "truncated object header: need {} bytes, have {}",
                OBJECT_HEADER_SIZE,
                data.len()
            )));
        }
        Ok(Self {
            class_id: u16::from_be_bytes([data[0], data[1]]),
            object_id: u32::from_be_bytes([data[2], data[3], data[4], data[5]]),
            size: u32::from_be_bytes([data[6], data[7], data[8], data[9]]),
            deleted: data[10] != 0,
        })
    }
}

/// The byte length of the shallow buffer `data` would occupy, walking
/// `descriptor`'s enabled properties in order. Recurses into embedded
/// children via `registry`.
pub fn shallow_size(
    descriptor: &ClassDescriptor,
    data: &ObjectData,
    registry: &SchemaRegistry,
) -> StoreResult<usize> {
    check_field_count(descriptor, data)?;
    let mut total = 0usize;
    for (prop, field) in descriptor.properties.iter().zip(data.fields.iter()) {
        if !prop.enabled {
            continue;
        }
        total += field_size(prop, field, registry)?;
    }
    Ok(total)
}

fn field_size(
    prop: &PropertyDescriptor,
    field: &FieldValue,
    registry: &SchemaRegistry,
) -> StoreResult<usize> {
    match prop.layout {
        StorageLayout::Property | StorageLayout::ObjectId => Ok(0),
        StorageLayout::EmbeddedKey => Ok(STORAGE_KEY_SIZE),
        StorageLayout::AllEmbedded => match field {
            FieldValue::Scalar(v) => Ok(v.encoded_len()),
            FieldValue::Embedded(child) => {
                let child_descriptor = lookup(registry, &child.class_name)?;
                shallow_size(child_descriptor, child, registry)
            }
            FieldValue::EmbeddedVector(items) => {
                let mut total = 4usize; // u32 count prefix
                for item in items {
                    let child_descriptor = lookup(registry, &item.class_name)?;
                    total += shallow_size(child_descriptor, item, registry)?;
                }
                Ok(total)
            }
            other => Err(StoreError::InvalidArgument(format!(
                "property '{}' is all_embedded but field value is {:?}",
                prop.name,
                std::mem::discriminant(other)
            ))),
        },
    }
}

/// Resolves a not-yet-persisted `embedded_key` child into its storage key,
/// writing the child's own top-level record as a side effect.
/// [`crate::txn::WriteTxn`] is the only implementor: it owns the engine
/// handle and the per-class object-id counters this requires.
pub trait ChildResolver {
    fn resolve(&mut self, wb: &mut WriteBuffer, child: &ObjectData) -> StoreResult<ObjectKey>;
}

/// Writes `data`'s shallow buffer (everything but the object header) onto
/// `wb`'s active frame, per `descriptor`'s property list. Any
/// [`ReferenceValue::ToSave`] child is handed to `resolver`, which pushes
/// its own frame, recurses to fill it, pops it, persists it, and returns
/// the key this function embeds.
pub fn write_shallow(
    wb: &mut WriteBuffer,
    descriptor: &ClassDescriptor,
    data: &ObjectData,
    registry: &SchemaRegistry,
    resolver: &mut dyn ChildResolver,
) -> StoreResult<()> {
    check_field_count(descriptor, data)?;
    for (prop, field) in descriptor.properties.iter().zip(data.fields.iter()) {
        if !prop.enabled {
            continue;
        }
        write_field(wb, prop, field, registry, resolver)?;
    }
    Ok(())
}

fn write_field(
    wb: &mut WriteBuffer,
    prop: &PropertyDescriptor,
    field: &FieldValue,
    registry: &SchemaRegistry,
    resolver: &mut dyn ChildResolver,
) -> StoreResult<()> {
    match prop.layout {
        StorageLayout::Property | StorageLayout::ObjectId => Ok(()),
        StorageLayout::EmbeddedKey => match field {
            FieldValue::Reference(Some(ReferenceValue::Existing(key))) => {
                wb.append(&key.storage_key().to_bytes());
                Ok(())
            }
            FieldValue::Reference(Some(ReferenceValue::ToSave(child))) => {
                let key = resolver.resolve(wb, child)?;
                wb.append(&key.storage_key().to_bytes());
                Ok(())
            }
            FieldValue::Reference(None) => {
                wb.append(&StorageKey::new(0, 0, 0).to_bytes());
                Ok(())
            }
            other => Err(StoreError::InvalidArgument(format!(
                "property '{}' is embedded_key but field value is {:?}",
                prop.name,
                std::mem::discriminant(other)
            ))),
        },
        StorageLayout::AllEmbedded => match field {
            FieldValue::Scalar(v) => {
                check_float_native_width(v, prop.byte_size)?;
                write_value(wb, v);
                Ok(())
            }
            FieldValue::Embedded(child) => {
                let child_descriptor = lookup(registry, &child.class_name)?;
                write_shallow(wb, child_descriptor, child, registry, resolver)
            }
            FieldValue::EmbeddedVector(items) => {
                wb.append_integer(items.len() as u64, 4);
                for item in items {
                    let child_descriptor = lookup(registry, &item.class_name)?;
                    write_shallow(wb, child_descriptor, item, registry, resolver)?;
                }
                Ok(())
            }
            other => Err(StoreError::InvalidArgument(format!(
                "property '{}' is all_embedded but field value is {:?}",
                prop.name,
                std::mem::discriminant(other)
            ))),
        },
    }
}

fn write_value(wb: &mut WriteBuffer, value: &Value) {
    wb.append(&encode_value(value));
}

/// Raw-data and float values are written in the host's native byte order
/// (see [`crate::codec`]), so their encoded width must match the declared
/// `byteSize` exactly or the record would be unreadable on a platform
/// where the native width differs (SPEC_FULL.md section 4.1). Integers
/// are exempt: the big-endian encoder already tolerates width differences.
pub(crate) fn check_float_native_width(value: &Value, declared_byte_size: usize) -> StoreResult<()> {
    match value {
        Value::F32(_) => codec::check_native_width("f32", std::mem::size_of::<f32>(), declared_byte_size),
        Value::F64(_) => codec::check_native_width("f64", std::mem::size_of::<f64>(), declared_byte_size),
        _ => Ok(()),
    }
}

/// Encodes a single scalar value to its on-disk bytes. Shared by the
/// shallow-buffer writer above and by [`crate::txn`]'s separately-stored
/// (`property`-layout) scalar-vector encoding.
pub(crate) fn encode_value(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        Value::Bool(b) => out.push(*b as u8),
        Value::I8(v) => codec::write_int(&mut out, *v as i64, 1),
        Value::U8(v) => codec::write_uint(&mut out, *v as u64, 1),
        Value::I16(v) => codec::write_int(&mut out, *v as i64, 2),
        Value::U16(v) => codec::write_uint(&mut out, *v as u64, 2),
        Value::I32(v) => codec::write_int(&mut out, *v as i64, 4),
        Value::U32(v) => codec::write_uint(&mut out, *v as u64, 4),
        Value::I64(v) => codec::write_int(&mut out, *v, 8),
        Value::U64(v) => codec::write_uint(&mut out, *v, 8),
        Value::F32(v) => codec::write_f32_native(&mut out, *v),
        Value::F64(v) => codec::write_f64_native(&mut out, *v),
        Value::Str(s) => codec::write_cstring(&mut out, s),
    }
    out
}

/// Reads a shallow buffer matching `descriptor` out of `buf`. `object_id`
/// is `Some` only for a top-level object (populates any `objectid`-layout
/// field); embedded children are identity-less and always pass `None`.
pub fn read_shallow(
    buf: &mut ReadBuffer<'_>,
    descriptor: &ClassDescriptor,
    registry: &SchemaRegistry,
    object_id: Option<ObjectId>,
) -> StoreResult<ObjectData> {
    let mut fields = Vec::with_capacity(descriptor.properties.len());
    for prop in &descriptor.properties {
        if !prop.enabled {
            fields.push(default_field(prop));
            continue;
        }
        fields.push(read_field(buf, prop, registry, object_id)?);
    }
    Ok(ObjectData::new(descriptor.name.clone(), fields))
}

fn read_field(
    buf: &mut ReadBuffer<'_>,
    prop: &PropertyDescriptor,
    registry: &SchemaRegistry,
    object_id: Option<ObjectId>,
) -> StoreResult<FieldValue> {
    match prop.layout {
        StorageLayout::Property => Ok(default_field(prop)),
        StorageLayout::ObjectId => Ok(FieldValue::ObjectId(object_id)),
        StorageLayout::EmbeddedKey => {
            let bytes = buf.read_bytes(STORAGE_KEY_SIZE)?;
            let key = StorageKey::from_bytes(bytes)?;
            if key.class_id == 0 && key.object_id == 0 {
                Ok(FieldValue::Reference(None))
            } else {
                Ok(FieldValue::Reference(Some(ReferenceValue::Existing(
                    ObjectKey::new(key.class_id, key.object_id),
                ))))
            }
        }
        StorageLayout::AllEmbedded => {
            if let Some(class_name) = &prop.class_name {
                if prop.is_vector {
                    let count = buf.read_uint(4)? as usize;
                    let child_descriptor = lookup(registry, class_name)?;
                    let mut items = Vec::with_capacity(count);
                    for _ in 0..count {
                        items.push(read_shallow(buf, child_descriptor, registry, None)?);
                    }
                    Ok(FieldValue::EmbeddedVector(items))
                } else {
                    let child_descriptor = lookup(registry, class_name)?;
                    let child = read_shallow(buf, child_descriptor, registry, None)?;
                    Ok(FieldValue::Embedded(Box::new(child)))
                }
            } else {
                Ok(FieldValue::Scalar(read_value(buf, prop.type_id, prop.byte_size)?))
            }
        }
    }
}

pub(crate) fn read_value(buf: &mut ReadBuffer<'_>, type_id: u16, byte_size: usize) -> StoreResult<Value> {
    use crate::schema::type_id as tid;
    Ok(match type_id {
        t if t == tid::BOOL => Value::Bool(buf.read_uint(1)? != 0),
        t if t == tid::I8 => Value::I8(buf.read_int(1)? as i8),
        t if t == tid::U8 => Value::U8(buf.read_uint(1)? as u8),
        t if t == tid::I16 => Value::I16(buf.read_int(2)? as i16),
        t if t == tid::U16 => Value::U16(buf.read_uint(2)? as u16),
        t if t == tid::I32 => Value::I32(buf.read_int(4)? as i32),
        t if t == tid::U32 => Value::U32(buf.read_uint(4)? as u32),
        t if t == tid::I64 => Value::I64(buf.read_int(8)?),
        t if t == tid::U64 => Value::U64(buf.read_uint(8)?),
        t if t == tid::F32 => {
            codec::check_native_width("f32", std::mem::size_of::<f32>(), byte_size)?;
            Value::F32(buf.read_f32_native()?)
        }
        t if t == tid::F64 => {
            codec::check_native_width("f64", std::mem::size_of::<f64>(), byte_size)?;
            Value::F64(buf.read_f64_native()?)
        }
        t if t == tid::STRING => Value::Str(buf.read_cstring()?.to_string()),
        other => {
            return Err(StoreError::Persistence(format!(
                "cannot decode scalar of unknown type_id {} (declared byte_size {})",
                other, byte_size
            )))
        }
    })
}

/// The default value substituted for a property marked `enabled = false`
/// (present only in the runtime schema, never written to older records).
fn default_field(prop: &PropertyDescriptor) -> FieldValue {
    match prop.layout {
        StorageLayout::Property => {
            if prop.class_name.is_some() {
                FieldValue::ReferenceVector(Vec::new())
            } else {
                FieldValue::ScalarVector(Vec::new())
            }
        }
        StorageLayout::ObjectId => FieldValue::ObjectId(None),
        StorageLayout::EmbeddedKey => FieldValue::Reference(None),
        StorageLayout::AllEmbedded => {
            if prop.class_name.is_some() {
                if prop.is_vector {
                    FieldValue::EmbeddedVector(Vec::new())
                } else {
                    FieldValue::Embedded(Box::new(ObjectData::new(
                        prop.class_name.clone().unwrap_or_default(),
                        Vec::new(),
                    )))
                }
            } else if prop.is_vector {
                FieldValue::ScalarVector(Vec::new())
            } else {
                FieldValue::Scalar(default_scalar(prop.type_id))
            }
        }
    }
}

fn default_scalar(type_id: u16) -> Value {
    use crate::schema::type_id as tid;
    match type_id {
        t if t == tid::BOOL => Value::Bool(false),
        t if t == tid::I8 => Value::I8(0),
        t if t == tid::U8 => Value::U8(0),
        t if t == tid::I16 => Value::I16(0),
        t if t == tid::U16 => Value::U16(0),
        t if t == tid::I32 => Value::I32(0),
        t if t == tid::U32 => Value::U32(0),
        t if t == tid::I64 => Value::I64(0),
        t if t == tid::U64 => Value::U64(0),
        t if t == tid::F32 => Value::F32(0.0),
        t if t == tid::F64 => Value::F64(0.0),
        _ => Value::Str(String::new()),
    }
}

/// `data.fields` holds one value per *declared* property (enabled or not,
/// in the same order as `descriptor.properties`) so that an object loaded
/// via [`read_shallow`] can be handed straight back to [`write_shallow`]
/// or [`shallow_size`] without the caller re-shaping it.
fn check_field_count(descriptor: &ClassDescriptor, data: &ObjectData) -> StoreResult<()> {
    if data.fields.len() != descriptor.properties.len() {
        return Err(StoreError::InvalidArgument(format!(
            "class '{}' expects {} field values, got {}",
            descriptor.name,
            descriptor.properties.len(),
            data.fields.len()
        )));
    }
    Ok(())
}

fn lookup<'a>(registry: &'a SchemaRegistry, class_name: &str) -> StoreResult<&'a ClassDescriptor> {
    registry
        .class(class_name)
        .ok_or_else(|| StoreError::InvalidArgument(format!("unregistered embedded class '{}'", class_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = ObjectHeader::new(42, 7, 100, false);
        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), OBJECT_HEADER_SIZE);
        assert_eq!(ObjectHeader::decode(&buf).unwrap(), header);
    }

    #[test]
    fn deleted_flag_round_trips() {
        let header = ObjectHeader::new(1, 1, 0, true);
        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert!(ObjectHeader::decode(&buf).unwrap().deleted);
    }
}
