//! Reference marshaller
//!
//! Executes the from-native and into-native conversions described by a
//! `Shape` against an `AniEnv`, issuing the same ANI calls, in the same
//! order, as the glue the generator emits for that shape.

use std::rc::Rc;

use crate::abi::ScalarKind;
use crate::convert::{scalar_from_ani, scalar_into_ani, scalars_from_bytes, scalars_to_bytes};
use crate::env::{AniEnv, GlobalRef, BIGINT_TO_BUFFER, BUFFER_TO_BIGINT};
use crate::error::{AniError, AniResult};
use crate::shape::{Layouts, Shape, VariantKind};
use crate::value::{AniValue, NativeValue};

const RECORD_DESC: &str = "Lescompat/Record;";

/// Native side of an interface value
#[derive(Debug, Clone, PartialEq)]
pub enum IfaceHandle {
    /// Managed object wrapped by the native adapter
    Managed(Rc<GlobalRef>),
    /// Native implementation: vtable and data pointers
    Native { vtbl: u64, data: u64 },
}

/// Native callable wrapping a managed function object.
///
/// Holds a global reference for its whole lifetime; dropping the last
/// handle releases it.
#[derive(Debug)]
pub struct CallbackAdapter {
    global: GlobalRef,
    params: Vec<Shape>,
    ret: Option<Shape>,
}

impl CallbackAdapter {
    pub fn global(&self) -> &GlobalRef {
        &self.global
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl PartialEq for CallbackAdapter {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

/// Conversion driver over a set of declaration layouts
#[derive(Debug, Clone, Copy)]
pub struct Marshaller<'a> {
    layouts: &'a Layouts,
}

impl<'a> Marshaller<'a> {
    pub fn new(layouts: &'a Layouts) -> Self {
        Marshaller { layouts }
    }

    // ========== Managed -> native ==========

    pub fn from_ani(
        &self,
        env: &mut dyn AniEnv,
        shape: &Shape,
        value: &AniValue,
    ) -> AniResult<NativeValue> {
        match shape {
            Shape::Scalar(kind) => scalar_from_ani(*kind, value),
            Shape::String => Ok(NativeValue::String(env.string_get_utf8(value)?)),
            Shape::Opaque => Ok(NativeValue::Opaque(value.clone())),
            Shape::Enum { .. } => Ok(NativeValue::Enum(env.enum_item_get_index(value)?)),
            Shape::Struct(key) => {
                let layout = self
                    .layouts
                    .structs
                    .get(key)
                    .ok_or_else(|| AniError::class_not_found(key))?;
                let mut fields = Vec::with_capacity(layout.fields.len());
                for field in &layout.fields {
                    let managed = env.object_get_property(value, &field.name)?;
                    fields.push((field.path.clone(), self.from_ani(env, &field.shape, &managed)?));
                }
                Ok(NativeValue::Struct(fields))
            }
            Shape::Union(key) => self.union_from_ani(env, key, value),
            Shape::Iface(_) => Ok(NativeValue::Iface(IfaceHandle::Managed(Rc::new(
                env.global_reference_create(value),
            )))),
            Shape::Array(item) => {
                let length = env.array_get_length(value)?;
                let mut items = Vec::with_capacity(length);
                for index in 0..length {
                    let managed = env.array_get_ref(value, index)?;
                    items.push(self.from_ani_boxed(env, item, &managed)?);
                }
                Ok(NativeValue::Array(items))
            }
            Shape::FixedArray(item) => {
                let length = env.fixed_array_get_length(value)?;
                let mut items = Vec::with_capacity(length);
                for index in 0..length {
                    let managed = env.fixed_array_get(value, index)?;
                    items.push(self.from_ani(env, item, &managed)?);
                }
                Ok(NativeValue::Array(items))
            }
            Shape::TypedArray { item, .. } => {
                let byte_length = index_property(env, value, "byteLength")?;
                let byte_offset = index_property(env, value, "byteOffset")?;
                let buffer = env.object_get_property(value, "buffer")?;
                let bytes = env.arraybuffer_get_info(&buffer)?;
                let end = byte_offset + byte_length;
                let view = bytes
                    .get(byte_offset..end)
                    .ok_or_else(|| AniError::bounds_error(end, bytes.len()))?;
                Ok(NativeValue::Array(scalars_from_bytes(*item, view)?))
            }
            Shape::ArrayBuffer(item) => {
                let bytes = env.arraybuffer_get_info(value)?;
                Ok(NativeValue::Array(scalars_from_bytes(*item, &bytes)?))
            }
            Shape::BigInt(item) => {
                let width = i32::try_from(item.byte_width())
                    .map_err(|_| AniError::type_error("element too wide"))?;
                let buffer =
                    env.function_call(BIGINT_TO_BUFFER, &[value.clone(), AniValue::Int(width)])?;
                let bytes = env.arraybuffer_get_info(&buffer)?;
                Ok(NativeValue::Array(scalars_from_bytes(*item, &bytes)?))
            }
            Shape::Optional(inner) => {
                if env.reference_is_undefined(value) {
                    return Ok(NativeValue::Optional(None));
                }
                let native = self.from_ani_boxed(env, inner, value)?;
                Ok(NativeValue::Optional(Some(Box::new(native))))
            }
            Shape::Record { key, value: val } => {
                let iterator = env.record_iterator(value)?;
                let mut entries = Vec::new();
                loop {
                    let next = env.iterator_next(&iterator)?;
                    if env.object_get_property(&next, "done")? == AniValue::Boolean(true) {
                        break;
                    }
                    let tuple = env.object_get_property(&next, "value")?;
                    let managed_key = env.tuple_get_item(&tuple, 0)?;
                    let managed_val = env.tuple_get_item(&tuple, 1)?;
                    let native_key = self.from_ani_boxed(env, key, &managed_key)?;
                    let native_val = self.from_ani_boxed(env, val, &managed_val)?;
                    entries.push((native_key, native_val));
                }
                Ok(NativeValue::Map(entries))
            }
            Shape::Callback { params, ret } => {
                let global = env.global_reference_create(value);
                Ok(NativeValue::Callback(Rc::new(CallbackAdapter {
                    global,
                    params: params.clone(),
                    ret: ret.as_deref().cloned(),
                })))
            }
            Shape::Placeholder => Err(AniError::unsupported("rejected type")),
        }
    }

    fn union_from_ani(
        &self,
        env: &mut dyn AniEnv,
        key: &str,
        value: &AniValue,
    ) -> AniResult<NativeValue> {
        let layout = self
            .layouts
            .unions
            .get(key)
            .ok_or_else(|| AniError::class_not_found(key))?;
        for variant in &layout.variants {
            let payload = match &variant.kind {
                VariantKind::Null => {
                    if !env.reference_is_null(value) {
                        continue;
                    }
                    None
                }
                VariantKind::Undefined => {
                    if !env.reference_is_undefined(value) {
                        continue;
                    }
                    None
                }
                VariantKind::Value { boxed_desc, shape } => {
                    env.find_class(boxed_desc)?;
                    if !env.object_instance_of(value, boxed_desc)? {
                        continue;
                    }
                    Some(Box::new(self.from_ani_boxed(env, shape, value)?))
                }
            };
            return Ok(NativeValue::Union {
                tags: variant.tags.clone(),
                value: payload,
            });
        }
        Err(AniError::no_matching_variant(key))
    }

    /// `from_ani` for a value stored as a reference: primitives are unboxed first
    pub fn from_ani_boxed(
        &self,
        env: &mut dyn AniEnv,
        shape: &Shape,
        value: &AniValue,
    ) -> AniResult<NativeValue> {
        match shape {
            Shape::Scalar(kind) => {
                let unboxed = env.unbox_primitive(value, kind.ani_base())?;
                self.from_ani(env, shape, &unboxed)
            }
            _ => self.from_ani(env, shape, value),
        }
    }

    // ========== Native -> managed ==========

    pub fn into_ani(
        &self,
        env: &mut dyn AniEnv,
        shape: &Shape,
        value: &NativeValue,
    ) -> AniResult<AniValue> {
        match (shape, value) {
            (Shape::Scalar(_), scalar) => scalar_into_ani(scalar),
            (Shape::String, NativeValue::String(text)) => Ok(env.string_new_utf8(text)),
            (Shape::Opaque, NativeValue::Opaque(obj)) => Ok(obj.clone()),
            (Shape::Enum { desc }, NativeValue::Enum(index)) => {
                env.enum_get_item_by_index(desc, *index)
            }
            (Shape::Struct(key), NativeValue::Struct(_)) => {
                let layout = self
                    .layouts
                    .structs
                    .get(key)
                    .ok_or_else(|| AniError::class_not_found(key))?;
                let mut fields = Vec::with_capacity(layout.fields.len());
                for field in &layout.fields {
                    let native = value
                        .field(&field.path)
                        .ok_or_else(|| AniError::property_error(&field.path, key))?;
                    fields.push((field.name.clone(), self.into_ani(env, &field.shape, native)?));
                }
                env.find_class(&layout.impl_desc)?;
                env.object_new(&layout.impl_desc, fields)
            }
            (Shape::Union(key), NativeValue::Union { tags, value: payload }) => {
                let layout = self
                    .layouts
                    .unions
                    .get(key)
                    .ok_or_else(|| AniError::class_not_found(key))?;
                let variant = layout
                    .variants
                    .iter()
                    .find(|variant| &variant.tags == tags)
                    .ok_or_else(|| AniError::no_matching_variant(key))?;
                match (&variant.kind, payload) {
                    (VariantKind::Null, _) => Ok(env.get_null()),
                    (VariantKind::Undefined, _) => Ok(env.get_undefined()),
                    (VariantKind::Value { shape, .. }, Some(inner)) => {
                        self.into_ani_boxed(env, shape, inner)
                    }
                    (VariantKind::Value { .. }, None) => Err(AniError::type_error(format!(
                        "union {} variant {} has no value",
                        key,
                        tags.join(".")
                    ))),
                }
            }
            (Shape::Iface(key), NativeValue::Iface(handle)) => match handle {
                IfaceHandle::Managed(global) => Ok(global.value().clone()),
                IfaceHandle::Native { vtbl, data } => {
                    let layout = self
                        .layouts
                        .ifaces
                        .get(key)
                        .ok_or_else(|| AniError::class_not_found(key))?;
                    env.find_class(&layout.impl_desc)?;
                    env.object_new(
                        &layout.impl_desc,
                        vec![
                            ("_vtbl_ptr".to_string(), AniValue::Long(pointer(*vtbl))),
                            ("_data_ptr".to_string(), AniValue::Long(pointer(*data))),
                        ],
                    )
                }
            },
            (Shape::Array(item), NativeValue::Array(items)) => {
                env.get_undefined();
                let array = env.array_new_ref(items.len());
                for (index, native) in items.iter().enumerate() {
                    let boxed = self.into_ani_boxed(env, item, native)?;
                    env.array_set_ref(&array, index, boxed)?;
                }
                Ok(array)
            }
            (Shape::FixedArray(item), NativeValue::Array(items)) => {
                let managed = items
                    .iter()
                    .map(|native| self.into_ani(env, item, native))
                    .collect::<AniResult<Vec<_>>>()?;
                Ok(env.fixed_array_new(managed))
            }
            (Shape::TypedArray { class, item }, NativeValue::Array(items)) => {
                let bytes = scalars_to_bytes(*item, items)?;
                let length = bytes.len();
                let buffer = env.create_arraybuffer(bytes);
                let desc = format!("Lescompat/{};", class);
                env.find_class(&desc)?;
                env.object_new(
                    &desc,
                    vec![
                        ("buffer".to_string(), buffer),
                        ("byteOffset".to_string(), AniValue::Double(0.0)),
                        ("byteLength".to_string(), AniValue::Double(length as f64)),
                    ],
                )
            }
            (Shape::ArrayBuffer(item), NativeValue::Array(items)) => {
                Ok(env.create_arraybuffer(scalars_to_bytes(*item, items)?))
            }
            (Shape::BigInt(item), NativeValue::Array(items)) => {
                let buffer = env.create_arraybuffer(scalars_to_bytes(*item, items)?);
                env.function_call(BUFFER_TO_BIGINT, &[buffer])
            }
            (Shape::Optional(inner), NativeValue::Optional(payload)) => match payload {
                None => Ok(env.get_undefined()),
                Some(native) => self.into_ani_boxed(env, inner, native),
            },
            (Shape::Record { key, value: val }, NativeValue::Map(entries)) => {
                env.find_class(RECORD_DESC)?;
                let record = env.object_new(RECORD_DESC, Vec::new())?;
                for (native_key, native_val) in entries {
                    let managed_key = self.into_ani_boxed(env, key, native_key)?;
                    let managed_val = self.into_ani_boxed(env, val, native_val)?;
                    env.record_set(&record, managed_key, managed_val)?;
                }
                Ok(record)
            }
            // Native callables are not exposed to managed code; the glue
            // hands back an empty function reference.
            (Shape::Callback { .. }, NativeValue::Callback(_)) => Ok(AniValue::Null),
            (Shape::Placeholder, _) => Err(AniError::unsupported("rejected type")),
            (shape, value) => Err(AniError::type_error(format!(
                "cannot convert native {} with shape {:?}",
                value.type_name(),
                shape
            ))),
        }
    }

    /// `into_ani` producing a reference: primitives are boxed afterwards
    pub fn into_ani_boxed(
        &self,
        env: &mut dyn AniEnv,
        shape: &Shape,
        value: &NativeValue,
    ) -> AniResult<AniValue> {
        let managed = self.into_ani(env, shape, value)?;
        match shape {
            Shape::Scalar(kind) => {
                if let Some(desc) = kind.ani_base().boxed_desc() {
                    env.find_class(&desc)?;
                }
                env.box_primitive(&managed)
            }
            _ => Ok(managed),
        }
    }

    // ========== Callbacks ==========

    /// Invoke a managed callback from native code: box every argument,
    /// call the function object, unbox the result.
    pub fn call(
        &self,
        env: &mut dyn AniEnv,
        adapter: &CallbackAdapter,
        args: &[NativeValue],
    ) -> AniResult<Option<NativeValue>> {
        if args.len() != adapter.params.len() {
            return Err(AniError::function_error(format!(
                "callback expects {} arguments, got {}",
                adapter.params.len(),
                args.len()
            )));
        }
        let mut managed = Vec::with_capacity(args.len());
        for (shape, arg) in adapter.params.iter().zip(args) {
            managed.push(self.into_ani_boxed(env, shape, arg)?);
        }
        let result = env.functional_object_call(adapter.global.value(), &managed)?;
        match &adapter.ret {
            Some(shape) => Ok(Some(self.from_ani_boxed(env, shape, &result)?)),
            None => Ok(None),
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn pointer(raw: u64) -> i64 {
    raw as i64
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn index_property(env: &mut dyn AniEnv, value: &AniValue, name: &str) -> AniResult<usize> {
    match env.object_get_property(value, name)? {
        AniValue::Double(v) if v >= 0.0 => Ok(v as usize),
        other => Err(AniError::type_error(format!(
            "{} must be a non-negative double, got {}",
            name,
            other.class_name()
        ))),
    }
}

/// Shape of a typed array over `item`, if the item kind has one
pub fn typed_array_shape(item: ScalarKind) -> Option<Shape> {
    item.typed_array_class().map(|class| Shape::TypedArray {
        class: class.to_string(),
        item,
    })
}
