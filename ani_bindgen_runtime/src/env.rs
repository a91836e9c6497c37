//! ANI environment
//!
//! `AniEnv` mirrors the subset of the ANI function table the generated
//! glue calls. Every conversion takes the environment explicitly; nothing
//! is looked up from thread-local state.
//!
//! `MockEnv` is an in-memory implementation that records every call by
//! its ANI name, so tests can check which calls a conversion made and
//! how many.

use num_bigint::BigInt;
use num_traits::Zero;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::abi::{AniBaseType, ScopeKind};
use crate::error::{AniError, AniResult};
use crate::value::{AniValue, ManagedFunction, ObjectBody};

/// Module function converting a BigInt to its two's-complement bytes
pub const BIGINT_TO_BUFFER: &str = "__fromBigIntToArrayBuffer";
/// Module function building a BigInt from two's-complement bytes
pub const BUFFER_TO_BIGINT: &str = "__fromArrayBufferToBigInt";

/// Global reference keeping a managed object alive from native code.
///
/// Dropping the reference releases it; the release runs exactly once.
pub struct GlobalRef {
    id: u64,
    value: AniValue,
    release: Option<Box<dyn FnOnce(u64)>>,
}

impl GlobalRef {
    pub fn new(id: u64, value: AniValue, release: Box<dyn FnOnce(u64)>) -> Self {
        GlobalRef {
            id,
            value,
            release: Some(release),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn value(&self) -> &AniValue {
        &self.value
    }
}

impl Drop for GlobalRef {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl fmt::Debug for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalRef({}, {})", self.id, self.value.class_name())
    }
}

impl PartialEq for GlobalRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// The ANI calls generated glue relies on
pub trait AniEnv {
    // ========== References ==========
    fn get_undefined(&mut self) -> AniValue;
    fn get_null(&mut self) -> AniValue;
    fn reference_is_undefined(&mut self, value: &AniValue) -> bool;
    fn reference_is_null(&mut self, value: &AniValue) -> bool;
    fn global_reference_create(&mut self, value: &AniValue) -> GlobalRef;

    // ========== Classes and objects ==========
    fn find_class(&mut self, desc: &str) -> AniResult<()>;
    fn object_instance_of(&mut self, value: &AniValue, desc: &str) -> AniResult<bool>;
    fn object_new(&mut self, desc: &str, fields: Vec<(String, AniValue)>) -> AniResult<AniValue>;
    fn object_get_property(&mut self, value: &AniValue, name: &str) -> AniResult<AniValue>;

    // ========== Boxing ==========
    fn box_primitive(&mut self, value: &AniValue) -> AniResult<AniValue>;
    fn unbox_primitive(&mut self, value: &AniValue, base: AniBaseType) -> AniResult<AniValue>;

    // ========== Strings ==========
    fn string_get_utf8(&mut self, value: &AniValue) -> AniResult<String>;
    fn string_new_utf8(&mut self, text: &str) -> AniValue;

    // ========== Arrays ==========
    fn array_get_length(&mut self, value: &AniValue) -> AniResult<usize>;
    fn array_get_ref(&mut self, value: &AniValue, index: usize) -> AniResult<AniValue>;
    fn array_new_ref(&mut self, length: usize) -> AniValue;
    fn array_set_ref(&mut self, array: &AniValue, index: usize, item: AniValue) -> AniResult<()>;
    fn fixed_array_get_length(&mut self, value: &AniValue) -> AniResult<usize>;
    fn fixed_array_get(&mut self, value: &AniValue, index: usize) -> AniResult<AniValue>;
    fn fixed_array_new(&mut self, items: Vec<AniValue>) -> AniValue;
    fn arraybuffer_get_info(&mut self, value: &AniValue) -> AniResult<Vec<u8>>;
    fn create_arraybuffer(&mut self, bytes: Vec<u8>) -> AniValue;

    // ========== Enums ==========
    fn enum_item_get_index(&mut self, value: &AniValue) -> AniResult<usize>;
    fn enum_get_item_by_index(&mut self, desc: &str, index: usize) -> AniResult<AniValue>;

    // ========== Records ==========
    fn record_iterator(&mut self, record: &AniValue) -> AniResult<AniValue>;
    fn iterator_next(&mut self, iterator: &AniValue) -> AniResult<AniValue>;
    fn tuple_get_item(&mut self, tuple: &AniValue, index: usize) -> AniResult<AniValue>;
    fn record_set(&mut self, record: &AniValue, key: AniValue, value: AniValue) -> AniResult<()>;

    // ========== Functions ==========
    fn function_call(&mut self, name: &str, args: &[AniValue]) -> AniResult<AniValue>;
    fn functional_object_call(&mut self, func: &AniValue, args: &[AniValue])
        -> AniResult<AniValue>;

    // ========== Registration ==========
    fn bind_native_functions(
        &mut self,
        scope: ScopeKind,
        desc: &str,
        names: &[String],
    ) -> AniResult<()>;
}

/// A set of native functions bound into one scope
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub scope: ScopeKind,
    pub desc: String,
    pub names: Vec<String>,
}

#[derive(Debug, Default)]
struct GlobalTable {
    next_id: u64,
    live: BTreeMap<u64, AniValue>,
    deleted: Vec<u64>,
}

/// Recording in-memory environment
#[derive(Debug, Default)]
pub struct MockEnv {
    log: Rc<RefCell<Vec<String>>>,
    globals: Rc<RefCell<GlobalTable>>,
    /// class -> superclass
    superclasses: HashMap<String, String>,
    /// enum descriptor -> item count
    enums: HashMap<String, usize>,
    /// classes `find_class` must fail on
    missing: Vec<String>,
    bindings: Vec<Binding>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `class` as a subclass of `parent` for `object_instance_of`
    pub fn declare_subclass<S1: Into<String>, S2: Into<String>>(&mut self, class: S1, parent: S2) {
        self.superclasses.insert(class.into(), parent.into());
    }

    pub fn declare_enum<S: Into<String>>(&mut self, desc: S, items: usize) {
        self.enums.insert(desc.into(), items);
    }

    /// Make lookups of `desc` fail
    pub fn hide_class<S: Into<String>>(&mut self, desc: S) {
        self.missing.push(desc.into());
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Number of recorded calls with the given ANI name
    pub fn count(&self, name: &str) -> usize {
        self.log.borrow().iter().filter(|call| *call == name).count()
    }

    pub fn clear_log(&mut self) {
        self.log.borrow_mut().clear();
    }

    pub fn live_globals(&self) -> usize {
        self.globals.borrow().live.len()
    }

    /// Ids of released global references, in release order
    pub fn deleted_globals(&self) -> Vec<u64> {
        self.globals.borrow().deleted.clone()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    fn record(&self, name: &str) {
        self.log.borrow_mut().push(name.to_string());
    }

    fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        let mut current = class;
        loop {
            if current == ancestor || ancestor == "Lstd/core/Object;" {
                return true;
            }
            match self.superclasses.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}

fn expect_object<'a>(
    value: &'a AniValue,
    what: &str,
) -> AniResult<&'a Rc<crate::value::ManagedObject>> {
    value
        .as_object()
        .ok_or_else(|| AniError::type_error(format!("expected {}, got {}", what, value.class_name())))
}

fn element<T: Clone>(items: &[T], index: usize) -> AniResult<T> {
    items
        .get(index)
        .cloned()
        .ok_or_else(|| AniError::bounds_error(index, items.len()))
}

fn boxed_class(base: AniBaseType) -> AniResult<String> {
    base.boxed_desc()
        .ok_or_else(|| AniError::type_error("references are not boxed"))
}

impl AniEnv for MockEnv {
    fn get_undefined(&mut self) -> AniValue {
        self.record("GetUndefined");
        AniValue::Undefined
    }

    fn get_null(&mut self) -> AniValue {
        self.record("GetNull");
        AniValue::Null
    }

    fn reference_is_undefined(&mut self, value: &AniValue) -> bool {
        self.record("Reference_IsUndefined");
        matches!(value, AniValue::Undefined)
    }

    fn reference_is_null(&mut self, value: &AniValue) -> bool {
        self.record("Reference_IsNull");
        matches!(value, AniValue::Null)
    }

    fn global_reference_create(&mut self, value: &AniValue) -> GlobalRef {
        self.record("GlobalReference_Create");
        let id = {
            let mut table = self.globals.borrow_mut();
            table.next_id += 1;
            let id = table.next_id;
            table.live.insert(id, value.clone());
            id
        };
        let globals = Rc::clone(&self.globals);
        let log = Rc::clone(&self.log);
        GlobalRef::new(
            id,
            value.clone(),
            Box::new(move |id| {
                log.borrow_mut().push("GlobalReference_Delete".to_string());
                let mut table = globals.borrow_mut();
                table.live.remove(&id);
                table.deleted.push(id);
            }),
        )
    }

    fn find_class(&mut self, desc: &str) -> AniResult<()> {
        self.record("FindClass");
        if self.missing.iter().any(|m| m == desc) {
            return Err(AniError::class_not_found(desc));
        }
        Ok(())
    }

    fn object_instance_of(&mut self, value: &AniValue, desc: &str) -> AniResult<bool> {
        self.record("Object_InstanceOf");
        Ok(match value {
            AniValue::Object(obj) => self.is_subclass(&obj.class, desc),
            _ => false,
        })
    }

    fn object_new(&mut self, desc: &str, fields: Vec<(String, AniValue)>) -> AniResult<AniValue> {
        self.record("Object_New");
        if desc == "Lescompat/Record;" {
            return Ok(AniValue::object(
                desc,
                ObjectBody::Record(RefCell::new(Vec::new())),
            ));
        }
        Ok(AniValue::with_fields(desc, fields))
    }

    fn object_get_property(&mut self, value: &AniValue, name: &str) -> AniResult<AniValue> {
        let obj = expect_object(value, "object")?;
        match &obj.body {
            ObjectBody::Fields(fields) => {
                let found = fields
                    .borrow()
                    .iter()
                    .find(|(field, _)| field == name)
                    .map(|(_, v)| v.clone());
                let found = found.ok_or_else(|| AniError::property_error(name, &obj.class))?;
                self.record(&format!(
                    "Object_GetPropertyByName_{}",
                    found.base_type().suffix()
                ));
                Ok(found)
            }
            _ => Err(AniError::property_error(name, &obj.class)),
        }
    }

    fn box_primitive(&mut self, value: &AniValue) -> AniResult<AniValue> {
        let class = boxed_class(value.base_type())?;
        self.record("Object_New");
        Ok(AniValue::object(class, ObjectBody::Boxed(value.clone())))
    }

    fn unbox_primitive(&mut self, value: &AniValue, base: AniBaseType) -> AniResult<AniValue> {
        let obj = expect_object(value, "boxed primitive")?;
        self.record(&format!("Object_CallMethod_{}", base.suffix()));
        match &obj.body {
            ObjectBody::Boxed(inner) if inner.base_type() == base => Ok(inner.clone()),
            _ => Err(AniError::type_error(format!(
                "cannot unbox {} as {}",
                obj.class,
                base.hint()
            ))),
        }
    }

    fn string_get_utf8(&mut self, value: &AniValue) -> AniResult<String> {
        let obj = expect_object(value, "string")?;
        self.record("String_GetUTF8Size");
        self.record("String_GetUTF8");
        match &obj.body {
            ObjectBody::String(text) => Ok(text.clone()),
            _ => Err(AniError::type_error(format!("{} is not a string", obj.class))),
        }
    }

    fn string_new_utf8(&mut self, text: &str) -> AniValue {
        self.record("String_NewUTF8");
        AniValue::string(text)
    }

    fn array_get_length(&mut self, value: &AniValue) -> AniResult<usize> {
        self.record("Array_GetLength");
        match &expect_object(value, "array")?.body {
            ObjectBody::Array(items) => Ok(items.borrow().len()),
            _ => Err(AniError::type_error("expected escompat.Array")),
        }
    }

    fn array_get_ref(&mut self, value: &AniValue, index: usize) -> AniResult<AniValue> {
        self.record("Array_Get_Ref");
        match &expect_object(value, "array")?.body {
            ObjectBody::Array(items) => element(&items.borrow(), index),
            _ => Err(AniError::type_error("expected escompat.Array")),
        }
    }

    fn array_new_ref(&mut self, length: usize) -> AniValue {
        self.record("Array_New_Ref");
        AniValue::array(vec![AniValue::Undefined; length])
    }

    fn array_set_ref(&mut self, array: &AniValue, index: usize, item: AniValue) -> AniResult<()> {
        self.record("Array_Set_Ref");
        match &expect_object(array, "array")?.body {
            ObjectBody::Array(items) => {
                let mut items = items.borrow_mut();
                let length = items.len();
                let slot = items
                    .get_mut(index)
                    .ok_or_else(|| AniError::bounds_error(index, length))?;
                *slot = item;
                Ok(())
            }
            _ => Err(AniError::type_error("expected escompat.Array")),
        }
    }

    fn fixed_array_get_length(&mut self, value: &AniValue) -> AniResult<usize> {
        self.record("FixedArray_GetLength");
        match &expect_object(value, "fixed array")?.body {
            ObjectBody::FixedArray(items) => Ok(items.borrow().len()),
            _ => Err(AniError::type_error("expected FixedArray")),
        }
    }

    fn fixed_array_get(&mut self, value: &AniValue, index: usize) -> AniResult<AniValue> {
        self.record("FixedArray_Get");
        match &expect_object(value, "fixed array")?.body {
            ObjectBody::FixedArray(items) => element(&items.borrow(), index),
            _ => Err(AniError::type_error("expected FixedArray")),
        }
    }

    fn fixed_array_new(&mut self, items: Vec<AniValue>) -> AniValue {
        self.record("FixedArray_New");
        AniValue::object(
            "Lescompat/FixedArray;",
            ObjectBody::FixedArray(RefCell::new(items)),
        )
    }

    fn arraybuffer_get_info(&mut self, value: &AniValue) -> AniResult<Vec<u8>> {
        self.record("ArrayBuffer_GetInfo");
        match &expect_object(value, "ArrayBuffer")?.body {
            ObjectBody::ArrayBuffer(bytes) => Ok(bytes.clone()),
            _ => Err(AniError::type_error("expected ArrayBuffer")),
        }
    }

    fn create_arraybuffer(&mut self, bytes: Vec<u8>) -> AniValue {
        self.record("CreateArrayBuffer");
        AniValue::object("Lescompat/ArrayBuffer;", ObjectBody::ArrayBuffer(bytes))
    }

    fn enum_item_get_index(&mut self, value: &AniValue) -> AniResult<usize> {
        self.record("EnumItem_GetIndex");
        match &expect_object(value, "enum item")?.body {
            ObjectBody::EnumItem(index) => Ok(*index),
            _ => Err(AniError::type_error("expected enum item")),
        }
    }

    fn enum_get_item_by_index(&mut self, desc: &str, index: usize) -> AniResult<AniValue> {
        self.record("FindEnum");
        let items = *self
            .enums
            .get(desc)
            .ok_or_else(|| AniError::class_not_found(desc))?;
        self.record("Enum_GetEnumItemByIndex");
        if index >= items {
            return Err(AniError::bounds_error(index, items));
        }
        Ok(AniValue::object(desc, ObjectBody::EnumItem(index)))
    }

    fn record_iterator(&mut self, record: &AniValue) -> AniResult<AniValue> {
        self.record("Object_CallMethodByName_Ref");
        match &expect_object(record, "Record")?.body {
            ObjectBody::Record(entries) => Ok(AniValue::object(
                "Lescompat/MapIterator;",
                ObjectBody::Iterator {
                    entries: entries.borrow().clone(),
                    position: Cell::new(0),
                },
            )),
            _ => Err(AniError::type_error("expected Record")),
        }
    }

    fn iterator_next(&mut self, iterator: &AniValue) -> AniResult<AniValue> {
        self.record("Object_CallMethodByName_Ref");
        match &expect_object(iterator, "iterator")?.body {
            ObjectBody::Iterator { entries, position } => {
                let index = position.get();
                let (done, value) = match entries.get(index) {
                    Some((key, value)) => {
                        position.set(index + 1);
                        (
                            false,
                            AniValue::object(
                                "Lstd/core/Tuple2;",
                                ObjectBody::Tuple(vec![key.clone(), value.clone()]),
                            ),
                        )
                    }
                    None => (true, AniValue::Undefined),
                };
                Ok(AniValue::with_fields(
                    "Lescompat/IteratorResult;",
                    vec![
                        ("done".to_string(), AniValue::Boolean(done)),
                        ("value".to_string(), value),
                    ],
                ))
            }
            _ => Err(AniError::type_error("expected iterator")),
        }
    }

    fn tuple_get_item(&mut self, tuple: &AniValue, index: usize) -> AniResult<AniValue> {
        self.record("TupleValue_GetItem_Ref");
        match &expect_object(tuple, "tuple")?.body {
            ObjectBody::Tuple(items) => element(items, index),
            _ => Err(AniError::type_error("expected tuple")),
        }
    }

    fn record_set(&mut self, record: &AniValue, key: AniValue, value: AniValue) -> AniResult<()> {
        self.record("Object_CallMethodByName_Void");
        match &expect_object(record, "Record")?.body {
            ObjectBody::Record(entries) => {
                let mut entries = entries.borrow_mut();
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
                Ok(())
            }
            _ => Err(AniError::type_error("expected Record")),
        }
    }

    fn function_call(&mut self, name: &str, args: &[AniValue]) -> AniResult<AniValue> {
        self.record("Function_Call_Ref");
        match name {
            BIGINT_TO_BUFFER => {
                let (value, width) = match args {
                    [value, AniValue::Int(width)] => (value, *width),
                    _ => return Err(AniError::function_error("bad arguments")),
                };
                let big = match &expect_object(value, "BigInt")?.body {
                    ObjectBody::BigInt(big) => big.clone(),
                    _ => return Err(AniError::type_error("expected BigInt")),
                };
                let width = usize::try_from(width)
                    .map_err(|_| AniError::function_error("negative element size"))?;
                let mut bytes = big.to_signed_bytes_le();
                let fill = if big < BigInt::zero() { 0xff } else { 0x00 };
                while width > 0 && bytes.len() % width != 0 {
                    bytes.push(fill);
                }
                Ok(self.create_arraybuffer(bytes))
            }
            BUFFER_TO_BIGINT => {
                let buffer = args
                    .first()
                    .ok_or_else(|| AniError::function_error("missing buffer"))?;
                let bytes = self.arraybuffer_get_info(buffer)?;
                Ok(AniValue::object(
                    "Lescompat/BigInt;",
                    ObjectBody::BigInt(BigInt::from_signed_bytes_le(&bytes)),
                ))
            }
            other => Err(AniError::function_error(format!("unknown function {}", other))),
        }
    }

    fn functional_object_call(
        &mut self,
        func: &AniValue,
        args: &[AniValue],
    ) -> AniResult<AniValue> {
        self.record("FunctionalObject_Call");
        match &expect_object(func, "function")?.body {
            ObjectBody::Function(ManagedFunction { body, .. }) => Ok(body(args)),
            _ => Err(AniError::type_error("expected function object")),
        }
    }

    fn bind_native_functions(
        &mut self,
        scope: ScopeKind,
        desc: &str,
        names: &[String],
    ) -> AniResult<()> {
        self.record(scope.find());
        if self.missing.iter().any(|m| m == desc) {
            return Err(AniError::class_not_found(desc));
        }
        self.record(scope.bind());
        if let Some(dup) = names
            .iter()
            .enumerate()
            .find(|(i, name)| names[..*i].contains(*name))
            .map(|(_, name)| name)
        {
            return Err(AniError::bind_error(format!(
                "{} bound twice in {}",
                dup, desc
            )));
        }
        self.bindings.push(Binding {
            scope,
            desc: desc.to_string(),
            names: names.to_vec(),
        });
        Ok(())
    }
}
