//! Managed and native values
//!
//! `AniValue` is what the managed side holds: primitives, null, undefined,
//! and references to heap objects. `NativeValue` is what the C++ side of
//! a binding holds after conversion.

use num_bigint::BigInt;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::abi::{AniBaseType, ScalarKind};
use crate::marshal::{CallbackAdapter, IfaceHandle};

/// Value on the managed side of the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum AniValue {
    // ========== Special references ==========
    Undefined,
    Null,

    // ========== Primitives ==========
    Boolean(bool),
    Float(f32),
    Double(f64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),

    // ========== Heap references ==========
    Object(Rc<ManagedObject>),
}

impl AniValue {
    /// Allocate a heap object
    pub fn object<S: Into<String>>(class: S, body: ObjectBody) -> Self {
        AniValue::Object(Rc::new(ManagedObject {
            class: class.into(),
            body,
        }))
    }

    /// Plain object with named properties
    pub fn with_fields<S: Into<String>>(class: S, fields: Vec<(String, AniValue)>) -> Self {
        Self::object(class, ObjectBody::Fields(RefCell::new(fields)))
    }

    pub fn string<S: Into<String>>(text: S) -> Self {
        Self::object("Lstd/core/String;", ObjectBody::String(text.into()))
    }

    pub fn array(items: Vec<AniValue>) -> Self {
        Self::object("Lescompat/Array;", ObjectBody::Array(RefCell::new(items)))
    }

    /// The ANI base type carrying this value
    pub fn base_type(&self) -> AniBaseType {
        match self {
            AniValue::Boolean(_) => AniBaseType::Boolean,
            AniValue::Float(_) => AniBaseType::Float,
            AniValue::Double(_) => AniBaseType::Double,
            AniValue::Byte(_) => AniBaseType::Byte,
            AniValue::Short(_) => AniBaseType::Short,
            AniValue::Int(_) => AniBaseType::Int,
            AniValue::Long(_) => AniBaseType::Long,
            AniValue::Undefined | AniValue::Null | AniValue::Object(_) => AniBaseType::Ref,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<ManagedObject>> {
        match self {
            AniValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Class descriptor for diagnostics
    pub fn class_name(&self) -> &str {
        match self {
            AniValue::Undefined => "undefined",
            AniValue::Null => "null",
            AniValue::Boolean(_) => "boolean",
            AniValue::Float(_) => "float",
            AniValue::Double(_) => "double",
            AniValue::Byte(_) => "byte",
            AniValue::Short(_) => "short",
            AniValue::Int(_) => "int",
            AniValue::Long(_) => "long",
            AniValue::Object(obj) => &obj.class,
        }
    }
}

/// A managed heap object
#[derive(Debug, PartialEq)]
pub struct ManagedObject {
    /// Runtime class descriptor (`Lstd/core/Int;`, `Lpkg/Point;`, ...)
    pub class: String,
    pub body: ObjectBody,
}

/// Payload of a managed heap object
#[derive(Debug, PartialEq)]
pub enum ObjectBody {
    /// Boxed primitive (`std.core.Int` and friends)
    Boxed(AniValue),
    String(String),
    Array(RefCell<Vec<AniValue>>),
    FixedArray(RefCell<Vec<AniValue>>),
    ArrayBuffer(Vec<u8>),
    BigInt(BigInt),
    EnumItem(usize),
    /// Objects with named properties: struct instances, interface
    /// implementations, typed-array views, iterator results
    Fields(RefCell<Vec<(String, AniValue)>>),
    Record(RefCell<Vec<(AniValue, AniValue)>>),
    Tuple(Vec<AniValue>),
    Iterator {
        entries: Vec<(AniValue, AniValue)>,
        position: Cell<usize>,
    },
    Function(ManagedFunction),
}

/// Callable managed object
#[derive(Clone)]
pub struct ManagedFunction {
    pub name: String,
    pub body: Rc<dyn Fn(&[AniValue]) -> AniValue>,
}

impl ManagedFunction {
    pub fn new<S, F>(name: S, body: F) -> Self
    where
        S: Into<String>,
        F: Fn(&[AniValue]) -> AniValue + 'static,
    {
        ManagedFunction {
            name: name.into(),
            body: Rc::new(body),
        }
    }
}

impl fmt::Debug for ManagedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManagedFunction({})", self.name)
    }
}

impl PartialEq for ManagedFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

/// Value on the native (C++) side of the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    // ========== Scalars ==========
    Bool(bool),
    F32(f32),
    F64(f64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),

    // ========== Owned containers ==========
    String(String),
    /// Enum key
    Enum(usize),
    /// Opaque handle: the managed object itself
    Opaque(AniValue),
    Array(Vec<NativeValue>),
    Optional(Option<Box<NativeValue>>),
    Map(Vec<(NativeValue, NativeValue)>),
    /// Flattened struct: (dotted C++ path, value) in final-field order
    Struct(Vec<(String, NativeValue)>),
    /// Union: tag chain from the outermost union inwards, plus the payload
    /// (absent for null/undefined variants)
    Union {
        tags: Vec<String>,
        value: Option<Box<NativeValue>>,
    },
    Iface(IfaceHandle),
    Callback(Rc<CallbackAdapter>),
}

impl NativeValue {
    /// Scalar kind of a scalar value
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        Some(match self {
            NativeValue::Bool(_) => ScalarKind::Bool,
            NativeValue::F32(_) => ScalarKind::F32,
            NativeValue::F64(_) => ScalarKind::F64,
            NativeValue::I8(_) => ScalarKind::I8,
            NativeValue::I16(_) => ScalarKind::I16,
            NativeValue::I32(_) => ScalarKind::I32,
            NativeValue::I64(_) => ScalarKind::I64,
            NativeValue::U8(_) => ScalarKind::U8,
            NativeValue::U16(_) => ScalarKind::U16,
            NativeValue::U32(_) => ScalarKind::U32,
            NativeValue::U64(_) => ScalarKind::U64,
            _ => return None,
        })
    }

    /// Look up a flattened struct field by its dotted path
    pub fn field(&self, path: &str) -> Option<&NativeValue> {
        match self {
            NativeValue::Struct(fields) => fields
                .iter()
                .find(|(name, _)| name == path)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::String(_) => "string",
            NativeValue::Enum(_) => "enum",
            NativeValue::Opaque(_) => "opaque",
            NativeValue::Array(_) => "array",
            NativeValue::Optional(_) => "optional",
            NativeValue::Map(_) => "map",
            NativeValue::Struct(_) => "struct",
            NativeValue::Union { .. } => "union",
            NativeValue::Iface(_) => "interface",
            NativeValue::Callback(_) => "callback",
            scalar => scalar.scalar_kind().map_or("scalar", ScalarKind::name),
        }
    }
}
