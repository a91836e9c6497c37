//! Marshalling shapes
//!
//! A `Shape` says how one IDL type crosses the boundary: which conversion
//! strategy applies and what its children are. Named declarations are
//! referenced by key and described once in `Layouts`.

use std::collections::HashMap;

use crate::abi::ScalarKind;

/// Conversion strategy for one type
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar(ScalarKind),
    String,
    /// Raw managed object passed through
    Opaque,
    Enum {
        desc: String,
    },
    /// Key into `Layouts::structs`
    Struct(String),
    /// Key into `Layouts::unions`
    Union(String),
    /// Key into `Layouts::ifaces`
    Iface(String),
    /// Growable `escompat.Array` with boxed items
    Array(Box<Shape>),
    FixedArray(Box<Shape>),
    TypedArray {
        class: String,
        item: ScalarKind,
    },
    ArrayBuffer(ScalarKind),
    BigInt(ScalarKind),
    Optional(Box<Shape>),
    Record {
        key: Box<Shape>,
        value: Box<Shape>,
    },
    Callback {
        params: Vec<Shape>,
        ret: Option<Box<Shape>>,
    },
    /// Rejected type; converts to a default value
    Placeholder,
}

impl Shape {
    /// Whether the managed value is a primitive rather than a reference
    pub fn is_primitive(&self) -> bool {
        matches!(self, Shape::Scalar(_))
    }
}

/// One flattened struct field
#[derive(Debug, Clone, PartialEq)]
pub struct FinalField {
    /// Managed property name
    pub name: String,
    /// Dotted C++ member path (`base.x`)
    pub path: String,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    /// Class instantiated by into-native
    pub impl_desc: String,
    pub fields: Vec<FinalField>,
}

/// How a union variant is recognised
#[derive(Debug, Clone, PartialEq)]
pub enum VariantKind {
    Null,
    Undefined,
    Value {
        /// Class tested with `Object_InstanceOf`
        boxed_desc: String,
        shape: Shape,
    },
}

/// One flattened union variant
#[derive(Debug, Clone, PartialEq)]
pub struct UnionVariant {
    /// Tag chain from this union down to the variant
    pub tags: Vec<String>,
    pub kind: VariantKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionLayout {
    pub variants: Vec<UnionVariant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfaceLayout {
    pub impl_desc: String,
}

/// Layouts of every named declaration a shape may refer to
#[derive(Debug, Clone, Default)]
pub struct Layouts {
    pub structs: HashMap<String, StructLayout>,
    pub unions: HashMap<String, UnionLayout>,
    pub ifaces: HashMap<String, IfaceLayout>,
}

impl Layouts {
    pub fn new() -> Self {
        Self::default()
    }
}
