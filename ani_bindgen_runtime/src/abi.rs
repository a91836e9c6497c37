//! ANI type vocabulary
//!
//! Native type hints (`ani_int`, `ani_fixedarray_double`, ...), their
//! managed descriptors, and the binding scopes native functions are
//! registered into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IDL scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl ScalarKind {
    /// All kinds, in IDL declaration order
    pub const ALL: [ScalarKind; 11] = [
        ScalarKind::Bool,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::U8,
        ScalarKind::U16,
        ScalarKind::U32,
        ScalarKind::U64,
    ];

    /// Parse an IDL scalar spelling (`i32`, `bool`, ...)
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// IDL spelling
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, ScalarKind::Bool | ScalarKind::F32 | ScalarKind::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64
        )
    }

    /// Width of the native representation in bytes
    pub fn byte_width(self) -> usize {
        match self {
            ScalarKind::Bool | ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::F32 | ScalarKind::I32 | ScalarKind::U32 => 4,
            ScalarKind::F64 | ScalarKind::I64 | ScalarKind::U64 => 8,
        }
    }

    /// The ANI primitive carrying this kind. Unsigned kinds share the
    /// signed primitive of the same width.
    pub fn ani_base(self) -> AniBaseType {
        match self {
            ScalarKind::Bool => AniBaseType::Boolean,
            ScalarKind::F32 => AniBaseType::Float,
            ScalarKind::F64 => AniBaseType::Double,
            ScalarKind::I8 | ScalarKind::U8 => AniBaseType::Byte,
            ScalarKind::I16 | ScalarKind::U16 => AniBaseType::Short,
            ScalarKind::I32 | ScalarKind::U32 => AniBaseType::Int,
            ScalarKind::I64 | ScalarKind::U64 => AniBaseType::Long,
        }
    }

    /// Managed-language spelling of the primitive
    pub fn managed_name(self) -> &'static str {
        match self.ani_base() {
            AniBaseType::Boolean => "boolean",
            AniBaseType::Float => "float",
            AniBaseType::Double => "double",
            AniBaseType::Byte => "byte",
            AniBaseType::Short => "short",
            AniBaseType::Int => "int",
            AniBaseType::Long => "long",
            AniBaseType::Ref => "Object",
        }
    }

    /// Single-letter runtime descriptor
    pub fn descriptor(self) -> &'static str {
        self.ani_base().descriptor()
    }

    /// C++ spelling of the native value type
    pub fn cpp_type(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::F32 => "float",
            ScalarKind::F64 => "double",
            ScalarKind::I8 => "int8_t",
            ScalarKind::I16 => "int16_t",
            ScalarKind::I32 => "int32_t",
            ScalarKind::I64 => "int64_t",
            ScalarKind::U8 => "uint8_t",
            ScalarKind::U16 => "uint16_t",
            ScalarKind::U32 => "uint32_t",
            ScalarKind::U64 => "uint64_t",
        }
    }

    /// Managed typed-array class for this element kind, if there is one
    pub fn typed_array_class(self) -> Option<&'static str> {
        match self {
            ScalarKind::F32 => Some("Float32Array"),
            ScalarKind::F64 => Some("Float64Array"),
            ScalarKind::I8 => Some("Int8Array"),
            ScalarKind::I16 => Some("Int16Array"),
            ScalarKind::I32 => Some("Int32Array"),
            ScalarKind::I64 => Some("BigInt64Array"),
            ScalarKind::U8 => Some("Uint8Array"),
            ScalarKind::U16 => Some("Uint16Array"),
            ScalarKind::U32 => Some("Uint32Array"),
            ScalarKind::U64 => Some("BigUint64Array"),
            ScalarKind::Bool => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// ANI base types. Every ANI type reduces to one of these for
/// property access and method-call suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AniBaseType {
    Ref,
    Boolean,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl AniBaseType {
    pub fn hint(self) -> &'static str {
        match self {
            AniBaseType::Ref => "ref",
            AniBaseType::Boolean => "boolean",
            AniBaseType::Float => "float",
            AniBaseType::Double => "double",
            AniBaseType::Byte => "byte",
            AniBaseType::Short => "short",
            AniBaseType::Int => "int",
            AniBaseType::Long => "long",
        }
    }

    /// Capitalized hint used in API names (`Object_GetPropertyByName_Int`)
    pub fn suffix(self) -> &'static str {
        match self {
            AniBaseType::Ref => "Ref",
            AniBaseType::Boolean => "Boolean",
            AniBaseType::Float => "Float",
            AniBaseType::Double => "Double",
            AniBaseType::Byte => "Byte",
            AniBaseType::Short => "Short",
            AniBaseType::Int => "Int",
            AniBaseType::Long => "Long",
        }
    }

    /// Primitive descriptor letter; references have none
    pub fn descriptor(self) -> &'static str {
        match self {
            AniBaseType::Ref => "",
            AniBaseType::Boolean => "Z",
            AniBaseType::Float => "F",
            AniBaseType::Double => "D",
            AniBaseType::Byte => "B",
            AniBaseType::Short => "S",
            AniBaseType::Int => "I",
            AniBaseType::Long => "J",
        }
    }

    /// Wrapper class a value of this base type is boxed into
    pub fn boxed_desc(self) -> Option<String> {
        match self {
            AniBaseType::Ref => None,
            other => Some(format!("Lstd/core/{};", other.suffix())),
        }
    }
}

/// A native ANI type as spelled in generated C++ (`ani_<hint>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AniType {
    Base(AniBaseType),
    FixedArray(AniBaseType),
    Object,
    Array,
    FnObject,
    EnumItem,
    String,
    ArrayBuffer,
}

impl AniType {
    pub const REF: AniType = AniType::Base(AniBaseType::Ref);

    pub fn hint(&self) -> String {
        match self {
            AniType::Base(base) => base.hint().to_string(),
            AniType::FixedArray(base) => format!("fixedarray_{}", base.hint()),
            AniType::Object => "object".to_string(),
            AniType::Array => "array_ref".to_string(),
            AniType::FnObject => "fn_object".to_string(),
            AniType::EnumItem => "enum_item".to_string(),
            AniType::String => "string".to_string(),
            AniType::ArrayBuffer => "arraybuffer".to_string(),
        }
    }

    /// Base type; everything except the primitives is a reference
    pub fn base(&self) -> AniBaseType {
        match self {
            AniType::Base(base) => *base,
            _ => AniBaseType::Ref,
        }
    }

    pub fn suffix(&self) -> &'static str {
        self.base().suffix()
    }

    pub fn is_ref(&self) -> bool {
        self.base() == AniBaseType::Ref
    }

    /// The fixed-array type holding elements of this type
    pub fn fixedarray(&self) -> AniType {
        AniType::FixedArray(self.base())
    }
}

impl fmt::Display for AniType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ani_{}", self.hint())
    }
}

/// Native-side container a set of functions is bound into at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Class,
    Module,
    Namespace,
}

impl ScopeKind {
    /// Handle type (`ani_class`, ...)
    pub fn ani_type(self) -> &'static str {
        match self {
            ScopeKind::Class => "ani_class",
            ScopeKind::Module => "ani_module",
            ScopeKind::Namespace => "ani_namespace",
        }
    }

    /// Lookup call on the environment
    pub fn find(self) -> &'static str {
        match self {
            ScopeKind::Class => "FindClass",
            ScopeKind::Module => "FindModule",
            ScopeKind::Namespace => "FindNamespace",
        }
    }

    /// Bulk binding call on the environment
    pub fn bind(self) -> &'static str {
        match self {
            ScopeKind::Class => "Class_BindNativeMethods",
            ScopeKind::Module => "Module_BindNativeFunctions",
            ScopeKind::Namespace => "Namespace_BindNativeFunctions",
        }
    }

    /// Entry type in the binding table
    pub fn member_type(self) -> &'static str {
        match self {
            ScopeKind::Class => "ani_native_function",
            ScopeKind::Module | ScopeKind::Namespace => "ani_native_function",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_table() {
        assert_eq!(ScalarKind::Bool.descriptor(), "Z");
        assert_eq!(ScalarKind::U32.ani_base(), AniBaseType::Int);
        assert_eq!(ScalarKind::U64.descriptor(), "J");
        assert_eq!(ScalarKind::I8.managed_name(), "byte");
        assert_eq!(ScalarKind::F64.managed_name(), "double");
        assert_eq!(ScalarKind::parse("u16"), Some(ScalarKind::U16));
        assert_eq!(ScalarKind::parse("char"), None);
    }

    #[test]
    fn test_typed_array_classes() {
        assert_eq!(ScalarKind::I64.typed_array_class(), Some("BigInt64Array"));
        assert_eq!(ScalarKind::U64.typed_array_class(), Some("BigUint64Array"));
        assert_eq!(ScalarKind::Bool.typed_array_class(), None);
    }

    #[test]
    fn test_ani_type_spelling() {
        let int = AniType::Base(AniBaseType::Int);
        assert_eq!(int.to_string(), "ani_int");
        assert_eq!(int.fixedarray().to_string(), "ani_fixedarray_int");
        assert_eq!(AniType::Object.fixedarray().to_string(), "ani_fixedarray_ref");
        assert_eq!(AniType::String.suffix(), "Ref");
        assert_eq!(int.suffix(), "Int");
        assert!(AniType::EnumItem.is_ref());
        assert!(!int.is_ref());
    }

    #[test]
    fn test_boxed_descriptor() {
        assert_eq!(
            AniBaseType::Boolean.boxed_desc().as_deref(),
            Some("Lstd/core/Boolean;")
        );
        assert_eq!(AniBaseType::Ref.boxed_desc(), None);
    }

    #[test]
    fn test_scope_calls() {
        assert_eq!(ScopeKind::Class.find(), "FindClass");
        assert_eq!(ScopeKind::Module.bind(), "Module_BindNativeFunctions");
        assert_eq!(ScopeKind::Namespace.ani_type(), "ani_namespace");
    }
}
