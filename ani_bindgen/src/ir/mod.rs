//! Resolved declaration tree.
//!
//! Declarations live in flat arenas inside `PackageGroup` and refer to each
//! other by typed indices, so analyses can key their caches on plain
//! `Copy` ids instead of borrowing into the tree.

pub mod loader;

pub use loader::{load_group, load_group_from_path};

use ani_bindgen_runtime::ScalarKind;
use serde::{Deserialize, Serialize};

use crate::span::SourceLoc;

macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub usize);

            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

define_id!(
    PackageId,
    FuncId,
    /// Interface method
    MethodId,
    IfaceId,
    StructId,
    UnionId,
    EnumId,
    /// Occurrence of a type expression
    TypeRefId,
);

// ========== Attributes ==========

/// One attribute argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttrValue {
    /// Pattern letter matching this value
    pub fn pattern_char(&self) -> char {
        match self {
            AttrValue::Bool(_) => 'b',
            AttrValue::Int(_) => 'i',
            AttrValue::Float(_) => 'f',
            AttrValue::Str(_) => 's',
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    pub name: String,
    #[serde(default)]
    pub args: Vec<AttrValue>,
    #[serde(default)]
    pub loc: Option<SourceLoc>,
}

impl Attr {
    pub fn new<S: Into<String>>(name: S, args: Vec<AttrValue>) -> Self {
        Self {
            name: name.into(),
            args,
            loc: None,
        }
    }

    /// String argument at `index`, if present and a string
    pub fn str_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(AttrValue::as_str)
    }
}

/// Attributes attached to one declaration, in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(pub Vec<Attr>);

impl Attrs {
    /// The last occurrence of `name`; later attributes override earlier ones
    pub fn get_last(&self, name: &str) -> Option<&Attr> {
        self.0.iter().rev().find(|a| a.name == name)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Attr> + 'a {
        self.0.iter().filter(move |a| a.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|a| a.name == name)
    }
}

// ========== Types ==========

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Scalar(ScalarKind),
    String,
    Opaque,
    Enum(EnumId),
    Struct(StructId),
    Union(UnionId),
    Iface(IfaceId),
    Array(TypeRefId),
    Optional(TypeRefId),
    Map(TypeRefId, TypeRefId),
    Callback {
        params: Vec<TypeRefId>,
        ret: Option<TypeRefId>,
    },
}

/// A type expression as written at one use site
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub ty: Type,
    /// Source spelling, for diagnostics
    pub text: String,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
}

// ========== Declarations ==========

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRefId,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeRefId>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
    pub package: PackageId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeRefId>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
    pub iface: IfaceId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfaceParent {
    pub ty: TypeRefId,
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfaceDecl {
    pub name: String,
    pub parents: Vec<IfaceParent>,
    pub methods: Vec<MethodId>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
    pub package: PackageId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: TypeRefId,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<StructField>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
    pub package: PackageId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionField {
    pub name: String,
    /// `None` for unit variants marked `@null` / `@undefined`
    pub ty: Option<TypeRefId>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDecl {
    pub name: String,
    pub fields: Vec<UnionField>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
    pub package: PackageId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumItem {
    pub name: String,
    pub loc: Option<SourceLoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub ty: TypeRefId,
    pub items: Vec<EnumItem>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
    pub package: PackageId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// Dotted package name
    pub name: String,
    pub functions: Vec<FuncId>,
    pub ifaces: Vec<IfaceId>,
    pub structs: Vec<StructId>,
    pub unions: Vec<UnionId>,
    pub enums: Vec<EnumId>,
    pub attrs: Attrs,
    pub loc: Option<SourceLoc>,
}

impl Package {
    pub fn segments(&self) -> Vec<String> {
        self.name.split('.').map(String::from).collect()
    }
}

/// Every package of one generation run, plus the declaration arenas
#[derive(Debug, Clone, Default)]
pub struct PackageGroup {
    pub packages: Vec<Package>,
    pub functions: Vec<FuncDecl>,
    pub methods: Vec<MethodDecl>,
    pub ifaces: Vec<IfaceDecl>,
    pub structs: Vec<StructDecl>,
    pub unions: Vec<UnionDecl>,
    pub enums: Vec<EnumDecl>,
    pub types: Vec<TypeRef>,
}

impl PackageGroup {
    pub fn package_ids(&self) -> impl Iterator<Item = PackageId> {
        (0..self.packages.len()).map(PackageId)
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }

    pub fn function(&self, id: FuncId) -> &FuncDecl {
        &self.functions[id.0]
    }

    pub fn method(&self, id: MethodId) -> &MethodDecl {
        &self.methods[id.0]
    }

    pub fn iface(&self, id: IfaceId) -> &IfaceDecl {
        &self.ifaces[id.0]
    }

    pub fn struct_decl(&self, id: StructId) -> &StructDecl {
        &self.structs[id.0]
    }

    pub fn union_decl(&self, id: UnionId) -> &UnionDecl {
        &self.unions[id.0]
    }

    pub fn enum_decl(&self, id: EnumId) -> &EnumDecl {
        &self.enums[id.0]
    }

    pub fn type_ref(&self, id: TypeRefId) -> &TypeRef {
        &self.types[id.0]
    }

    pub fn package_by_name(&self, name: &str) -> Option<PackageId> {
        self.packages.iter().position(|p| p.name == name).map(PackageId)
    }
}
