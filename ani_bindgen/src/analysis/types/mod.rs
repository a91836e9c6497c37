//! Type mapping.
//!
//! Every type occurrence, in the context of the package using it, maps to
//! one `TypeAniInfo`: the native ANI type, the managed descriptor and
//! spelling, and a `Strategy` that the emitters dispatch on to produce the
//! conversion code in both directions.

mod emit;
mod shape;

pub use shape::marshal_layouts;

use std::rc::Rc;

use ani_bindgen_runtime::{AniType, ScalarKind};

use super::attrs::str_args;
use super::AnalysisManager;
use crate::abi::{encode, DeclKind};
use crate::error::GenResult;
use crate::ir::{IfaceId, PackageId, StructId, Type, TypeRef, TypeRefId, UnionId};

/// Declaration converted by generated per-declaration functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclRef {
    Struct(StructId),
    Union(UnionId),
    Iface(IfaceId),
}

/// How values of a type cross the boundary
#[derive(Debug, Clone)]
pub enum Strategy {
    Scalar(ScalarKind),
    String,
    Opaque,
    Enum {
        cpp_full: String,
    },
    /// Struct, union or interface
    Decl {
        decl: DeclRef,
        /// Qualified name, `pkg.Name`
        key: String,
        from_func: String,
        into_func: String,
        /// Header defining the conversion functions
        impl_header: String,
    },
    Array(Rc<TypeAniInfo>),
    FixedArray(Rc<TypeAniInfo>),
    TypedArray {
        item: Rc<TypeAniInfo>,
        /// `None` when the item type has no typed-array class
        kind: Option<ScalarKind>,
    },
    ArrayBuffer {
        item: Rc<TypeAniInfo>,
        kind: Option<ScalarKind>,
    },
    BigInt {
        item: Rc<TypeAniInfo>,
        kind: Option<ScalarKind>,
        module_desc: String,
    },
    Optional(Rc<TypeAniInfo>),
    Record {
        key: Rc<TypeAniInfo>,
        value: Rc<TypeAniInfo>,
    },
    /// `Map` without `@record`; emits placeholders
    Map,
    Callback {
        params: Vec<Rc<TypeAniInfo>>,
        ret: Option<Rc<TypeAniInfo>>,
    },
}

#[derive(Debug, Clone)]
pub struct TypeAniInfo {
    pub ani_type: AniType,
    pub type_desc: String,
    /// Managed spelling in the using package
    pub sts_type: String,
    pub cpp_owner: String,
    pub cpp_param: String,
    pub strategy: Strategy,
}

/// Array strategies, in the order they win when several are given
const ARRAY_ATTRS: [&str; 4] = ["bigint", "typedarray", "arraybuffer", "fixedarray"];

impl TypeAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, ty: TypeRefId, pkg: PackageId) -> GenResult<Self> {
        let group = am.group();
        let type_ref = group.type_ref(ty);
        let cpp = am.cpp();
        let cpp_owner = cpp.owner(ty);
        let cpp_param = cpp.param(ty);

        let (ani_type, type_desc, sts_type, strategy) = match &type_ref.ty {
            Type::Scalar(kind) => (
                AniType::Base(kind.ani_base()),
                kind.descriptor().to_string(),
                kind.managed_name().to_string(),
                Strategy::Scalar(*kind),
            ),
            Type::String => (
                AniType::String,
                "Lstd/core/String;".to_string(),
                "string".to_string(),
                Strategy::String,
            ),
            Type::Opaque => {
                let sts_type = type_ref
                    .attrs
                    .get_last("sts_type")
                    .and_then(|attr| str_args(am.diagnostics_mut(), attr, "s"))
                    .and_then(|args| args.into_iter().next())
                    .unwrap_or_else(|| "Object".to_string());
                (
                    AniType::Object,
                    "Lstd/core/Object;".to_string(),
                    sts_type,
                    Strategy::Opaque,
                )
            }
            Type::Enum(id) => {
                let info = am.enum_info(*id)?;
                if info.is_const {
                    am.diagnostics_mut().error(
                        format!("@const enum {} cannot be used as type", info.sts_name),
                        type_ref.loc.as_ref(),
                    );
                }
                let sts_type = spell(am, pkg, info.ns, &info.sts_name, info.is_default)?;
                (
                    AniType::EnumItem,
                    info.type_desc.clone(),
                    sts_type,
                    Strategy::Enum {
                        cpp_full: cpp.enum_full(*id),
                    },
                )
            }
            Type::Struct(id) => {
                let info = am.struct_info(*id)?;
                let decl = group.struct_decl(*id);
                let sts_type = spell(am, pkg, info.ns, &info.sts_name, info.is_default)?;
                (
                    AniType::Object,
                    info.type_desc.clone(),
                    sts_type,
                    decl_strategy(am, DeclRef::Struct(*id), decl.package, &decl.name),
                )
            }
            Type::Union(id) => {
                let info = am.union_info(*id)?;
                let decl = group.union_decl(*id);
                let sts_type = spell(am, pkg, info.ns, &info.sts_name, info.is_default)?;
                (
                    AniType::REF,
                    info.type_desc.clone(),
                    sts_type,
                    decl_strategy(am, DeclRef::Union(*id), decl.package, &decl.name),
                )
            }
            Type::Iface(id) => {
                let info = am.iface_info(*id)?;
                let decl = group.iface(*id);
                let sts_type = spell(am, pkg, info.ns, &info.sts_name, info.is_default)?;
                (
                    AniType::Object,
                    info.type_desc.clone(),
                    sts_type,
                    decl_strategy(am, DeclRef::Iface(*id), decl.package, &decl.name),
                )
            }
            Type::Array(item) => array_mapping(am, type_ref, *item, pkg)?,
            Type::Optional(item) => {
                let item = am.type_info(*item, pkg)?;
                (
                    AniType::REF,
                    item.type_desc_boxed(),
                    format!("({} | undefined)", item.sts_type),
                    Strategy::Optional(item),
                )
            }
            Type::Map(key, value) => {
                let key_info = am.type_info(*key, pkg)?;
                let value_info = am.type_info(*value, pkg)?;
                if type_ref.attrs.has("record") {
                    (
                        AniType::Object,
                        "Lescompat/Record;".to_string(),
                        format!("Record<{}, {}>", key_info.sts_type, value_info.sts_type),
                        Strategy::Record {
                            key: key_info,
                            value: value_info,
                        },
                    )
                } else {
                    am.diagnostics_mut().error(
                        format!(
                            "Map is not supported yet, if you want to use TS Record type, please use `@record Map<{}, {}>`",
                            group.type_ref(*key).text,
                            group.type_ref(*value).text
                        ),
                        type_ref.loc.as_ref(),
                    );
                    (
                        AniType::Object,
                        "Lescompat/Map;".to_string(),
                        format!("Map<{}, {}>", key_info.sts_type, value_info.sts_type),
                        Strategy::Map,
                    )
                }
            }
            Type::Callback { params, ret } => {
                let mut param_infos = Vec::with_capacity(params.len());
                for param in params {
                    param_infos.push(am.type_info(*param, pkg)?);
                }
                let ret_info = match ret {
                    Some(ret) => Some(am.type_info(*ret, pkg)?),
                    None => None,
                };
                let args: Vec<String> = param_infos
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("arg_{}: {}", i, p.sts_type))
                    .collect();
                let ret_sts = ret_info.as_ref().map_or("void", |r| r.sts_type.as_str());
                (
                    AniType::FnObject,
                    format!("Lstd/core/Function{};", params.len()),
                    format!("(({}) => {})", args.join(", "), ret_sts),
                    Strategy::Callback {
                        params: param_infos,
                        ret: ret_info,
                    },
                )
            }
        };

        Ok(TypeAniInfo {
            ani_type,
            type_desc,
            sts_type,
            cpp_owner,
            cpp_param,
            strategy,
        })
    }

    /// Descriptor of the boxed form; reference types are already boxed
    pub fn type_desc_boxed(&self) -> String {
        self.ani_type
            .base()
            .boxed_desc()
            .unwrap_or_else(|| self.type_desc.clone())
    }
}

fn spell(
    am: &mut AnalysisManager<'_>,
    user_pkg: PackageId,
    decl_ns: super::NsId,
    name: &str,
    is_default: bool,
) -> GenResult<String> {
    let user_ns = am.package_info(user_pkg)?.ns;
    Ok(am
        .package_group_info()
        .spell_in(user_ns, decl_ns, name, is_default))
}

fn decl_strategy(am: &AnalysisManager<'_>, decl: DeclRef, pkg: PackageId, name: &str) -> Strategy {
    let package = am.group().package(pkg);
    let mut segments = package.segments();
    segments.push(name.to_string());
    Strategy::Decl {
        decl,
        key: format!("{}.{}", package.name, name),
        from_func: encode(&segments, DeclKind::FromAni),
        into_func: encode(&segments, DeclKind::IntoAni),
        impl_header: format!("{}.{}.ani.1.h", package.name, name),
    }
}

type Mapping = (AniType, String, String, Strategy);

fn array_mapping(
    am: &mut AnalysisManager<'_>,
    type_ref: &TypeRef,
    item_ref: TypeRefId,
    pkg: PackageId,
) -> GenResult<Mapping> {
    let item = am.type_info(item_ref, pkg)?;
    let item_text = &am.group().type_ref(item_ref).text;
    let present: Vec<&str> = ARRAY_ATTRS
        .into_iter()
        .filter(|name| type_ref.attrs.has(name))
        .collect();
    if present.len() > 1 {
        am.diagnostics_mut().error(
            format!(
                "{} carries more than one of @bigint, @typedarray, @arraybuffer, @fixedarray",
                type_ref.text
            ),
            type_ref.loc.as_ref(),
        );
    }
    let scalar = match item.strategy {
        Strategy::Scalar(kind) => Some(kind),
        _ => None,
    };

    Ok(match present.first().copied() {
        Some("bigint") => {
            let kind = scalar.filter(|k| k.is_integer());
            if kind.is_none() {
                am.diagnostics_mut().error(
                    format!("@bigint does not support type {}", item_text),
                    type_ref.loc.as_ref(),
                );
            }
            let module_desc = am.package_info(pkg)?.module_desc.clone();
            (
                AniType::Object,
                "Lescompat/BigInt;".to_string(),
                "BigInt".to_string(),
                Strategy::BigInt {
                    item,
                    kind,
                    module_desc,
                },
            )
        }
        Some("typedarray") => {
            let kind = scalar.filter(|k| k.typed_array_class().is_some());
            let class = match kind.and_then(ScalarKind::typed_array_class) {
                Some(class) => class,
                None => {
                    am.diagnostics_mut().error(
                        format!("@typedarray does not support type {}", item_text),
                        type_ref.loc.as_ref(),
                    );
                    "TypedArray"
                }
            };
            (
                AniType::Object,
                format!("Lescompat/{};", class),
                class.to_string(),
                Strategy::TypedArray { item, kind },
            )
        }
        Some("arraybuffer") => {
            let kind = scalar.filter(|k| matches!(k, ScalarKind::I8 | ScalarKind::U8));
            if kind.is_none() {
                am.diagnostics_mut().error(
                    format!("@arraybuffer does not support type {}", item_text),
                    type_ref.loc.as_ref(),
                );
            }
            (
                AniType::ArrayBuffer,
                "Lescompat/ArrayBuffer;".to_string(),
                "ArrayBuffer".to_string(),
                Strategy::ArrayBuffer { item, kind },
            )
        }
        Some(_) => (
            item.ani_type.fixedarray(),
            "Lescompat/FixedArray;".to_string(),
            format!("FixedArray<{}>", item.sts_type),
            Strategy::FixedArray(item),
        ),
        None => (
            AniType::Array,
            "Lescompat/Array;".to_string(),
            format!("Array<{}>", item.sts_type),
            Strategy::Array(item),
        ),
    })
}

#[cfg(test)]
mod tests;
