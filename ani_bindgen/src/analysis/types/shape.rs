//! Marshalling shapes for the reference marshaller.
//!
//! The same analyses that drive C++ emission are lowered here to the
//! runtime's `Shape`/`Layouts` model, so tests can execute a conversion
//! against a mock environment instead of compiling the glue.

use ani_bindgen_runtime::marshal::typed_array_shape;
use ani_bindgen_runtime::shape::{
    FinalField, IfaceLayout, Layouts, Shape, StructLayout, UnionLayout, UnionVariant, VariantKind,
};

use super::{DeclRef, Strategy, TypeAniInfo};
use crate::analysis::{AnalysisManager, UnionFieldKind};
use crate::error::GenResult;

impl TypeAniInfo {
    /// Shape executing the conversions this type emits
    pub fn marshal_shape(&self) -> Shape {
        match &self.strategy {
            Strategy::Scalar(kind) => Shape::Scalar(*kind),
            Strategy::String => Shape::String,
            Strategy::Opaque => Shape::Opaque,
            Strategy::Enum { .. } => Shape::Enum {
                desc: self.type_desc.clone(),
            },
            Strategy::Decl { decl, key, .. } => match decl {
                DeclRef::Struct(_) => Shape::Struct(key.clone()),
                DeclRef::Union(_) => Shape::Union(key.clone()),
                DeclRef::Iface(_) => Shape::Iface(key.clone()),
            },
            Strategy::Array(item) => Shape::Array(Box::new(item.marshal_shape())),
            Strategy::FixedArray(item) => Shape::FixedArray(Box::new(item.marshal_shape())),
            Strategy::TypedArray { kind, .. } => kind
                .and_then(typed_array_shape)
                .unwrap_or(Shape::Placeholder),
            Strategy::ArrayBuffer { kind, .. } => kind.map_or(Shape::Placeholder, Shape::ArrayBuffer),
            Strategy::BigInt { kind, .. } => kind.map_or(Shape::Placeholder, Shape::BigInt),
            Strategy::Optional(item) => Shape::Optional(Box::new(item.marshal_shape())),
            Strategy::Record { key, value } => Shape::Record {
                key: Box::new(key.marshal_shape()),
                value: Box::new(value.marshal_shape()),
            },
            Strategy::Map => Shape::Placeholder,
            Strategy::Callback { params, ret } => Shape::Callback {
                params: params.iter().map(|p| p.marshal_shape()).collect(),
                ret: ret.as_ref().map(|r| Box::new(r.marshal_shape())),
            },
        }
    }
}

/// Layouts of every struct, union and interface in the group, keyed by
/// `pkg.Name` as `Strategy::Decl` refers to them.
pub fn marshal_layouts(am: &mut AnalysisManager<'_>) -> GenResult<Layouts> {
    let group = am.group();
    let mut layouts = Layouts::new();

    for pkg in group.package_ids() {
        let package = group.package(pkg);

        for &id in &package.structs {
            let info = am.struct_info(id)?;
            let mut fields = Vec::with_capacity(info.final_fields.len());
            for field in &info.final_fields {
                // Inherited field types are spelled in the package declaring them.
                let owner = field.parts.last().map_or(id, |part| part.owner);
                let owner_pkg = group.struct_decl(owner).package;
                let ty = am.type_info(field.ty, owner_pkg)?;
                fields.push(FinalField {
                    name: field.name.clone(),
                    path: field.path.clone(),
                    shape: ty.marshal_shape(),
                });
            }
            layouts.structs.insert(
                format!("{}.{}", package.name, group.struct_decl(id).name),
                StructLayout {
                    impl_desc: info.impl_desc.clone(),
                    fields,
                },
            );
        }

        for &id in &package.unions {
            let info = am.union_info(id)?;
            let mut variants = Vec::with_capacity(info.final_fields.len());
            for field in &info.final_fields {
                let kind = match field.kind {
                    UnionFieldKind::Null => VariantKind::Null,
                    UnionFieldKind::Undefined => VariantKind::Undefined,
                    UnionFieldKind::Value(ty) => {
                        let owner = field.parts.last().map_or(id, |part| part.owner);
                        let ty = am.type_info(ty, group.union_decl(owner).package)?;
                        VariantKind::Value {
                            boxed_desc: ty.type_desc_boxed(),
                            shape: ty.marshal_shape(),
                        }
                    }
                };
                variants.push(UnionVariant {
                    tags: field.names.clone(),
                    kind,
                });
            }
            layouts.unions.insert(
                format!("{}.{}", package.name, group.union_decl(id).name),
                UnionLayout { variants },
            );
        }

        for &id in &package.ifaces {
            let info = am.iface_info(id)?;
            layouts.ifaces.insert(
                format!("{}.{}", package.name, group.iface(id).name),
                IfaceLayout {
                    impl_desc: info.impl_desc.clone(),
                },
            );
        }
    }
    Ok(layouts)
}
