//! Binding scopes and per-declaration ANI information.

use std::collections::HashMap;

use ani_bindgen_runtime::{ScalarKind, ScopeKind};

use super::attrs::str_args;
use super::AnalysisManager;
use crate::error::{GenError, GenResult};
use crate::ir::{EnumId, IfaceId, PackageId, StructId, Type, TypeRefId, UnionId};

// ========== Namespace tree ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NsId(pub usize);

/// One binding scope. Module roots are `ani_module`s, every part below
/// them an `ani_namespace`.
#[derive(Debug, Clone)]
pub struct Namespace {
    /// Module name for roots, the path part otherwise
    pub name: String,
    pub parent: Option<NsId>,
    pub module: NsId,
    pub scope: ScopeKind,
    pub ani_path: Vec<String>,
    pub impl_desc: String,
    pub children: Vec<(String, NsId)>,
    pub packages: Vec<PackageId>,
    pub is_default: bool,
    /// Code injected at the head of the module (roots only)
    pub injected_heads: Vec<String>,
    pub injected_codes: Vec<String>,
}

fn impl_desc_of(path: &[String]) -> String {
    format!("L{};", path.join("/"))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Every binding scope of the group, built once
#[derive(Debug, Clone, Default)]
pub struct PackageGroupAniInfo {
    namespaces: Vec<Namespace>,
    modules: Vec<NsId>,
    package_ns: HashMap<PackageId, NsId>,
}

impl PackageGroupAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>) -> Self {
        let group = am.group();
        let prefix = am.config().prefix_segments();
        let mut info = PackageGroupAniInfo::default();

        for id in group.package_ids() {
            let package = group.package(id);
            let diags = am.diagnostics_mut();
            let (module, parts) = match package.attrs.get_last("namespace") {
                Some(attr) => match str_args(diags, attr, "ss*") {
                    Some(args) => {
                        let mut args = args.into_iter();
                        let module = args.next().unwrap_or_else(|| package.name.clone());
                        let parts: Vec<String> = args
                            .flat_map(|a| a.split('.').map(String::from).collect::<Vec<_>>())
                            .collect();
                        (module, parts)
                    }
                    None => (package.name.clone(), Vec::new()),
                },
                None => (package.name.clone(), Vec::new()),
            };

            let root = info.module_ns(&prefix, &module);
            let mut ns = root;
            for part in parts {
                ns = info.child_ns(ns, &part);
            }
            let node = &mut info.namespaces[ns.0];
            node.packages.push(id);
            node.is_default |= package.attrs.has("sts_export_default");

            for attr in package.attrs.get_all("sts_inject") {
                if let Some(code) = str_args(diags, attr, "s") {
                    info.namespaces[ns.0].injected_codes.extend(code);
                }
            }
            for attr in package.attrs.get_all("sts_inject_into_module") {
                if let Some(code) = str_args(diags, attr, "s") {
                    info.namespaces[root.0].injected_heads.extend(code);
                }
            }
            info.package_ns.insert(id, ns);
        }
        info
    }

    fn module_ns(&mut self, prefix: &[String], module: &str) -> NsId {
        if let Some(found) = self
            .modules
            .iter()
            .copied()
            .find(|m| self.namespaces[m.0].name == module)
        {
            return found;
        }
        let id = NsId(self.namespaces.len());
        let mut ani_path = prefix.to_vec();
        ani_path.extend(module.split('.').map(String::from));
        self.namespaces.push(Namespace {
            name: module.to_string(),
            parent: None,
            module: id,
            scope: ScopeKind::Module,
            impl_desc: impl_desc_of(&ani_path),
            ani_path,
            children: Vec::new(),
            packages: Vec::new(),
            is_default: false,
            injected_heads: Vec::new(),
            injected_codes: Vec::new(),
        });
        self.modules.push(id);
        id
    }

    fn child_ns(&mut self, parent: NsId, name: &str) -> NsId {
        let node = &self.namespaces[parent.0];
        if let Some((_, found)) = node.children.iter().find(|(n, _)| n == name) {
            return *found;
        }
        let id = NsId(self.namespaces.len());
        let mut ani_path = node.ani_path.clone();
        ani_path.push(name.to_string());
        let module = node.module;
        self.namespaces.push(Namespace {
            name: name.to_string(),
            parent: Some(parent),
            module,
            scope: ScopeKind::Namespace,
            impl_desc: impl_desc_of(&ani_path),
            ani_path,
            children: Vec::new(),
            packages: Vec::new(),
            is_default: false,
            injected_heads: Vec::new(),
            injected_codes: Vec::new(),
        });
        self.namespaces[parent.0].children.push((name.to_string(), id));
        id
    }

    pub fn namespace(&self, id: NsId) -> &Namespace {
        &self.namespaces[id.0]
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn modules(&self) -> impl Iterator<Item = &Namespace> {
        self.modules.iter().map(|m| &self.namespaces[m.0])
    }

    pub fn package_namespace(&self, pkg: PackageId) -> Option<NsId> {
        self.package_ns.get(&pkg).copied()
    }

    /// Managed expression reaching `member` of `ns` from another module
    pub fn member_path(&self, ns: NsId, member: &str, member_default: bool) -> String {
        let node = &self.namespaces[ns.0];
        match node.parent {
            None if member_default => format!("__{}_default.{}", sanitize(&node.name), member),
            None => format!("__{}.{}", sanitize(&node.name), member),
            Some(parent) => format!(
                "{}.{}",
                self.member_path(parent, &node.name, node.is_default),
                member
            ),
        }
    }

    /// Managed spelling of a declaration of `decl_ns` written inside `user_ns`
    pub fn spell_in(&self, user_ns: NsId, decl_ns: NsId, name: &str, is_default: bool) -> String {
        if user_ns == decl_ns {
            name.to_string()
        } else {
            self.member_path(decl_ns, name, is_default)
        }
    }
}

// ========== Packages ==========

#[derive(Debug, Clone)]
pub struct PackageAniInfo {
    /// `include/<pkg>.ani.hpp`
    pub header: String,
    /// `src/<pkg>.ani.cpp`
    pub source: String,
    pub cpp_ns: String,
    pub ns: NsId,
    pub scope: ScopeKind,
    pub impl_desc: String,
    /// Descriptor of the enclosing module
    pub module_desc: String,
    pub is_default: bool,
}

impl PackageAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, id: PackageId) -> GenResult<Self> {
        let group = am.group();
        let package = group.package(id);
        let tree = am.package_group_info();
        let ns = tree.package_namespace(id).ok_or_else(|| {
            GenError::ScopeLookup(format!("package `{}` has no namespace", package.name))
        })?;
        let node = tree.namespace(ns);
        Ok(PackageAniInfo {
            header: format!("{}.ani.hpp", package.name),
            source: format!("{}.ani.cpp", package.name),
            cpp_ns: package.segments().join("::"),
            ns,
            scope: node.scope,
            impl_desc: node.impl_desc.clone(),
            module_desc: tree.namespace(node.module).impl_desc.clone(),
            is_default: package.attrs.has("sts_export_default"),
        })
    }
}

/// `L<ns path>/<name>;`
fn decl_desc(am: &mut AnalysisManager<'_>, pkg: PackageId, name: &str) -> GenResult<String> {
    let info = am.package_info(pkg)?;
    let tree = am.package_group_info();
    let mut path = tree.namespace(info.ns).ani_path.clone();
    path.push(name.to_string());
    Ok(impl_desc_of(&path))
}

/// Injected code snippets of one attribute kind
fn injected(am: &mut AnalysisManager<'_>, attrs: &crate::ir::Attrs, name: &str) -> Vec<String> {
    let diags = am.diagnostics_mut();
    attrs
        .get_all(name)
        .filter_map(|attr| str_args(diags, attr, "s"))
        .flatten()
        .collect()
}

// ========== Enums ==========

#[derive(Debug, Clone)]
pub struct EnumAniInfo {
    pub sts_name: String,
    pub type_desc: String,
    pub ns: NsId,
    pub is_const: bool,
    pub is_default: bool,
}

impl EnumAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, id: EnumId) -> GenResult<Self> {
        let group = am.group();
        let decl = group.enum_decl(id);
        let is_const = decl.attrs.has("const");
        let ty = group.type_ref(decl.ty);
        if !is_const {
            if let Type::Scalar(ScalarKind::Bool | ScalarKind::F32 | ScalarKind::F64) = ty.ty {
                am.diagnostics_mut().error(
                    format!("enum {} without @const cannot have type {}", decl.name, ty.text),
                    decl.loc.as_ref(),
                );
            }
        }
        Ok(EnumAniInfo {
            sts_name: decl.name.clone(),
            type_desc: decl_desc(am, decl.package, &decl.name)?,
            ns: am.package_info(decl.package)?.ns,
            is_const,
            is_default: decl.attrs.has("sts_export_default"),
        })
    }
}

// ========== Structs ==========

/// One step of a flattened field path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructFieldRef {
    pub owner: StructId,
    pub index: usize,
}

/// A field as the managed object sees it, after `@extends` flattening
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructFinalField {
    pub name: String,
    /// Dotted C++ member path
    pub path: String,
    pub ty: TypeRefId,
    pub parts: Vec<StructFieldRef>,
}

#[derive(Debug, Clone)]
pub struct StructAniInfo {
    pub sts_name: String,
    pub impl_name: String,
    pub type_desc: String,
    pub impl_desc: String,
    pub ns: NsId,
    pub is_class: bool,
    pub is_default: bool,
    pub final_fields: Vec<StructFinalField>,
    pub readonly_fields: Vec<String>,
    pub interface_injected_codes: Vec<String>,
    pub class_injected_codes: Vec<String>,
}

impl StructAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, id: StructId) -> GenResult<Self> {
        let group = am.group();
        let decl = group.struct_decl(id);
        let is_class = decl.attrs.has("class");
        let impl_name = if is_class {
            decl.name.clone()
        } else {
            format!("{}_inner", decl.name)
        };

        let mut final_fields = Vec::new();
        for (index, field) in decl.fields.iter().enumerate() {
            let part = StructFieldRef { owner: id, index };
            if !field.attrs.has("extends") {
                final_fields.push(StructFinalField {
                    name: field.name.clone(),
                    path: field.name.clone(),
                    ty: field.ty,
                    parts: vec![part],
                });
                continue;
            }
            let parent = match group.type_ref(field.ty).ty {
                Type::Struct(parent) => parent,
                _ => {
                    am.diagnostics_mut()
                        .error("struct cannot extend non-struct type", field.loc.as_ref());
                    continue;
                }
            };
            if group.struct_decl(parent).attrs.has("class") {
                am.diagnostics_mut()
                    .error("cannot extend an @class struct", field.loc.as_ref());
                continue;
            }
            let parent_info = am.struct_info(parent)?;
            for inherited in &parent_info.final_fields {
                let mut parts = vec![part];
                parts.extend(inherited.parts.iter().copied());
                final_fields.push(StructFinalField {
                    name: inherited.name.clone(),
                    path: format!("{}.{}", field.name, inherited.path),
                    ty: inherited.ty,
                    parts,
                });
            }
        }

        let readonly_fields = decl
            .fields
            .iter()
            .filter(|f| f.attrs.has("readonly"))
            .map(|f| f.name.clone())
            .collect();

        Ok(StructAniInfo {
            sts_name: decl.name.clone(),
            type_desc: decl_desc(am, decl.package, &decl.name)?,
            impl_desc: decl_desc(am, decl.package, &impl_name)?,
            impl_name,
            ns: am.package_info(decl.package)?.ns,
            is_class,
            is_default: decl.attrs.has("sts_export_default"),
            final_fields,
            readonly_fields,
            interface_injected_codes: injected(am, &decl.attrs, "sts_inject_into_interface"),
            class_injected_codes: injected(am, &decl.attrs, "sts_inject_into_class"),
        })
    }
}

// ========== Unions ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionFieldKind {
    Value(TypeRefId),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionFieldRef {
    pub owner: UnionId,
    pub index: usize,
}

/// A variant after nested unions are flattened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionFinalField {
    /// Field names from this union down to the variant
    pub parts: Vec<UnionFieldRef>,
    pub names: Vec<String>,
    pub kind: UnionFieldKind,
}

impl UnionFinalField {
    /// Identifier-safe name (`shape_circle`)
    pub fn flat_name(&self) -> String {
        self.names.join("_")
    }
}

#[derive(Debug, Clone)]
pub struct UnionAniInfo {
    pub sts_name: String,
    pub type_desc: String,
    pub ns: NsId,
    pub is_default: bool,
    /// Direct fields in declaration order
    pub fields: Vec<(String, UnionFieldKind)>,
    pub final_fields: Vec<UnionFinalField>,
}

impl UnionAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, id: UnionId) -> GenResult<Self> {
        let group = am.group();
        let decl = group.union_decl(id);
        let mut fields = Vec::with_capacity(decl.fields.len());
        let mut final_fields = Vec::new();

        for (index, field) in decl.fields.iter().enumerate() {
            let part = UnionFieldRef { owner: id, index };
            let kind = match field.ty {
                Some(ty) => UnionFieldKind::Value(ty),
                None if field.attrs.has("undefined") => UnionFieldKind::Undefined,
                None if field.attrs.has("null") => UnionFieldKind::Null,
                None => {
                    am.diagnostics_mut().error(
                        format!(
                            "union field {} must have a type or have @null/@undefined attribute",
                            field.name
                        ),
                        field.loc.as_ref(),
                    );
                    UnionFieldKind::Null
                }
            };
            fields.push((field.name.clone(), kind));

            let nested = match kind {
                UnionFieldKind::Value(ty) => match group.type_ref(ty).ty {
                    Type::Union(inner) => Some(inner),
                    _ => None,
                },
                _ => None,
            };
            match nested {
                Some(inner) => {
                    let inner_info = am.union_info(inner)?;
                    for variant in &inner_info.final_fields {
                        let mut parts = vec![part];
                        parts.extend(variant.parts.iter().copied());
                        let mut names = vec![field.name.clone()];
                        names.extend(variant.names.iter().cloned());
                        final_fields.push(UnionFinalField {
                            parts,
                            names,
                            kind: variant.kind,
                        });
                    }
                }
                None => final_fields.push(UnionFinalField {
                    parts: vec![part],
                    names: vec![field.name.clone()],
                    kind,
                }),
            }
        }

        Ok(UnionAniInfo {
            sts_name: decl.name.clone(),
            type_desc: "Lstd/core/Object;".to_string(),
            ns: am.package_info(decl.package)?.ns,
            is_default: decl.attrs.has("sts_export_default"),
            fields,
            final_fields,
        })
    }
}

// ========== Interfaces ==========

#[derive(Debug, Clone)]
pub struct IfaceAniInfo {
    pub sts_name: String,
    pub impl_name: String,
    pub type_desc: String,
    pub impl_desc: String,
    pub ns: NsId,
    pub is_class: bool,
    pub is_default: bool,
    /// Self first, then parents depth-first, without duplicates
    pub ancestors: Vec<IfaceId>,
    pub interface_injected_codes: Vec<String>,
    pub class_injected_codes: Vec<String>,
}

impl IfaceAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, id: IfaceId) -> GenResult<Self> {
        let group = am.group();
        let decl = group.iface(id);
        let is_class = decl.attrs.has("class");
        let impl_name = if is_class {
            decl.name.clone()
        } else {
            format!("{}_inner", decl.name)
        };

        let mut ancestors = vec![id];
        for parent in &decl.parents {
            // Loaded groups never get here; the loader rejects such parents.
            let Type::Iface(parent_id) = group.type_ref(parent.ty).ty else {
                am.diagnostics_mut()
                    .error("interface cannot extend non-interface type", parent.loc.as_ref());
                continue;
            };
            if group.iface(parent_id).attrs.has("class") {
                am.diagnostics_mut()
                    .error("cannot extend an @class interface", parent.loc.as_ref());
                continue;
            }
            let parent_info = am.iface_info(parent_id)?;
            for ancestor in &parent_info.ancestors {
                if !ancestors.contains(ancestor) {
                    ancestors.push(*ancestor);
                }
            }
        }

        Ok(IfaceAniInfo {
            sts_name: decl.name.clone(),
            type_desc: decl_desc(am, decl.package, &decl.name)?,
            impl_desc: decl_desc(am, decl.package, &impl_name)?,
            impl_name,
            ns: am.package_info(decl.package)?.ns,
            is_class,
            is_default: decl.attrs.has("sts_export_default"),
            ancestors,
            interface_injected_codes: injected(am, &decl.attrs, "sts_inject_into_interface"),
            class_injected_codes: injected(am, &decl.attrs, "sts_inject_into_class"),
        })
    }
}
