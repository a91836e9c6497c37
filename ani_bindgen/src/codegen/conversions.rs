//! Per-declaration conversion functions.
//!
//! Each struct, union and interface gets `<pkg>.<Name>.ani.0.h` with the
//! prototypes of its from/into functions and `<pkg>.<Name>.ani.1.h` with
//! their inline bodies. Type conversions elsewhere include the `.1.h`.

use std::collections::HashSet;

use super::output::OutputManager;
use super::writer::CSourceWriter;
use crate::abi::{encode, CppNames, DeclKind};
use crate::analysis::{AnalysisManager, UnionFieldKind, UnionFinalField};
use crate::error::GenResult;
use crate::ir::{IfaceId, PackageGroup, PackageId, StructId, Type, UnionId};

/// Paths and function names of one declaration's conversions
struct ConversionFiles {
    decl_path: String,
    impl_path: String,
    from_func: String,
    into_func: String,
}

impl ConversionFiles {
    fn new(group: &PackageGroup, pkg: PackageId, name: &str) -> Self {
        let package = group.package(pkg);
        let mut segments = package.segments();
        segments.push(name.to_string());
        ConversionFiles {
            decl_path: format!("include/{}.{}.ani.0.h", package.name, name),
            impl_path: format!("include/{}.{}.ani.1.h", package.name, name),
            from_func: encode(&segments, DeclKind::FromAni),
            into_func: encode(&segments, DeclKind::IntoAni),
        }
    }

    /// Write the prototypes header and open the bodies header
    fn open<'o>(
        &self,
        out: &'o mut OutputManager,
        cpp: CppNames<'_>,
        pkg: PackageId,
        name: &str,
        prototypes: [String; 2],
    ) -> &'o mut CSourceWriter {
        let decl = out.create_or_get(&self.decl_path, true);
        decl.include("taihe/runtime.hpp");
        decl.include(&cpp.decl_header(pkg, name));
        for prototype in &prototypes {
            decl.write_line(&format!("{};", prototype));
        }

        let body = out.create_or_get(&self.impl_path, true);
        body.include(self.decl_path.trim_start_matches("include/"));
        body.include(&cpp.impl_header(pkg, name));
        body
    }
}

/// `reinterpret_cast` target receiving a value of base type `hint`
fn out_ptr(hint: &str, var: &str) -> String {
    format!("reinterpret_cast<ani_{}*>(&{})", hint, var)
}

// ========== Structs ==========

fn field_var(path: &str) -> String {
    path.replace('.', "_")
}

/// Brace initializer rebuilding the nested `@extends` members
fn struct_initializer(
    group: &PackageGroup,
    cpp: CppNames<'_>,
    id: StructId,
    prefix: &str,
    present: &HashSet<String>,
) -> String {
    let decl = group.struct_decl(id);
    let members: Vec<String> = decl
        .fields
        .iter()
        .map(|field| {
            let path = format!("{}{}", prefix, field.name);
            if field.attrs.has("extends") {
                let nested = format!("{}.", path);
                match group.type_ref(field.ty).ty {
                    Type::Struct(parent) if present.iter().any(|p| p.starts_with(&nested)) => {
                        struct_initializer(group, cpp, parent, &nested, present)
                    }
                    _ => "{}".to_string(),
                }
            } else if present.contains(&path) {
                format!("std::move(cpp_field_{})", field_var(&path))
            } else {
                "{}".to_string()
            }
        })
        .collect();
    format!("{}{{{}}}", cpp.struct_full(id), members.join(", "))
}

pub(crate) fn gen_struct(
    am: &mut AnalysisManager<'_>,
    out: &mut OutputManager,
    id: StructId,
) -> GenResult<()> {
    let group = am.group();
    let decl = group.struct_decl(id);
    let cpp = am.cpp();
    let info = am.struct_info(id)?;
    let files = ConversionFiles::new(group, decl.package, &decl.name);
    let owner = cpp.struct_full(id);

    let mut fields = Vec::with_capacity(info.final_fields.len());
    for field in &info.final_fields {
        let field_owner = field.parts.last().map_or(id, |part| part.owner);
        let ty = am.type_info(field.ty, group.struct_decl(field_owner).package)?;
        fields.push((field, ty));
    }
    let present: HashSet<String> = info.final_fields.iter().map(|f| f.path.clone()).collect();

    let from_sig = format!(
        "{} {}([[maybe_unused]] ani_env* env, [[maybe_unused]] ani_object ani_obj)",
        owner, files.from_func
    );
    let into_sig = format!(
        "ani_object {}([[maybe_unused]] ani_env* env, [[maybe_unused]] {} const& cpp_obj)",
        files.into_func, owner
    );
    let w = files.open(
        out,
        cpp,
        decl.package,
        &decl.name,
        [from_sig.clone(), into_sig.clone()],
    );

    w.indented(&format!("inline {} {{", from_sig), "}", |w| {
        for (field, ty) in &fields {
            let var = field_var(&field.path);
            w.write_line(&format!("{} ani_field_{};", ty.ani_type, var));
            w.write_line(&format!(
                "env->Object_GetPropertyByName_{}(ani_obj, \"{}\", {});",
                ty.ani_type.suffix(),
                field.name,
                out_ptr(ty.ani_type.base().hint(), &format!("ani_field_{}", var))
            ));
            ty.from_ani(
                w,
                "env",
                &format!("ani_field_{}", var),
                &format!("cpp_field_{}", var),
            );
        }
        w.write_line(&format!(
            "return {};",
            struct_initializer(group, cpp, id, "", &present)
        ));
    });

    w.indented(&format!("inline {} {{", into_sig), "}", |w| {
        let mut args = Vec::with_capacity(fields.len());
        for (field, ty) in &fields {
            let var = format!("ani_field_{}", field_var(&field.path));
            ty.into_ani(w, "env", &format!("cpp_obj.{}", field.path), &var);
            args.push(var);
        }
        w.write_line("ani_class ani_obj_cls;");
        w.write_line(&format!(
            "env->FindClass(\"{}\", &ani_obj_cls);",
            info.impl_desc
        ));
        w.write_line("ani_method ani_obj_ctor;");
        w.write_line("env->Class_FindMethod(ani_obj_cls, \"<ctor>\", nullptr, &ani_obj_ctor);");
        w.write_line("ani_object ani_obj;");
        let mut call = vec!["ani_obj_cls", "ani_obj_ctor", "&ani_obj"];
        call.extend(args.iter().map(String::as_str));
        w.write_line(&format!("env->Object_New({});", call.join(", ")));
        w.write_line("return ani_obj;");
    });
    Ok(())
}

// ========== Unions ==========

/// Construction of the variant `field`, nesting through inner unions
fn union_construct(cpp: CppNames<'_>, field: &UnionFinalField, payload: Option<&str>) -> String {
    let mut expr = payload.map(|p| format!("std::move({})", p));
    for (part, name) in field.parts.iter().zip(&field.names).rev() {
        let full = cpp.union_full(part.owner);
        let tag = format!("::taihe::static_tag<{}::tag_t::{}>", full, name);
        expr = Some(match expr {
            Some(inner) => format!("{}({}, {})", full, tag, inner),
            None => format!("{}({})", full, tag),
        });
    }
    expr.unwrap_or_default()
}

pub(crate) fn gen_union(
    am: &mut AnalysisManager<'_>,
    out: &mut OutputManager,
    id: UnionId,
) -> GenResult<()> {
    let group = am.group();
    let decl = group.union_decl(id);
    let cpp = am.cpp();
    let info = am.union_info(id)?;
    let files = ConversionFiles::new(group, decl.package, &decl.name);
    let owner = cpp.union_full(id);

    let mut variants = Vec::with_capacity(info.final_fields.len());
    for field in &info.final_fields {
        let ty = match field.kind {
            UnionFieldKind::Value(ty) => {
                let field_owner = field.parts.last().map_or(id, |part| part.owner);
                Some(am.type_info(ty, group.union_decl(field_owner).package)?)
            }
            _ => None,
        };
        variants.push((field, ty));
    }
    let mut direct = Vec::with_capacity(info.fields.len());
    for (name, kind) in &info.fields {
        let ty = match kind {
            UnionFieldKind::Value(ty) => Some(am.type_info(*ty, decl.package)?),
            _ => None,
        };
        direct.push((name, *kind, ty));
    }

    let from_sig = format!(
        "{} {}([[maybe_unused]] ani_env* env, [[maybe_unused]] ani_ref ani_value)",
        owner, files.from_func
    );
    let into_sig = format!(
        "ani_ref {}([[maybe_unused]] ani_env* env, [[maybe_unused]] {} const& cpp_value)",
        files.into_func, owner
    );
    let w = files.open(
        out,
        cpp,
        decl.package,
        &decl.name,
        [from_sig.clone(), into_sig.clone()],
    );

    w.indented(&format!("inline {} {{", from_sig), "}", |w| {
        for (field, ty) in &variants {
            let flat = field.flat_name();
            let test = format!("ani_is_{}", flat);
            w.write_line(&format!("ani_boolean {};", test));
            match (field.kind, ty) {
                (UnionFieldKind::Value(_), Some(ty)) => {
                    w.write_line(&format!("ani_class ani_cls_{};", flat));
                    w.write_line(&format!(
                        "env->FindClass(\"{}\", &ani_cls_{});",
                        ty.type_desc_boxed(),
                        flat
                    ));
                    w.write_line(&format!(
                        "env->Object_InstanceOf(static_cast<ani_object>(ani_value), ani_cls_{}, &{});",
                        flat, test
                    ));
                    w.indented(&format!("if ({}) {{", test), "}", |w| {
                        let cpp_var = format!("cpp_field_{}", flat);
                        ty.from_ani_boxed(w, "env", "ani_value", &cpp_var);
                        w.write_line(&format!(
                            "return {};",
                            union_construct(cpp, field, Some(&cpp_var))
                        ));
                    });
                }
                (kind, _) => {
                    let check = if kind == UnionFieldKind::Undefined {
                        "Reference_IsUndefined"
                    } else {
                        "Reference_IsNull"
                    };
                    w.write_line(&format!("env->{}(ani_value, &{});", check, test));
                    w.indented(&format!("if ({}) {{", test), "}", |w| {
                        w.write_line(&format!(
                            "return {};",
                            union_construct(cpp, field, None)
                        ));
                    });
                }
            }
        }
        w.write_line("__builtin_unreachable();");
    });

    w.indented(&format!("inline {} {{", into_sig), "}", |w| {
        w.write_line("ani_ref ani_value;");
        w.indented("switch (cpp_value.get_tag()) {", "}", |w| {
            for (name, kind, ty) in &direct {
                w.indented(&format!("case {}::tag_t::{}: {{", owner, name), "}", |w| {
                    match (kind, ty) {
                        (UnionFieldKind::Value(_), Some(ty)) => {
                            let var = format!("ani_field_{}", name);
                            ty.into_ani_boxed(
                                w,
                                "env",
                                &format!("cpp_value.get_{}_ref()", name),
                                &var,
                            );
                            w.write_line(&format!("ani_value = {};", var));
                        }
                        (UnionFieldKind::Undefined, _) => {
                            w.write_line("env->GetUndefined(&ani_value);")
                        }
                        _ => w.write_line("env->GetNull(&ani_value);"),
                    }
                    w.write_line("break;");
                });
            }
        });
        w.write_line("return ani_value;");
    });
    Ok(())
}

// ========== Interfaces ==========

pub(crate) fn gen_iface(
    am: &mut AnalysisManager<'_>,
    out: &mut OutputManager,
    id: IfaceId,
) -> GenResult<()> {
    let group = am.group();
    let decl = group.iface(id);
    let cpp = am.cpp();
    let info = am.iface_info(id)?;
    let files = ConversionFiles::new(group, decl.package, &decl.name);
    let owner = cpp.iface_full(id);

    // Every method of every ancestor, mapped from the declaring package
    let mut methods = Vec::new();
    for &ancestor in &info.ancestors {
        for &method in &group.iface(ancestor).methods {
            let m = group.method(method);
            let naming = am.method_info(method);
            let mut params = Vec::with_capacity(m.params.len());
            for param in &m.params {
                params.push((param.name.clone(), am.type_info(param.ty, decl.package)?));
            }
            let ret = match m.ret {
                Some(ty) => Some(am.type_info(ty, decl.package)?),
                None => None,
            };
            methods.push((m.name.clone(), naming.ani_method_name.clone(), params, ret));
        }
    }

    let from_sig = format!(
        "{} {}([[maybe_unused]] ani_env* env, [[maybe_unused]] ani_object ani_obj)",
        owner, files.from_func
    );
    let into_sig = format!(
        "ani_object {}([[maybe_unused]] ani_env* env, [[maybe_unused]] {} cpp_obj)",
        files.into_func, owner
    );
    let w = files.open(
        out,
        cpp,
        decl.package,
        &decl.name,
        [from_sig.clone(), into_sig.clone()],
    );

    w.indented(&format!("inline {} {{", from_sig), "}", |w| {
        w.indented("struct cpp_impl_t {", "};", |w| {
            w.write_line("ani_ref ref;");
            w.indented("cpp_impl_t(ani_object obj) {", "}", |w| {
                w.write_line("::taihe::get_env()->GlobalReference_Create(obj, &this->ref);");
            });
            w.indented("~cpp_impl_t() {", "}", |w| {
                w.write_line("::taihe::get_env()->GlobalReference_Delete(this->ref);");
            });
            for (name, ani_name, params, ret) in &methods {
                let cpp_params: Vec<String> = params
                    .iter()
                    .map(|(p, ty)| format!("{} cpp_arg_{}", ty.cpp_param, p))
                    .collect();
                let cpp_ret = ret.as_ref().map_or("void", |r| r.cpp_owner.as_str());
                w.indented(
                    &format!("{} {}({}) {{", cpp_ret, name, cpp_params.join(", ")),
                    "}",
                    |w| {
                        w.write_line("ani_env* env = ::taihe::get_env();");
                        let mut call = vec![
                            "static_cast<ani_object>(this->ref)".to_string(),
                            format!("\"{}\"", ani_name),
                            "nullptr".to_string(),
                        ];
                        for (p, ty) in params {
                            ty.into_ani(w, "env", &format!("cpp_arg_{}", p), &format!("ani_arg_{}", p));
                        }
                        match ret {
                            Some(ret) => {
                                w.write_line(&format!("{} ani_result;", ret.ani_type));
                                call.push(out_ptr(ret.ani_type.base().hint(), "ani_result"));
                                call.extend(params.iter().map(|(p, _)| format!("ani_arg_{}", p)));
                                w.write_line(&format!(
                                    "env->Object_CallMethodByName_{}({});",
                                    ret.ani_type.suffix(),
                                    call.join(", ")
                                ));
                                ret.from_ani(w, "env", "ani_result", "cpp_result");
                                w.write_line("return cpp_result;");
                            }
                            None => {
                                call.extend(params.iter().map(|(p, _)| format!("ani_arg_{}", p)));
                                w.write_line(&format!(
                                    "env->Object_CallMethodByName_Void({});",
                                    call.join(", ")
                                ));
                            }
                        }
                    },
                );
            }
        });
        w.write_line(&format!(
            "return ::taihe::make_holder<cpp_impl_t, {}>(ani_obj);",
            owner
        ));
    });

    w.indented(&format!("inline {} {{", into_sig), "}", |w| {
        for part in ["vtbl", "data"] {
            w.write_line(&format!(
                "ani_long ani_{p}_ptr = reinterpret_cast<ani_long>(cpp_obj.m_handle.{p}_ptr);",
                p = part
            ));
        }
        w.write_line("cpp_obj.m_handle.data_ptr = nullptr;");
        w.write_line("ani_class ani_obj_cls;");
        w.write_line(&format!(
            "env->FindClass(\"{}\", &ani_obj_cls);",
            info.impl_desc
        ));
        w.write_line("ani_method ani_obj_ctor;");
        w.write_line("env->Class_FindMethod(ani_obj_cls, \"<ctor>\", \"JJ:V\", &ani_obj_ctor);");
        w.write_line("ani_object ani_obj;");
        w.write_line(
            "env->Object_New(ani_obj_cls, ani_obj_ctor, &ani_obj, ani_vtbl_ptr, ani_data_ptr);",
        );
        w.write_line("return ani_obj;");
    });
    Ok(())
}
