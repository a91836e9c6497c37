//! Native entry points of global functions and interface methods.

use std::rc::Rc;

use super::registration::NativeFuncInfo;
use super::writer::CSourceWriter;
use crate::abi::{encode, DeclKind};
use crate::analysis::{AnalysisManager, TypeAniInfo};
use crate::error::GenResult;
use crate::ir::{FuncId, IfaceId, MethodId, PackageId, Param, TypeRefId};

/// Parameter and result mappings of one entry point, seen from `pkg`
struct Signature {
    params: Vec<(String, Rc<TypeAniInfo>)>,
    ret: Option<Rc<TypeAniInfo>>,
}

impl Signature {
    fn analyze(
        am: &mut AnalysisManager<'_>,
        pkg: PackageId,
        params: &[Param],
        ret: Option<TypeRefId>,
    ) -> GenResult<Self> {
        let mut mapped = Vec::with_capacity(params.len());
        for param in params {
            mapped.push((param.name.clone(), am.type_info(param.ty, pkg)?));
        }
        let ret = match ret {
            Some(ty) => Some(am.type_info(ty, pkg)?),
            None => None,
        };
        Ok(Signature { params: mapped, ret })
    }

    fn ani_ret(&self) -> String {
        self.ret
            .as_ref()
            .map_or_else(|| "void".to_string(), |r| r.ani_type.to_string())
    }

    fn ani_params(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|(name, ty)| format!("{} ani_arg_{}", ty.ani_type, name))
            .collect()
    }

    fn cpp_args(&self) -> String {
        let args: Vec<String> = self
            .params
            .iter()
            .map(|(name, _)| format!("cpp_arg_{}", name))
            .collect();
        args.join(", ")
    }

    /// Convert arguments, run `call`, then check for a pending error
    /// before converting the result back
    fn emit_body(&self, w: &mut CSourceWriter, call: &str) {
        for (name, ty) in &self.params {
            ty.from_ani(
                w,
                "env",
                &format!("ani_arg_{}", name),
                &format!("cpp_arg_{}", name),
            );
        }
        match &self.ret {
            None => w.write_line(&format!("{};", call)),
            Some(ret) => {
                w.write_line(&format!("{} cpp_result = {};", ret.cpp_owner, call));
                w.indented("if (::taihe::has_error()) {", "}", |w| {
                    w.write_line(&format!("return {}{{}};", ret.ani_type));
                });
                ret.into_ani(w, "env", "cpp_result", "ani_result");
                w.write_line("return ani_result;");
            }
        }
    }
}

fn comment(am: &AnalysisManager<'_>, w: &mut CSourceWriter, qualified: &str) {
    if am.config().emit_comments {
        w.write_line(&format!("// {}", qualified));
    }
}

pub(crate) fn gen_function(
    am: &mut AnalysisManager<'_>,
    w: &mut CSourceWriter,
    id: FuncId,
) -> GenResult<NativeFuncInfo> {
    let group = am.group();
    let func = group.function(id);
    let package = group.package(func.package);
    let info = am.func_info(id);
    let sig = Signature::analyze(am, func.package, &func.params, func.ret)?;

    let mut segments = package.segments();
    segments.push(func.name.clone());
    let symbol = encode(&segments, DeclKind::Function);

    let mut params = vec!["[[maybe_unused]] ani_env *env".to_string()];
    params.extend(sig.ani_params());
    comment(am, w, &format!("{}.{}", package.name, func.name));
    let call = format!("{}({})", am.cpp().function(id), sig.cpp_args());
    w.indented(
        &format!("static {} {}({}) {{", sig.ani_ret(), symbol, params.join(", ")),
        "}",
        |w| {
            w.write_line("::taihe::set_env(env);");
            sig.emit_body(w, &call);
        },
    );
    w.blank_line();
    Ok(NativeFuncInfo::new(info.sts_native_name.clone(), symbol))
}

/// Entry point of `method`, declared on `ancestor`, bound on the class of `iface`
pub(crate) fn gen_method(
    am: &mut AnalysisManager<'_>,
    w: &mut CSourceWriter,
    iface: IfaceId,
    ancestor: IfaceId,
    method: MethodId,
) -> GenResult<NativeFuncInfo> {
    let group = am.group();
    let decl = group.iface(iface);
    let package = group.package(decl.package);
    let owner = group.iface(ancestor);
    let m = group.method(method);
    let info = am.method_info(method);
    let sig = Signature::analyze(am, decl.package, &m.params, m.ret)?;
    let cpp = am.cpp();

    let mut segments = package.segments();
    segments.push(decl.name.clone());
    segments.push(owner.name.clone());
    segments.push(m.name.clone());
    let symbol = encode(&segments, DeclKind::Method);

    let mut params = vec![
        "[[maybe_unused]] ani_env *env".to_string(),
        "[[maybe_unused]] ani_object object".to_string(),
    ];
    params.extend(sig.ani_params());
    comment(am, w, &format!("{}.{}.{}", package.name, decl.name, m.name));

    let weak = cpp.iface_weak(iface);
    let vtable = cpp.iface_vtable(iface);
    let call = format!(
        "{}(cpp_iface)->{}({})",
        cpp.iface_weak(ancestor),
        m.name,
        sig.cpp_args()
    );
    w.indented(
        &format!("static {} {}({}) {{", sig.ani_ret(), symbol, params.join(", ")),
        "}",
        |w| {
            w.write_line("::taihe::set_env(env);");
            for field in ["data", "vtbl"] {
                w.write_line(&format!("ani_long ani_{}_ptr;", field));
                w.write_line(&format!(
                    "env->Object_GetPropertyByName_Long(object, \"_{f}_ptr\", reinterpret_cast<ani_long*>(&ani_{f}_ptr));",
                    f = field
                ));
            }
            w.write_line(
                "DataBlockHead* cpp_data_ptr = reinterpret_cast<DataBlockHead*>(ani_data_ptr);",
            );
            w.write_line(&format!(
                "{v}* cpp_vtbl_ptr = reinterpret_cast<{v}*>(ani_vtbl_ptr);",
                v = vtable
            ));
            w.write_line(&format!(
                "{w} cpp_iface = {w}({{cpp_vtbl_ptr, cpp_data_ptr}});",
                w = weak
            ));
            sig.emit_body(w, &call);
        },
    );
    w.blank_line();
    Ok(NativeFuncInfo::new(info.sts_native_name.clone(), symbol))
}

/// Releases the native object behind a managed interface instance
pub(crate) fn gen_finalizer(
    am: &AnalysisManager<'_>,
    w: &mut CSourceWriter,
    iface: IfaceId,
) -> NativeFuncInfo {
    let group = am.group();
    let decl = group.iface(iface);
    let package = group.package(decl.package);
    let mut segments = package.segments();
    segments.push(decl.name.clone());
    let symbol = encode(&segments, DeclKind::Finalizer);

    comment(am, w, &format!("{}.{} finalizer", package.name, decl.name));
    w.indented(
        &format!(
            "static void {}([[maybe_unused]] ani_env *env, [[maybe_unused]] ani_class clazz, ani_long data_ptr) {{",
            symbol
        ),
        "}",
        |w| {
            w.write_line("::taihe::set_env(env);");
            w.write_line("::taihe::data_holder(reinterpret_cast<DataBlockHead*>(data_ptr));");
        },
    );
    w.blank_line();
    NativeFuncInfo::new("_finalize", symbol)
}
