//! Native function registration.
//!
//! Every emitted entry point is recorded with the binding scope it belongs
//! to. Each package then gets an `ANIRegister` function binding its scopes,
//! and `ani_constructor.cpp` calls every package's registration in order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use ani_bindgen_runtime::{AniEnv, AniResult, ScopeKind};

use super::writer::CSourceWriter;
use crate::error::{GenError, GenResult};

/// Class, module and namespace descriptors: `Lseg/seg;`
static SCOPE_DESC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^L[^/;\s]+(/[^/;\s]+)*;$").expect("valid scope regex"));

/// One managed member backed by a native symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeFuncInfo {
    pub sts_name: String,
    pub symbol: String,
}

impl NativeFuncInfo {
    pub fn new<S1: Into<String>, S2: Into<String>>(sts_name: S1, symbol: S2) -> Self {
        Self {
            sts_name: sts_name.into(),
            symbol: symbol.into(),
        }
    }
}

/// Members bound together into one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterInfo {
    pub scope: ScopeKind,
    pub impl_desc: String,
    pub members: Vec<NativeFuncInfo>,
}

impl RegisterInfo {
    /// Fails when `impl_desc` is not a descriptor the runtime can look up
    pub fn new<S: Into<String>>(
        scope: ScopeKind,
        impl_desc: S,
        members: Vec<NativeFuncInfo>,
    ) -> GenResult<Self> {
        let impl_desc = impl_desc.into();
        if !SCOPE_DESC.is_match(&impl_desc) {
            return Err(GenError::ScopeLookup(format!(
                "{} `{}`",
                scope.ani_type(),
                impl_desc
            )));
        }
        Ok(Self {
            scope,
            impl_desc,
            members,
        })
    }
}

/// Registration of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRegistration {
    pub package: String,
    pub cpp_ns: String,
    /// Header declaring `ANIRegister`, relative to `include/`
    pub header: String,
    pub infos: Vec<RegisterInfo>,
}

impl PackageRegistration {
    /// Replay the bindings against an environment, as `ANIRegister` does
    pub fn register(&self, env: &mut dyn AniEnv) -> AniResult<()> {
        for info in self.infos.iter().filter(|i| !i.members.is_empty()) {
            let names: Vec<String> = info.members.iter().map(|m| m.sts_name.clone()).collect();
            env.bind_native_functions(info.scope, &info.impl_desc, &names)?;
        }
        Ok(())
    }

    /// Total bound members
    pub fn member_count(&self) -> usize {
        self.infos.iter().map(|i| i.members.len()).sum()
    }

    pub fn emit_header(&self, w: &mut CSourceWriter) {
        w.include("taihe/runtime.hpp");
        w.indented(&format!("namespace {} {{", self.cpp_ns), "}", |w| {
            w.write_line("ani_status ANIRegister(ani_env *env);");
        });
    }

    pub fn emit_register(&self, w: &mut CSourceWriter) {
        w.indented(&format!("namespace {} {{", self.cpp_ns), "}", |w| {
            w.indented("ani_status ANIRegister(ani_env *env) {", "}", |w| {
                for info in self.infos.iter().filter(|i| !i.members.is_empty()) {
                    emit_bind_block(w, info);
                }
                w.write_line("return ANI_OK;");
            });
        });
    }
}

fn emit_bind_block(w: &mut CSourceWriter, info: &RegisterInfo) {
    w.indented("{", "}", |w| {
        w.write_line(&format!("{} scope;", info.scope.ani_type()));
        w.indented(
            &format!(
                "if (ANI_OK != env->{}(\"{}\", &scope)) {{",
                info.scope.find(),
                info.impl_desc
            ),
            "}",
            |w| w.write_line("return ANI_ERROR;"),
        );
        w.indented(
            &format!("{} methods[] = {{", info.scope.member_type()),
            "};",
            |w| {
                for member in &info.members {
                    w.write_line(&format!(
                        "{{\"{}\", nullptr, reinterpret_cast<void*>({})}},",
                        member.sts_name, member.symbol
                    ));
                }
            },
        );
        w.indented(
            &format!(
                "if (ANI_OK != env->{}(scope, methods, sizeof(methods) / sizeof({}))) {{",
                info.scope.bind(),
                info.scope.member_type()
            ),
            "}",
            |w| w.write_line("return ANI_ERROR;"),
        );
    });
}

/// `ANI_Constructor`, calling every package's registration in order
pub fn emit_constructor(w: &mut CSourceWriter, packages: &[PackageRegistration]) {
    w.include("<iostream>");
    for package in packages {
        w.include(&package.header);
    }
    w.indented(
        "ANI_EXPORT ani_status ANI_Constructor(ani_vm *vm, uint32_t *result) {",
        "}",
        |w| {
            w.write_line("ani_env *env;");
            w.indented(
                "if (ANI_OK != vm->GetEnv(ANI_VERSION_1, &env)) {",
                "}",
                |w| w.write_line("return ANI_ERROR;"),
            );
            for package in packages {
                let register = format!("{}::ANIRegister", package.cpp_ns);
                w.indented(&format!("if (ANI_OK != {}(env)) {{", register), "}", |w| {
                    w.write_line(&format!(
                        "std::cerr << \"Error from {}\" << std::endl;",
                        register
                    ));
                    w.write_line("return ANI_ERROR;");
                });
            }
            w.write_line("*result = ANI_VERSION_1;");
            w.write_line("return ANI_OK;");
        },
    );
}
