//! C++ glue emission.
//!
//! `AniCodeGenerator` walks the group package by package. For each package
//! it writes the conversion headers of its declarations, then the entry
//! points of its functions and interface methods, then the registration of
//! everything it emitted; `ani_constructor.cpp` comes last.

mod conversions;
mod functions;
pub mod output;
pub mod registration;
pub mod writer;

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use ani_bindgen_runtime::ScopeKind;

pub use output::OutputManager;
pub use registration::{NativeFuncInfo, PackageRegistration, RegisterInfo};
pub use writer::CSourceWriter;

use crate::analysis::AnalysisManager;
use crate::error::{Diagnostic, GenError, GenResult, Severity};
use crate::ir::PackageId;

/// Path of the process-wide registration entry point
pub const CONSTRUCTOR_PATH: &str = "src/ani_constructor.cpp";

// ========== Per-package state ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EmissionPhase {
    Pending,
    FunctionsEmitted,
    InterfacesEmitted,
    RegistrationEmitted,
    Done,
}

impl EmissionPhase {
    fn next(self) -> Option<Self> {
        match self {
            EmissionPhase::Pending => Some(EmissionPhase::FunctionsEmitted),
            EmissionPhase::FunctionsEmitted => Some(EmissionPhase::InterfacesEmitted),
            EmissionPhase::InterfacesEmitted => Some(EmissionPhase::RegistrationEmitted),
            EmissionPhase::RegistrationEmitted => Some(EmissionPhase::Done),
            EmissionPhase::Done => None,
        }
    }
}

/// Progress of one package, with the symbols it has emitted so far
#[derive(Debug)]
pub struct PackageEmission {
    package: String,
    phase: EmissionPhase,
    emitted: HashSet<String>,
}

impl PackageEmission {
    pub fn new<S: Into<String>>(package: S) -> Self {
        Self {
            package: package.into(),
            phase: EmissionPhase::Pending,
            emitted: HashSet::new(),
        }
    }

    pub fn phase(&self) -> EmissionPhase {
        self.phase
    }

    /// Move to `phase`, which must directly follow the current one
    pub fn advance(&mut self, phase: EmissionPhase) -> GenResult<()> {
        if self.phase.next() != Some(phase) {
            return Err(GenError::internal(format!(
                "package {} cannot move from {:?} to {:?}",
                self.package, self.phase, phase
            )));
        }
        self.phase = phase;
        Ok(())
    }

    pub fn record(&mut self, symbol: &str) {
        self.emitted.insert(symbol.to_string());
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.emitted.contains(symbol)
    }

    /// Registration may only refer to symbols already emitted
    fn check_registered(&self, infos: &[RegisterInfo]) -> GenResult<()> {
        for member in infos.iter().flat_map(|i| &i.members) {
            if !self.contains(&member.symbol) {
                return Err(GenError::internal(format!(
                    "package {} registers {} before emitting it",
                    self.package, member.symbol
                )));
            }
        }
        Ok(())
    }
}

// ========== Run summary ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenStats {
    pub packages: usize,
    pub functions: usize,
    pub methods: usize,
    pub conversion_files: usize,
    pub diagnostics: usize,
}

impl GenStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: &GenStats) {
        self.packages += other.packages;
        self.functions += other.functions;
        self.methods += other.methods;
        self.conversion_files += other.conversion_files;
        self.diagnostics += other.diagnostics;
    }
}

impl fmt::Display for GenStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packages, {} functions, {} methods, {} conversion files, {} diagnostics",
            self.packages, self.functions, self.methods, self.conversion_files, self.diagnostics
        )
    }
}

/// Result of a successful run; nothing is on disk until `output` is flushed
#[derive(Debug)]
pub struct Generation {
    pub output: OutputManager,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: GenStats,
    pub registrations: Vec<PackageRegistration>,
}

impl Generation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

// ========== Generator ==========

#[derive(Debug)]
pub struct AniCodeGenerator<'g> {
    am: AnalysisManager<'g>,
    output: OutputManager,
    stats: GenStats,
    registrations: Vec<PackageRegistration>,
}

impl<'g> AniCodeGenerator<'g> {
    pub fn new(am: AnalysisManager<'g>) -> Self {
        let output = OutputManager::new(&am.config().indent);
        Self {
            am,
            output,
            stats: GenStats::new(),
            registrations: Vec::new(),
        }
    }

    pub fn analysis(&mut self) -> &mut AnalysisManager<'g> {
        &mut self.am
    }

    pub fn run(mut self) -> GenResult<Generation> {
        let group = self.am.group();
        for pkg in group.package_ids() {
            self.gen_package(pkg)?;
        }
        let w = self.output.create_or_get(CONSTRUCTOR_PATH, false);
        registration::emit_constructor(w, &self.registrations);

        let diagnostics = self.am.into_diagnostics().into_vec();
        self.stats.diagnostics = diagnostics.len();
        Ok(Generation {
            output: self.output,
            diagnostics,
            stats: self.stats,
            registrations: self.registrations,
        })
    }

    fn gen_package(&mut self, pkg: PackageId) -> GenResult<()> {
        let group = self.am.group();
        let package = group.package(pkg);
        let info = self.am.package_info(pkg)?;
        debug!(package = %package.name, scope = %info.impl_desc, "generating package");
        let mut state = PackageEmission::new(package.name.clone());

        for &id in &package.enums {
            self.am.enum_info(id)?;
        }
        for &id in &package.ifaces {
            conversions::gen_iface(&mut self.am, &mut self.output, id)?;
        }
        for &id in &package.structs {
            conversions::gen_struct(&mut self.am, &mut self.output, id)?;
        }
        for &id in &package.unions {
            conversions::gen_union(&mut self.am, &mut self.output, id)?;
        }
        self.stats.conversion_files +=
            2 * (package.ifaces.len() + package.structs.len() + package.unions.len());

        let source_path = format!("src/{}", info.source);
        let cpp = self.am.cpp();
        let w = self.output.create_or_get(&source_path, false);
        w.include(&info.header);
        w.include(&cpp.user_header(pkg));
        if !package.ifaces.is_empty() {
            w.include("taihe/object.hpp");
        }

        let mut funcs = Vec::with_capacity(package.functions.len());
        for &id in &package.functions {
            let native = functions::gen_function(&mut self.am, w, id)?;
            state.record(&native.symbol);
            funcs.push(native);
        }
        self.stats.functions += funcs.len();
        state.advance(EmissionPhase::FunctionsEmitted)?;

        let mut infos = vec![RegisterInfo::new(info.scope, info.impl_desc.clone(), funcs)?];
        for &id in &package.ifaces {
            let iface_info = self.am.iface_info(id)?;
            let mut members = Vec::new();
            for &ancestor in &iface_info.ancestors {
                for &method in &group.iface(ancestor).methods {
                    let native = functions::gen_method(&mut self.am, w, id, ancestor, method)?;
                    state.record(&native.symbol);
                    members.push(native);
                }
            }
            self.stats.methods += members.len();
            let finalizer = functions::gen_finalizer(&self.am, w, id);
            state.record(&finalizer.symbol);
            members.push(finalizer);
            infos.push(RegisterInfo::new(
                ScopeKind::Class,
                iface_info.impl_desc.clone(),
                members,
            )?);
        }
        state.advance(EmissionPhase::InterfacesEmitted)?;

        let registration = PackageRegistration {
            package: package.name.clone(),
            cpp_ns: info.cpp_ns.clone(),
            header: info.header.clone(),
            infos,
        };
        state.check_registered(&registration.infos)?;
        registration.emit_register(w);
        let header = self
            .output
            .create_or_get(&format!("include/{}", info.header), true);
        registration.emit_header(header);
        state.advance(EmissionPhase::RegistrationEmitted)?;

        debug!(
            package = %package.name,
            members = registration.member_count(),
            "registered package"
        );
        self.registrations.push(registration);
        self.stats.packages += 1;
        state.advance(EmissionPhase::Done)
    }
}
