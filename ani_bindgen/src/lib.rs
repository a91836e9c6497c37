// Library code reports through tracing and diagnostics, never stderr.
// The CLI binary (bin/) prints user-facing messages.
#![deny(clippy::print_stderr)]

//! Generates the C++ glue that exposes IDL packages to a managed runtime
//! through ANI: per-declaration conversion headers, native entry points,
//! per-package registration and the process-wide `ANI_Constructor`.

// Core modules
pub mod abi;
pub mod analysis;
pub mod config;
pub mod error;
pub mod ir;
pub mod span;

// Emission
pub mod codegen;

pub use analysis::types::marshal_layouts;
pub use analysis::AnalysisManager;
pub use codegen::{AniCodeGenerator, GenStats, Generation, OutputManager};
pub use config::GeneratorConfig;
pub use error::{Diagnostic, GenError, GenResult, Severity};
pub use ir::{load_group, load_group_from_path, PackageGroup};

use tracing::info;

/// Run every analysis and emitter over `group`.
///
/// Fatal problems return `Err` before anything is written; recoverable IDL
/// problems are collected in `Generation::diagnostics` and the affected
/// types fall back to placeholders.
#[tracing::instrument(skip_all, fields(packages = group.packages.len()))]
pub fn generate(group: &PackageGroup, config: GeneratorConfig) -> GenResult<Generation> {
    config.validate()?;
    let am = AnalysisManager::new(group, config);
    let generation = AniCodeGenerator::new(am).run()?;
    info!(stats = %generation.stats, "generation finished");
    Ok(generation)
}
