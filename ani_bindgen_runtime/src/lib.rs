//! ANI runtime vocabulary for ani_bindgen
//!
//! This crate holds the pieces of the ANI (managed runtime native
//! interface) that both the generator and its tests need. It includes:
//!
//! - `abi` types: ANI type hints, scalar kinds, binding scopes
//! - `AniValue` / `NativeValue` for managed and native values
//! - `AniEnv` trait with a recording `MockEnv`
//! - `Shape` / `Layouts` describing what a conversion marshals
//! - `Marshaller` executing the from-native / into-native rules
//! - `AniError` for error handling

pub mod abi;
pub mod convert;
pub mod env;
pub mod error;
pub mod marshal;
pub mod shape;
pub mod value;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use ani_bindgen_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use super::abi::{AniBaseType, AniType, ScalarKind, ScopeKind};
    pub use super::env::{AniEnv, GlobalRef, MockEnv};
    pub use super::error::{AniError, AniResult};
    pub use super::marshal::{CallbackAdapter, IfaceHandle, Marshaller};
    pub use super::shape::{Layouts, Shape};
    pub use super::value::{AniValue, NativeValue};
}

pub use prelude::*;
