//! Native-side naming: symbol mangling and C++ spellings of IDL types.

pub mod cpp;
pub mod mangle;

pub use cpp::CppNames;
pub use mangle::{encode, DeclKind};
