//! Symbol mangling for generated native functions.
//!
//! `encode(segments, kind)` is injective over (segments, kind): every
//! segment is length-prefixed, and the kind tag contains no digits.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// Entry point of a global function
    Function,
    /// Entry point of an interface method
    Method,
    /// Managed-to-native conversion of a struct, union or interface
    FromAni,
    /// Native-to-managed conversion of a struct, union or interface
    IntoAni,
    /// Interface finalizer
    Finalizer,
}

impl DeclKind {
    fn tag(self) -> &'static str {
        match self {
            DeclKind::Function => "func",
            DeclKind::Method => "method",
            DeclKind::FromAni => "from",
            DeclKind::IntoAni => "into",
            DeclKind::Finalizer => "finalize",
        }
    }
}

pub fn encode<S: AsRef<str>>(segments: &[S], kind: DeclKind) -> String {
    let mut out = format!("ani_{}_", kind.tag());
    for segment in segments {
        let segment = segment.as_ref();
        // Writing into a String cannot fail.
        let _ = write!(out, "{}{}", segment.len(), segment);
    }
    out
}
