//! Error types for binding generation.
//!
//! Two tiers: `GenError` aborts the run (bad input document, a binding
//! scope that cannot be expressed, I/O), while `Diagnostic` records an IDL
//! problem the generator can route around with a placeholder.

mod diagnostic;

pub use diagnostic::{Diagnostic, Diagnostics, Severity};

use thiserror::Error;

/// Fatal errors
#[derive(Debug, Error)]
pub enum GenError {
    /// Malformed or inconsistent input document
    #[error("invalid input: {0}")]
    Input(String),

    /// A named type that does not resolve to any declaration
    #[error("unresolved type `{name}` in package `{package}`")]
    UnresolvedType { name: String, package: String },

    /// A package or interface whose binding scope cannot be found
    #[error("cannot resolve binding scope for {0}")]
    ScopeLookup(String),

    /// Broken generator invariant
    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GenError {
    pub fn input<S: Into<String>>(msg: S) -> Self {
        GenError::Input(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        GenError::Internal(msg.into())
    }

    pub fn io<P: AsRef<std::path::Path>>(path: P, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for GenError {
    fn from(err: serde_json::Error) -> Self {
        GenError::Input(err.to_string())
    }
}

impl From<toml::de::Error> for GenError {
    fn from(err: toml::de::Error) -> Self {
        GenError::Config(err.to_string())
    }
}

pub type GenResult<T> = Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = GenError::UnresolvedType {
            name: "Pointt".to_string(),
            package: "geo".to_string(),
        };
        assert_eq!(err.to_string(), "unresolved type `Pointt` in package `geo`");
        assert_eq!(
            GenError::ScopeLookup("package geo".to_string()).to_string(),
            "cannot resolve binding scope for package geo"
        );
    }

    #[test]
    fn test_from_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(GenError::from(err), GenError::Input(_)));
    }
}
