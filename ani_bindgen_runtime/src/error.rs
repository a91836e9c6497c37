//! Error types for ANI marshalling
//!
//! Everything a conversion can run into at runtime: a value of the wrong
//! kind, a class or property that does not exist, an out of range index.

use thiserror::Error;

/// Runtime error type
#[derive(Debug, Error)]
pub enum AniError {
    /// Value does not have the expected kind
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Class, enum or module lookup failed
    #[error("ClassNotFound: {0}")]
    ClassNotFound(String),

    /// Property not present on an object
    #[error("PropertyError: property {0} not found on {1}")]
    PropertyError(String, String),

    /// Index out of bounds
    #[error("BoundsError: attempt to access index {index} of array with length {length}")]
    BoundsError {
        /// Attempted index
        index: usize,
        /// Array length
        length: usize,
    },

    /// Module function missing or failing
    #[error("FunctionError: {0}")]
    FunctionError(String),

    /// No union variant accepted the value
    #[error("NoMatchingVariant: {0}")]
    NoMatchingVariant(String),

    /// Shape with no runtime conversion
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Native binding failed
    #[error("BindError: {0}")]
    BindError(String),
}

impl AniError {
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        AniError::TypeError(msg.into())
    }

    pub fn class_not_found<S: Into<String>>(desc: S) -> Self {
        AniError::ClassNotFound(desc.into())
    }

    pub fn property_error<S1: Into<String>, S2: Into<String>>(name: S1, class: S2) -> Self {
        AniError::PropertyError(name.into(), class.into())
    }

    pub fn bounds_error(index: usize, length: usize) -> Self {
        AniError::BoundsError { index, length }
    }

    pub fn function_error<S: Into<String>>(msg: S) -> Self {
        AniError::FunctionError(msg.into())
    }

    pub fn no_matching_variant<S: Into<String>>(union: S) -> Self {
        AniError::NoMatchingVariant(union.into())
    }

    pub fn unsupported<S: Into<String>>(what: S) -> Self {
        AniError::Unsupported(what.into())
    }

    pub fn bind_error<S: Into<String>>(msg: S) -> Self {
        AniError::BindError(msg.into())
    }
}

/// Result type for marshalling operations
pub type AniResult<T> = Result<T, AniError>;
