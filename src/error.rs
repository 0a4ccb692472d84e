//! Error types for conversion resolution.

use crate::type_hash::TypeHash;
use thiserror::Error;

/// Errors raised by the throwing conversion entry points.
///
/// The non-throwing [`try_convert`](crate::resolver::Resolver::try_convert)
/// path never surfaces these; it maps every failure to `(false, default)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// A required argument was absent or invalid.
    #[error("invalid argument: {what}")]
    InvalidArgument { what: String },

    /// The requested target type can never hold a value.
    ///
    /// Raised for unbound generic templates, which have no concrete layout.
    #[error("invalid conversion target '{name}' ({target}): unbound template types cannot hold values")]
    InvalidTarget { target: TypeHash, name: String },

    /// An absent value was requested as a non-nullable value type.
    #[error("cannot convert null to value type {target}")]
    NullToValueType { target: TypeHash },

    /// Every strategy in the chain was exhausted without producing a value.
    #[error("no conversion exists from {from} to {to}")]
    UnsupportedConversion { from: TypeHash, to: TypeHash },
}

/// Convenience alias used throughout the resolver.
pub type ConversionResult<T> = Result<T, ConversionError>;
