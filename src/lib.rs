//! Runtime type coercion with a pluggable converter registry.
//!
//! This crate resolves dynamic conversions between runtime values: given a
//! [`Value`] and a target [`TypeHash`], the [`Resolver`] walks a fixed chain
//! of strategies until one produces an instance of the target type.
//!
//! The chain, in priority order: null policy, assignability shortcut,
//! registered converter capabilities, the builtin conversion matrix,
//! conversion operator discovery, and an enum parse fallback. Capabilities
//! are registered process-wide in a [`ConverterRegistry`]; type metadata
//! (inheritance, operators, enum variants) lives in a [`TypeRegistry`].
//!
//! # Example
//!
//! ```
//! use coercion::{ConverterRegistry, Resolver, TypeRegistry, Value};
//! use coercion::type_hash::builtin;
//!
//! let types = TypeRegistry::new();
//! let converters = ConverterRegistry::new();
//! let resolver = Resolver::new(&types, &converters);
//!
//! let out = resolver.convert(&Value::String("42".into()), builtin::INT32)?;
//! assert_eq!(out, Value::Int32(42));
//!
//! // The non-throwing form maps failure to the target's default
//! let (ok, fallback) = resolver.try_convert(&Value::Null, builtin::INT32);
//! assert!(!ok);
//! assert_eq!(fallback, Value::Int32(0));
//! # Ok::<(), coercion::ConversionError>(())
//! ```

pub mod convert;
pub mod converter;
pub mod diagnostics;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod type_def;
pub mod type_hash;
pub mod value;

pub use convert::Format;
pub use converter::{Converter, ConverterRegistry};
pub use diagnostics::{Diagnostics, Strategy, TraceRecord};
pub use error::{ConversionError, ConversionResult};
pub use registry::TypeRegistry;
pub use resolver::Resolver;
pub use type_def::{ConvDirection, ConvFn, ConversionOp, PrimitiveKind, TypeDef, TypeFlags, TypeKind};
pub use type_hash::TypeHash;
pub use value::{NativeValue, Value};
