//! Type metadata definitions.
//!
//! [`TypeDef`] describes every kind of type the resolver knows about:
//! primitives, classes, interfaces, enums, nullable wrappers, and generic
//! templates. Definitions are stored in the
//! [`TypeRegistry`](crate::registry::TypeRegistry) keyed by
//! [`TypeHash`](crate::type_hash::TypeHash).

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::converter::Converter;
use crate::type_hash::TypeHash;
use crate::value::Value;

/// Whether a type copies on assignment or shares an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Copied on assignment; cannot hold an absent value.
    Value,
    /// Shared by reference; may hold an absent value.
    Reference,
}

/// Primitive type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
}

/// Direction tag on a conversion operator.
///
/// Implicit operators are preferred over explicit ones during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvDirection {
    Implicit,
    Explicit,
}

/// Executable body of a conversion operator.
pub type ConvFn = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// A conversion operator declared on a class.
///
/// An operator converts `from` into `to`; it may be declared on either the
/// source or the target class, and discovery checks both sides.
#[derive(Clone)]
pub struct ConversionOp {
    pub direction: ConvDirection,
    pub from: TypeHash,
    pub to: TypeHash,
    pub func: ConvFn,
}

impl fmt::Debug for ConversionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOp")
            .field("direction", &self.direction)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

/// Full definition of a registered type.
#[derive(Clone)]
pub enum TypeDef {
    /// A builtin primitive.
    Primitive { kind: PrimitiveKind },

    /// A user-registered class.
    Class {
        name: String,
        base_class: Option<TypeHash>,
        interfaces: Vec<TypeHash>,
        type_kind: TypeKind,
        conversion_ops: Vec<ConversionOp>,
        /// Capability consulted by the default-converter resolution steps.
        default_converter: Option<Arc<dyn Converter>>,
    },

    /// An interface; classes list the interfaces they implement.
    Interface { name: String },

    /// An enumeration with named integer variants.
    Enum {
        name: String,
        variants: Vec<(String, i64)>,
    },

    /// A nullable wrapper around a value type.
    Nullable { underlying: TypeHash },

    /// An unbound generic template. Never a valid conversion target.
    Template { name: String, param_count: usize },
}

impl TypeDef {
    /// The declared name, where one exists.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeDef::Class { name, .. }
            | TypeDef::Interface { name }
            | TypeDef::Enum { name, .. }
            | TypeDef::Template { name, .. } => Some(name),
            _ => None,
        }
    }

}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDef::Primitive { kind } => f.debug_struct("Primitive").field("kind", kind).finish(),
            TypeDef::Class { name, base_class, interfaces, type_kind, conversion_ops, default_converter } => f
                .debug_struct("Class")
                .field("name", name)
                .field("base_class", base_class)
                .field("interfaces", interfaces)
                .field("type_kind", type_kind)
                .field("conversion_ops", &conversion_ops.len())
                .field("has_default_converter", &default_converter.is_some())
                .finish(),
            TypeDef::Interface { name } => f.debug_struct("Interface").field("name", name).finish(),
            TypeDef::Enum { name, variants } => f
                .debug_struct("Enum")
                .field("name", name)
                .field("variants", variants)
                .finish(),
            TypeDef::Nullable { underlying } => {
                f.debug_struct("Nullable").field("underlying", underlying).finish()
            }
            TypeDef::Template { name, param_count } => f
                .debug_struct("Template")
                .field("name", name)
                .field("param_count", param_count)
                .finish(),
        }
    }
}

bitflags! {
    /// Classification flags derived from a type's definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u8 {
        const PRIMITIVE  = 1 << 0;
        const VALUE_TYPE = 1 << 1;
        const REFERENCE  = 1 << 2;
        const ENUM       = 1 << 3;
        const NULLABLE   = 1 << 4;
        const TEMPLATE   = 1 << 5;
    }
}

impl TypeDef {
    /// Compute classification flags for this definition.
    pub fn flags(&self) -> TypeFlags {
        match self {
            TypeDef::Primitive { .. } => TypeFlags::PRIMITIVE | TypeFlags::VALUE_TYPE,
            TypeDef::Class { type_kind, .. } => match type_kind {
                TypeKind::Value => TypeFlags::VALUE_TYPE,
                TypeKind::Reference => TypeFlags::REFERENCE,
            },
            TypeDef::Interface { .. } => TypeFlags::REFERENCE,
            TypeDef::Enum { .. } => TypeFlags::ENUM | TypeFlags::VALUE_TYPE,
            TypeDef::Nullable { .. } => TypeFlags::NULLABLE,
            TypeDef::Template { .. } => TypeFlags::TEMPLATE,
        }
    }
}
