//! Type registry.
//!
//! The [`TypeRegistry`] holds every [`TypeDef`] the resolver can reason
//! about, keyed by [`TypeHash`]. A fresh registry comes pre-populated with
//! the builtin primitives plus `string`, `guid`, and `datetime`.

use std::sync::Arc;

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::converter::Converter;
use crate::error::{ConversionError, ConversionResult};
use crate::type_def::{ConversionOp, PrimitiveKind, TypeDef, TypeFlags, TypeKind};
use crate::type_hash::{builtin, TypeHash};
use crate::value::Value;

/// Registry of type definitions.
///
/// Lookups are by hash; a secondary name index supports [`find`](Self::find).
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeDef>,
    by_name: FxHashMap<String, TypeHash>,
}

impl TypeRegistry {
    /// Create a registry pre-populated with the builtin types.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.install_builtins();
        registry
    }

    fn install_builtins(&mut self) {
        let primitives = [
            (builtin::BOOL, "bool", PrimitiveKind::Bool),
            (builtin::INT8, "int8", PrimitiveKind::Int8),
            (builtin::INT16, "int16", PrimitiveKind::Int16),
            (builtin::INT32, "int", PrimitiveKind::Int32),
            (builtin::INT64, "int64", PrimitiveKind::Int64),
            (builtin::UINT8, "uint8", PrimitiveKind::UInt8),
            (builtin::UINT16, "uint16", PrimitiveKind::UInt16),
            (builtin::UINT32, "uint", PrimitiveKind::UInt32),
            (builtin::UINT64, "uint64", PrimitiveKind::UInt64),
            (builtin::FLOAT, "float", PrimitiveKind::Float),
            (builtin::DOUBLE, "double", PrimitiveKind::Double),
        ];
        for (hash, name, kind) in primitives {
            self.types.insert(hash, TypeDef::Primitive { kind });
            self.by_name.insert(name.to_string(), hash);
        }

        // string shares by reference; guid and datetime copy on assignment
        let standard = [
            (builtin::STRING, "string", TypeKind::Reference),
            (builtin::GUID, "guid", TypeKind::Value),
            (builtin::DATETIME, "datetime", TypeKind::Value),
        ];
        for (hash, name, type_kind) in standard {
            self.types.insert(
                hash,
                TypeDef::Class {
                    name: name.to_string(),
                    base_class: None,
                    interfaces: Vec::new(),
                    type_kind,
                    conversion_ops: Vec::new(),
                    default_converter: None,
                },
            );
            self.by_name.insert(name.to_string(), hash);
        }
    }

    /// Register a type definition, replacing any previous definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidArgument`] for the empty hash.
    pub fn register(&mut self, hash: TypeHash, def: TypeDef) -> ConversionResult<()> {
        if hash.is_empty() {
            return Err(ConversionError::InvalidArgument {
                what: "cannot register a type under the empty hash".into(),
            });
        }
        if let Some(name) = def.name() {
            self.by_name.insert(name.to_string(), hash);
        }
        self.types.insert(hash, def);
        Ok(())
    }

    /// Look up a definition by hash.
    #[inline]
    pub fn get(&self, hash: TypeHash) -> Option<&TypeDef> {
        self.types.get(&hash)
    }

    /// Look up a type by declared name.
    pub fn find(&self, name: &str) -> Option<TypeHash> {
        self.by_name.get(name).copied()
    }

    /// Classification flags for a hash, when registered.
    pub fn flags(&self, hash: TypeHash) -> Option<TypeFlags> {
        self.get(hash).map(TypeDef::flags)
    }

    /// Whether values of this type copy on assignment.
    ///
    /// Unregistered hashes are treated as reference-like, so null is allowed
    /// into them rather than rejected on incomplete metadata.
    pub fn is_value_type(&self, hash: TypeHash) -> bool {
        self.flags(hash)
            .is_some_and(|flags| flags.contains(TypeFlags::VALUE_TYPE))
    }

    /// The wrapped type, if `hash` is a nullable wrapper.
    pub fn nullable_underlying(&self, hash: TypeHash) -> Option<TypeHash> {
        match self.get(hash) {
            Some(TypeDef::Nullable { underlying }) => Some(*underlying),
            _ => None,
        }
    }

    /// Whether a value of type `source` can be assigned to `target` without
    /// any conversion.
    ///
    /// Covers identity, the base-class chain, declared interfaces (including
    /// those of base classes), and wrapping into `Nullable(source)`.
    pub fn is_assignable(&self, target: TypeHash, source: TypeHash) -> bool {
        if target == source {
            return true;
        }
        if let Some(underlying) = self.nullable_underlying(target) {
            return self.is_assignable(underlying, source);
        }

        // Walk the source's inheritance chain
        let mut current = source;
        loop {
            match self.get(current) {
                Some(TypeDef::Class { base_class, interfaces, .. }) => {
                    if interfaces.contains(&target) {
                        return true;
                    }
                    match base_class {
                        Some(base) => {
                            if *base == target {
                                return true;
                            }
                            current = *base;
                        }
                        None => return false,
                    }
                }
                _ => return false,
            }
        }
    }

    /// The conversion operators declared on a class, if any.
    pub fn conversion_ops(&self, hash: TypeHash) -> &[ConversionOp] {
        match self.get(hash) {
            Some(TypeDef::Class { conversion_ops, .. }) => conversion_ops,
            _ => &[],
        }
    }

    /// The default converter capability attached to a class, if any.
    pub fn default_converter(&self, hash: TypeHash) -> Option<Arc<dyn Converter>> {
        match self.get(hash) {
            Some(TypeDef::Class { default_converter, .. }) => default_converter.clone(),
            _ => None,
        }
    }

    /// Resolve an enum variant discriminant from its name, case-insensitively.
    pub fn enum_variant_by_name(&self, hash: TypeHash, name: &str) -> Option<i64> {
        match self.get(hash) {
            Some(TypeDef::Enum { variants, .. }) => variants
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, d)| *d),
            _ => None,
        }
    }

    /// Check that a discriminant names a declared enum variant.
    pub fn enum_has_discriminant(&self, hash: TypeHash, discriminant: i64) -> bool {
        match self.get(hash) {
            Some(TypeDef::Enum { variants, .. }) => {
                variants.iter().any(|(_, d)| *d == discriminant)
            }
            _ => false,
        }
    }

    /// The default (zero) value for a type.
    ///
    /// Value types get their zero; reference and nullable types get null.
    pub fn default_value(&self, hash: TypeHash) -> Value {
        match self.get(hash) {
            Some(TypeDef::Primitive { kind }) => match kind {
                PrimitiveKind::Bool => Value::Bool(false),
                PrimitiveKind::Int8 => Value::Int8(0),
                PrimitiveKind::Int16 => Value::Int16(0),
                PrimitiveKind::Int32 => Value::Int32(0),
                PrimitiveKind::Int64 => Value::Int64(0),
                PrimitiveKind::UInt8 => Value::UInt8(0),
                PrimitiveKind::UInt16 => Value::UInt16(0),
                PrimitiveKind::UInt32 => Value::UInt32(0),
                PrimitiveKind::UInt64 => Value::UInt64(0),
                PrimitiveKind::Float => Value::Float(0.0),
                PrimitiveKind::Double => Value::Double(0.0),
            },
            Some(TypeDef::Enum { .. }) => Value::Enum { type_hash: hash, discriminant: 0 },
            Some(TypeDef::Class { type_kind: TypeKind::Value, .. }) => match hash {
                h if h == builtin::GUID => Value::Guid(Uuid::nil()),
                h if h == builtin::DATETIME => Value::DateTime(NaiveDateTime::default()),
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, base: Option<TypeHash>, interfaces: Vec<TypeHash>) -> TypeDef {
        TypeDef::Class {
            name: name.to_string(),
            base_class: base,
            interfaces,
            type_kind: TypeKind::Reference,
            conversion_ops: Vec::new(),
            default_converter: None,
        }
    }

    #[test]
    fn builtins_pre_registered() {
        let registry = TypeRegistry::new();
        assert!(registry.get(builtin::INT32).is_some());
        assert!(registry.get(builtin::STRING).is_some());
        assert_eq!(registry.find("int"), Some(builtin::INT32));
        assert_eq!(registry.find("guid"), Some(builtin::GUID));
        assert!(registry.is_value_type(builtin::GUID));
        assert!(!registry.is_value_type(builtin::STRING));
    }

    #[test]
    fn register_rejects_empty_hash() {
        let mut registry = TypeRegistry::new();
        let result = registry.register(TypeHash::EMPTY, TypeDef::Interface { name: "X".into() });
        assert!(matches!(result, Err(ConversionError::InvalidArgument { .. })));
    }

    #[test]
    fn register_last_wins() {
        let mut registry = TypeRegistry::new();
        let hash = TypeHash::from_name("Mode");
        registry
            .register(hash, TypeDef::Enum { name: "Mode".into(), variants: vec![("A".into(), 0)] })
            .unwrap();
        registry
            .register(hash, TypeDef::Enum { name: "Mode".into(), variants: vec![("B".into(), 1)] })
            .unwrap();
        assert_eq!(registry.enum_variant_by_name(hash, "B"), Some(1));
        assert_eq!(registry.enum_variant_by_name(hash, "A"), None);
    }

    #[test]
    fn assignability_walks_base_chain() {
        let mut registry = TypeRegistry::new();
        let base = TypeHash::from_name("Base");
        let mid = TypeHash::from_name("Mid");
        let sub = TypeHash::from_name("Sub");
        registry.register(base, class("Base", None, vec![])).unwrap();
        registry.register(mid, class("Mid", Some(base), vec![])).unwrap();
        registry.register(sub, class("Sub", Some(mid), vec![])).unwrap();

        assert!(registry.is_assignable(base, sub));
        assert!(registry.is_assignable(mid, sub));
        assert!(!registry.is_assignable(sub, base));
    }

    #[test]
    fn assignability_covers_interfaces_of_bases() {
        let mut registry = TypeRegistry::new();
        let drawable = TypeHash::from_name("Drawable");
        let base = TypeHash::from_name("Shape");
        let sub = TypeHash::from_name("Circle");
        registry.register(drawable, TypeDef::Interface { name: "Drawable".into() }).unwrap();
        registry.register(base, class("Shape", None, vec![drawable])).unwrap();
        registry.register(sub, class("Circle", Some(base), vec![])).unwrap();

        assert!(registry.is_assignable(drawable, sub));
    }

    #[test]
    fn nullable_wraps_underlying() {
        let mut registry = TypeRegistry::new();
        let nullable_int = TypeHash::from_template_instance(TypeHash::from_name("nullable"), &[builtin::INT32]);
        registry.register(nullable_int, TypeDef::Nullable { underlying: builtin::INT32 }).unwrap();

        assert!(registry.is_assignable(nullable_int, builtin::INT32));
        assert!(!registry.is_value_type(nullable_int));
        assert_eq!(registry.nullable_underlying(nullable_int), Some(builtin::INT32));
    }

    #[test]
    fn default_values() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.default_value(builtin::INT32), Value::Int32(0));
        assert_eq!(registry.default_value(builtin::BOOL), Value::Bool(false));
        assert_eq!(registry.default_value(builtin::STRING), Value::Null);
        assert_eq!(registry.default_value(builtin::GUID), Value::Guid(Uuid::nil()));
    }

    #[test]
    fn enum_lookup_case_insensitive() {
        let mut registry = TypeRegistry::new();
        let mode = TypeHash::from_name("BuildMode");
        registry
            .register(
                mode,
                TypeDef::Enum {
                    name: "BuildMode".into(),
                    variants: vec![("Debug".into(), 1), ("Release".into(), 2)],
                },
            )
            .unwrap();

        assert_eq!(registry.enum_variant_by_name(mode, "debug"), Some(1));
        assert_eq!(registry.enum_variant_by_name(mode, "RELEASE"), Some(2));
        assert_eq!(registry.enum_variant_by_name(mode, "Profile"), None);
        assert!(registry.enum_has_discriminant(mode, 2));
        assert!(!registry.enum_has_discriminant(mode, 9));
    }
}
