//! Type identities.
//!
//! [`TypeHash`] is the 64-bit identity every registry and conversion keys
//! on. It is derived from the qualified type name with xxh64, so an identity
//! can be formed before (or without) registering the type, and two parties
//! naming the same type agree on its hash with no coordination.
//!
//! # Examples
//!
//! ```
//! use coercion::TypeHash;
//!
//! let a = TypeHash::from_name("int");
//! let b = TypeHash::from_name("int");
//! assert_eq!(a, b);
//!
//! // Instantiated generics get their own identity.
//! let list = TypeHash::from_name("list");
//! let list_int = TypeHash::from_template_instance(list, &[a]);
//! assert_ne!(list, list_int);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant mixed between template type arguments.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Type-argument position mixing constants.
    /// Each position gets a unique constant so argument order matters.
    pub const ARG_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a type.
///
/// Computed from the qualified type name. The same input always produces the
/// same hash, so identities can be formed before the type is registered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant, the "null type identity".
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Derive the identity for a qualified type name.
    ///
    /// # Examples
    ///
    /// ```
    /// use coercion::TypeHash;
    ///
    /// assert_eq!(TypeHash::from_name("int"), TypeHash::from_name("int"));
    /// assert_ne!(TypeHash::from_name("config::LogLevel"), TypeHash::from_name("int"));
    /// ```
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Derive the identity of a bound template instance from the template
    /// and its type arguments.
    ///
    /// Argument order matters: `map<int, string>` and `map<string, int>`
    /// hash differently. The bare template hash identifies the *unbound*
    /// template, which can never be a conversion target.
    #[inline]
    pub fn from_template_instance(template: TypeHash, args: &[TypeHash]) -> Self {
        let mut hash = template.0;
        for (i, arg) in args.iter().enumerate() {
            let marker = hash_constants::ARG_MARKERS
                .get(i)
                .copied()
                .unwrap_or_else(|| hash_constants::ARG_MARKERS[0].wrapping_add(i as u64));
            // wrapping_mul makes argument order matter (not commutative like XOR)
            hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ arg.0);
        }
        TypeHash(hash)
    }

    /// Create a TypeHash from a Rust type's `TypeId`.
    ///
    /// Used to bridge host-side Rust types into the identity space.
    /// Note: this produces a different hash than `from_name()` since it is
    /// based on Rust's internal type representation, not a registered name.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self::of_type_id(std::any::TypeId::of::<T>())
    }

    /// Create a TypeHash from an existing `TypeId`.
    #[inline]
    pub fn of_type_id(type_id: std::any::TypeId) -> Self {
        use std::hash::{Hash, Hasher};

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        type_id.hash(&mut hasher);
        TypeHash(hasher.finish())
    }

    /// Check if this is the empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw hash value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Well-known constant hashes for the builtin types.
///
/// The numeric and bool constants are pre-computed from
/// `TypeHash::from_name()` for efficiency; a test verifies they match.
pub mod builtin {
    use super::TypeHash;

    /// Hash for `bool`.
    pub const BOOL: TypeHash = TypeHash(0x1e0c8fa4cced99c1);

    /// Hash for `int8`.
    pub const INT8: TypeHash = TypeHash(0x2b44191092e74388);

    /// Hash for `int16`.
    pub const INT16: TypeHash = TypeHash(0x95aebfc985e9b115);

    /// Hash for `int` (32-bit signed integer).
    pub const INT32: TypeHash = TypeHash(0x4f5e5320cd1c92bf);

    /// Hash for `int64`.
    pub const INT64: TypeHash = TypeHash(0x7d6c550df59a1924);

    /// Hash for `uint8`.
    pub const UINT8: TypeHash = TypeHash(0x0e8b2d31cdfa9716);

    /// Hash for `uint16`.
    pub const UINT16: TypeHash = TypeHash(0x269d68dfde65ae7f);

    /// Hash for `uint` (32-bit unsigned integer).
    pub const UINT32: TypeHash = TypeHash(0x543fb8f520aa3e26);

    /// Hash for `uint64`.
    pub const UINT64: TypeHash = TypeHash(0x32ba58d17fda82dd);

    /// Hash for `float`.
    pub const FLOAT: TypeHash = TypeHash(0x02d5a2fddaf5bb69);

    /// Hash for `double`.
    pub const DOUBLE: TypeHash = TypeHash(0xeb125587f6c2a79b);

    /// Hash for `string`.
    /// Note: string is a registered reference type (not a primitive), so
    /// this matches `TypeHash::from_name("string")`.
    pub const STRING: TypeHash = TypeHash(0x7a8d5fb1ba695978);

    /// Hash reported for absent values (`Value::Null` / `Value::DbNull`).
    pub const NULL: TypeHash = TypeHash(0x1165f1b6597b5a46);

    /// Hash for `guid`.
    /// This is a special sentinel value, not computed from a name.
    pub const GUID: TypeHash = TypeHash(0xfffffffffffffffd);

    /// Hash for `datetime`.
    /// This is a special sentinel value, not computed from a name.
    pub const DATETIME: TypeHash = TypeHash(0xfffffffffffffffc);
}
