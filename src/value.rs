//! Runtime value representation.
//!
//! [`Value`] is the dynamically typed currency of the resolver. Every
//! conversion takes a `Value` in and produces a `Value` out. Host Rust types
//! cross the boundary through the [`NativeValue`] trait.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::type_hash::{builtin, TypeHash};

/// A dynamically typed runtime value.
///
/// Two distinct absent states exist: [`Value::Null`] (no value) and
/// [`Value::DbNull`] (database null). Both are treated as absent by the
/// resolver's null policy, but they remain distinguishable.
#[derive(Clone, Debug)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A database null marker, distinct from plain null.
    DbNull,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    /// An enum value: the declaring type plus the variant discriminant.
    Enum {
        type_hash: TypeHash,
        discriminant: i64,
    },
    /// An instance of a registered class or interface.
    ///
    /// Identity is the `Arc` pointer; assignability shortcuts hand the same
    /// instance back rather than copying.
    Object {
        type_hash: TypeHash,
        data: Arc<dyn Any + Send + Sync>,
    },
}

impl Value {
    /// The runtime type identity of this value.
    ///
    /// Absent values report [`builtin::NULL`].
    pub fn type_hash(&self) -> TypeHash {
        match self {
            Value::Null | Value::DbNull => builtin::NULL,
            Value::Bool(_) => builtin::BOOL,
            Value::Int8(_) => builtin::INT8,
            Value::Int16(_) => builtin::INT16,
            Value::Int32(_) => builtin::INT32,
            Value::Int64(_) => builtin::INT64,
            Value::UInt8(_) => builtin::UINT8,
            Value::UInt16(_) => builtin::UINT16,
            Value::UInt32(_) => builtin::UINT32,
            Value::UInt64(_) => builtin::UINT64,
            Value::Float(_) => builtin::FLOAT,
            Value::Double(_) => builtin::DOUBLE,
            Value::String(_) => builtin::STRING,
            Value::Guid(_) => builtin::GUID,
            Value::DateTime(_) => builtin::DATETIME,
            Value::Enum { type_hash, .. } => *type_hash,
            Value::Object { type_hash, .. } => *type_hash,
        }
    }

    /// True for both absent states.
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Null | Value::DbNull)
    }

    /// Get as bool if this is a Bool value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widen any integer variant to i64, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(*v as i64),
            Value::UInt16(v) => Some(*v as i64),
            Value::UInt32(v) => Some(*v as i64),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            Value::Enum { discriminant, .. } => Some(*discriminant),
            _ => None,
        }
    }

    /// Widen any numeric variant to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Borrow the string payload if this is a String value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Downcast an Object payload to a concrete Rust type.
    pub fn downcast_object<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Object { data, .. } => data.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) | (DbNull, DbNull) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt8(a), UInt8(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Guid(a), Guid(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (
                Enum { type_hash: ta, discriminant: da },
                Enum { type_hash: tb, discriminant: db },
            ) => ta == tb && da == db,
            // Object equality is instance identity
            (
                Object { type_hash: ta, data: da },
                Object { type_hash: tb, data: db },
            ) => ta == tb && Arc::ptr_eq(da, db),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::DbNull => write!(f, "dbnull"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Guid(g) => write!(f, "{}", g),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Enum { discriminant, .. } => write!(f, "{}", discriminant),
            Value::Object { type_hash, .. } => write!(f, "object({})", type_hash),
        }
    }
}

/// Bridge between host Rust types and [`Value`].
///
/// Implemented for every builtin; host code can implement it for its own
/// types to use the generic [`convert_as`](crate::resolver::Resolver::convert_as)
/// entry point.
pub trait NativeValue: Sized {
    /// The type identity this Rust type maps to.
    fn native_type_hash() -> TypeHash;

    /// Wrap this value.
    fn into_value(self) -> Value;

    /// Extract from a value, if the variant matches.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_native_value {
    ($ty:ty, $variant:ident, $hash:expr) => {
        impl NativeValue for $ty {
            #[inline]
            fn native_type_hash() -> TypeHash {
                $hash
            }

            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            #[inline]
            fn from(v: $ty) -> Value {
                Value::$variant(v)
            }
        }
    };
}

impl_native_value!(bool, Bool, builtin::BOOL);
impl_native_value!(i8, Int8, builtin::INT8);
impl_native_value!(i16, Int16, builtin::INT16);
impl_native_value!(i32, Int32, builtin::INT32);
impl_native_value!(i64, Int64, builtin::INT64);
impl_native_value!(u8, UInt8, builtin::UINT8);
impl_native_value!(u16, UInt16, builtin::UINT16);
impl_native_value!(u32, UInt32, builtin::UINT32);
impl_native_value!(u64, UInt64, builtin::UINT64);
impl_native_value!(f32, Float, builtin::FLOAT);
impl_native_value!(f64, Double, builtin::DOUBLE);
impl_native_value!(String, String, builtin::STRING);
impl_native_value!(Uuid, Guid, builtin::GUID);
impl_native_value!(NaiveDateTime, DateTime, builtin::DATETIME);

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}
