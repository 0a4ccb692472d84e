//! Builtin standard conversions.
//!
//! The conversion matrix between primitives, strings, guids, datetimes, and
//! enum sources. Consulted by the resolver after registered converters and
//! before operator discovery.
//!
//! All narrowing is range-checked; out-of-range and unparseable inputs
//! produce errors, which the resolver records and falls through on. A
//! pairing the matrix does not cover at all comes back as `Ok(None)`.

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::registry::TypeRegistry;
use crate::type_def::TypeDef;
use crate::type_hash::{builtin, TypeHash};
use crate::value::Value;

/// Formatting and parsing conventions for string conversions.
///
/// The default matches the invariant convention: `.` decimal separator, no
/// digit grouping, ISO-like datetime layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    /// Character separating the integer and fractional parts of a number.
    pub decimal_separator: char,
    /// Optional digit-grouping character accepted (and stripped) on parse.
    pub thousands_separator: Option<char>,
    /// strftime-style layout for datetime parsing and formatting.
    /// `None` uses `%Y-%m-%d %H:%M:%S`.
    pub datetime_format: Option<String>,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            thousands_separator: None,
            datetime_format: None,
        }
    }
}

impl Format {
    const DEFAULT_DATETIME: &'static str = "%Y-%m-%d %H:%M:%S";

    fn datetime_layout(&self) -> &str {
        self.datetime_format.as_deref().unwrap_or(Self::DEFAULT_DATETIME)
    }

    /// Normalize a numeric string to the plain `.`-separated form the
    /// stdlib parsers expect.
    fn normalize_number(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for ch in raw.trim().chars() {
            if Some(ch) == self.thousands_separator {
                continue;
            }
            if ch == self.decimal_separator {
                out.push('.');
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Render a float with this format's decimal separator.
    fn render_float(&self, v: f64) -> String {
        let plain = format!("{}", v);
        if self.decimal_separator == '.' {
            plain
        } else {
            plain.replace('.', &self.decimal_separator.to_string())
        }
    }
}

/// Attempt a builtin conversion of `value` to `target`.
///
/// `Ok(None)` means the matrix does not cover this pairing; enum targets in
/// particular are always declined here and handled by the enum fallback.
pub fn standard_convert(
    value: &Value,
    target: TypeHash,
    types: &TypeRegistry,
    format: &Format,
) -> Result<Option<Value>> {
    // Enum targets are resolved by the enum parse fallback, not here.
    if matches!(types.get(target), Some(TypeDef::Enum { .. })) {
        return Ok(None);
    }

    if target == builtin::STRING {
        return to_string_value(value, types, format);
    }

    // Numeric sources only have standard conversions to other primitives;
    // anything else is outside the matrix, not a failure.
    let numeric_source = !matches!(
        value,
        Value::String(_) | Value::Guid(_) | Value::DateTime(_) | Value::Null | Value::DbNull
            | Value::Object { .. }
    );
    if numeric_source && !is_primitive_target(target) {
        return Ok(None);
    }

    match value {
        Value::Bool(b) => {
            let n = if *b { 1i64 } else { 0 };
            numeric_to(target, Numeric::Int(n)).map(Some)
        }
        Value::Int8(_)
        | Value::Int16(_)
        | Value::Int32(_)
        | Value::Int64(_)
        | Value::UInt8(_)
        | Value::UInt16(_)
        | Value::UInt32(_)
        | Value::Enum { .. } => {
            let n = match value.as_i64() {
                Some(v) => Numeric::Int(v),
                None => return Ok(None),
            };
            numeric_to(target, n).map(Some)
        }
        Value::UInt64(v) => numeric_to(target, Numeric::UInt(*v)).map(Some),
        Value::Float(v) => numeric_to(target, Numeric::Real(*v as f64)).map(Some),
        Value::Double(v) => numeric_to(target, Numeric::Real(*v)).map(Some),
        Value::String(s) => from_string(s, target, format),
        Value::Guid(_) | Value::DateTime(_) => Ok(None),
        Value::Null | Value::DbNull | Value::Object { .. } => Ok(None),
    }
}

fn is_primitive_target(target: TypeHash) -> bool {
    matches!(
        target,
        t if t == builtin::BOOL
            || t == builtin::INT8
            || t == builtin::INT16
            || t == builtin::INT32
            || t == builtin::INT64
            || t == builtin::UINT8
            || t == builtin::UINT16
            || t == builtin::UINT32
            || t == builtin::UINT64
            || t == builtin::FLOAT
            || t == builtin::DOUBLE
    )
}

/// Widened numeric intermediate used by the matrix.
enum Numeric {
    Int(i64),
    UInt(u64),
    Real(f64),
}

impl Numeric {
    fn to_i64(&self) -> Result<i64> {
        match self {
            Numeric::Int(v) => Ok(*v),
            Numeric::UInt(v) => {
                i64::try_from(*v).map_err(|_| anyhow!("value {} out of range", v))
            }
            Numeric::Real(v) => {
                // round half to even, matching standard numeric conversion
                let rounded = v.round_ties_even();
                if rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 && rounded.is_finite() {
                    Ok(rounded as i64)
                } else {
                    bail!("value {} out of range for an integer", v)
                }
            }
        }
    }

    fn to_u64(&self) -> Result<u64> {
        match self {
            Numeric::Int(v) => {
                u64::try_from(*v).map_err(|_| anyhow!("value {} out of range", v))
            }
            Numeric::UInt(v) => Ok(*v),
            Numeric::Real(v) => {
                let rounded = v.round_ties_even();
                if rounded >= 0.0 && rounded <= u64::MAX as f64 && rounded.is_finite() {
                    Ok(rounded as u64)
                } else {
                    bail!("value {} out of range for an unsigned integer", v)
                }
            }
        }
    }

    fn to_f64(&self) -> f64 {
        match self {
            Numeric::Int(v) => *v as f64,
            Numeric::UInt(v) => *v as f64,
            Numeric::Real(v) => *v,
        }
    }
}

fn checked<T, U>(v: T, what: &str) -> Result<U>
where
    U: TryFrom<T>,
    T: std::fmt::Display + Copy,
{
    U::try_from(v).map_err(|_| anyhow!("value {} out of range for {}", v, what))
}

fn numeric_to(target: TypeHash, n: Numeric) -> Result<Value> {
    let value = match target {
        t if t == builtin::BOOL => match n {
            Numeric::Int(v) => Value::Bool(v != 0),
            Numeric::UInt(v) => Value::Bool(v != 0),
            Numeric::Real(v) => Value::Bool(v != 0.0),
        },
        t if t == builtin::INT8 => Value::Int8(checked(n.to_i64()?, "int8")?),
        t if t == builtin::INT16 => Value::Int16(checked(n.to_i64()?, "int16")?),
        t if t == builtin::INT32 => Value::Int32(checked(n.to_i64()?, "int")?),
        t if t == builtin::INT64 => Value::Int64(n.to_i64()?),
        t if t == builtin::UINT8 => Value::UInt8(checked(n.to_u64()?, "uint8")?),
        t if t == builtin::UINT16 => Value::UInt16(checked(n.to_u64()?, "uint16")?),
        t if t == builtin::UINT32 => Value::UInt32(checked(n.to_u64()?, "uint")?),
        t if t == builtin::UINT64 => Value::UInt64(n.to_u64()?),
        t if t == builtin::FLOAT => {
            let wide = n.to_f64();
            let narrowed = wide as f32;
            // a finite double must stay finite after narrowing
            if wide.is_finite() && !narrowed.is_finite() {
                bail!("value {} out of range for float", wide);
            }
            Value::Float(narrowed)
        }
        t if t == builtin::DOUBLE => Value::Double(n.to_f64()),
        other => bail!("no numeric conversion to {}", other),
    };
    Ok(value)
}

fn to_string_value(value: &Value, types: &TypeRegistry, format: &Format) -> Result<Option<Value>> {
    let rendered = match value {
        Value::Bool(b) => b.to_string(),
        Value::Int8(_)
        | Value::Int16(_)
        | Value::Int32(_)
        | Value::Int64(_)
        | Value::UInt8(_)
        | Value::UInt16(_)
        | Value::UInt32(_)
        | Value::UInt64(_) => value.to_string(),
        Value::Float(v) => format.render_float(*v as f64),
        Value::Double(v) => format.render_float(*v),
        Value::String(s) => s.clone(),
        Value::Guid(g) => g.to_string(),
        Value::DateTime(dt) => dt.format(format.datetime_layout()).to_string(),
        Value::Enum { type_hash, discriminant } => {
            // render the variant name when the enum is registered
            match types.get(*type_hash) {
                Some(TypeDef::Enum { variants, .. }) => variants
                    .iter()
                    .find(|(_, d)| d == discriminant)
                    .map(|(n, _)| n.clone())
                    .unwrap_or_else(|| discriminant.to_string()),
                _ => discriminant.to_string(),
            }
        }
        Value::Null | Value::DbNull | Value::Object { .. } => return Ok(None),
    };
    Ok(Some(Value::String(rendered)))
}

fn from_string(s: &str, target: TypeHash, format: &Format) -> Result<Option<Value>> {
    match target {
        t if t == builtin::BOOL => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(Some(Value::Bool(true)))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(Some(Value::Bool(false)))
            } else {
                bail!("'{}' is not a valid bool", s)
            }
        }
        t if t == builtin::GUID => {
            let guid = Uuid::parse_str(s.trim())
                .map_err(|e| anyhow!("'{}' is not a valid guid: {}", s, e))?;
            Ok(Some(Value::Guid(guid)))
        }
        t if t == builtin::DATETIME => {
            let dt = NaiveDateTime::parse_from_str(s.trim(), format.datetime_layout())
                .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S"))
                .map_err(|e| anyhow!("'{}' is not a valid datetime: {}", s, e))?;
            Ok(Some(Value::DateTime(dt)))
        }
        t if t == builtin::FLOAT || t == builtin::DOUBLE => {
            let normalized = format.normalize_number(s);
            let parsed: f64 = normalized
                .parse()
                .map_err(|_| anyhow!("'{}' is not a valid number", s))?;
            numeric_to(target, Numeric::Real(parsed)).map(Some)
        }
        t if t == builtin::INT8
            || t == builtin::INT16
            || t == builtin::INT32
            || t == builtin::INT64 =>
        {
            let normalized = format.normalize_number(s);
            let parsed: i64 = normalized
                .parse()
                .map_err(|_| anyhow!("'{}' is not a valid integer", s))?;
            numeric_to(target, Numeric::Int(parsed)).map(Some)
        }
        t if t == builtin::UINT8
            || t == builtin::UINT16
            || t == builtin::UINT32
            || t == builtin::UINT64 =>
        {
            let normalized = format.normalize_number(s);
            let parsed: u64 = normalized
                .parse()
                .map_err(|_| anyhow!("'{}' is not a valid unsigned integer", s))?;
            numeric_to(target, Numeric::UInt(parsed)).map(Some)
        }
        _ => Ok(None),
    }
}
