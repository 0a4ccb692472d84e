//! Conversion resolution.
//!
//! The [`Resolver`] runs a fixed-priority chain of strategies to turn a
//! value into an instance of a requested target type:
//!
//! 1. Argument validation (empty or unbound-template targets are rejected)
//! 2. Null policy (absent values pass through to nullable/reference targets,
//!    are rejected for value types)
//! 3. Assignability shortcut (identity, base classes, interfaces, nullable
//!    wrap) returning the same instance untouched
//! 4. Registered converters, in four ordered sub-attempts
//! 5. The builtin standard conversion matrix
//! 6. Conversion operator discovery (implicit before explicit, target side
//!    before source side)
//! 7. Enum parse fallback (variant name case-insensitively, then number)
//!
//! A strategy that declines or fails never aborts the chain; failures are
//! recorded in the resolver's trace and the next strategy runs. Only when
//! every strategy is exhausted does the throwing entry point raise
//! [`ConversionError::UnsupportedConversion`].

use std::sync::Mutex;

use crate::convert::{standard_convert, Format};
use crate::converter::ConverterRegistry;
use crate::diagnostics::{Diagnostics, Strategy};
use crate::error::{ConversionError, ConversionResult};
use crate::registry::TypeRegistry;
use crate::type_def::{ConvDirection, ConversionOp, TypeDef, TypeFlags};
use crate::type_hash::TypeHash;
use crate::value::{NativeValue, Value};

/// Executes the conversion strategy chain against a pair of registries.
pub struct Resolver<'a> {
    types: &'a TypeRegistry,
    converters: &'a ConverterRegistry,
    trace: Mutex<Diagnostics>,
}

impl<'a> Resolver<'a> {
    pub fn new(types: &'a TypeRegistry, converters: &'a ConverterRegistry) -> Self {
        Self {
            types,
            converters,
            trace: Mutex::new(Diagnostics::new()),
        }
    }

    /// Convert `value` to `target` with the invariant format.
    ///
    /// # Errors
    ///
    /// [`ConversionError::InvalidArgument`] for an empty target hash,
    /// [`ConversionError::InvalidTarget`] for an unbound template target,
    /// [`ConversionError::NullToValueType`] for an absent value requested as
    /// a value type, and [`ConversionError::UnsupportedConversion`] when the
    /// whole chain is exhausted.
    pub fn convert(&self, value: &Value, target: TypeHash) -> ConversionResult<Value> {
        self.convert_with(value, target, &Format::default())
    }

    /// Convert `value` to `target` under explicit formatting conventions.
    pub fn convert_with(
        &self,
        value: &Value,
        target: TypeHash,
        format: &Format,
    ) -> ConversionResult<Value> {
        if target.is_empty() {
            return Err(ConversionError::InvalidArgument {
                what: "conversion target is the empty hash".into(),
            });
        }

        // Unregistered targets carry no flags and read as reference-like
        let target_flags = self.types.flags(target).unwrap_or(TypeFlags::empty());
        if target_flags.contains(TypeFlags::TEMPLATE) {
            let name = match self.types.get(target) {
                Some(TypeDef::Template { name, .. }) => name.clone(),
                _ => String::new(),
            };
            return Err(ConversionError::InvalidTarget { target, name });
        }

        // Null policy. Absent values flow through unchanged when the target
        // can hold them; Null and DbNull stay distinguishable.
        if value.is_absent() {
            return if target_flags.contains(TypeFlags::VALUE_TYPE) {
                Err(ConversionError::NullToValueType { target })
            } else {
                Ok(value.clone())
            };
        }

        let source = value.type_hash();

        // A present value aimed at nullable<T> resolves against T.
        let target = self.types.nullable_underlying(target).unwrap_or(target);

        // Assignability shortcut hands back the same instance.
        if self.types.is_assignable(target, source) {
            return Ok(value.clone());
        }

        if let Some(converted) = self.try_registered(value, source, target, format) {
            return Ok(converted);
        }

        match standard_convert(value, target, self.types, format) {
            Ok(Some(converted)) => return Ok(converted),
            Ok(None) => {}
            Err(e) => self.record(Strategy::Standard, source, target, e.to_string()),
        }

        if let Some(converted) = self.try_operators(value, source, target) {
            return Ok(converted);
        }

        if let Some(converted) = self.try_enum_parse(value, target) {
            return Ok(converted);
        }

        Err(ConversionError::UnsupportedConversion { from: source, to: target })
    }

    /// Non-throwing conversion.
    ///
    /// Returns `(true, converted)` on success and `(false, default)` on any
    /// failure, where `default` is the target's zero value. Never raises.
    pub fn try_convert(&self, value: &Value, target: TypeHash) -> (bool, Value) {
        match self.convert(value, target) {
            Ok(converted) => (true, converted),
            Err(_) => (false, self.types.default_value(target)),
        }
    }

    /// Convert to a host Rust type through its [`NativeValue`] mapping.
    pub fn convert_as<T: NativeValue>(&self, value: &Value) -> ConversionResult<T> {
        let target = T::native_type_hash();
        let converted = self.convert(value, target)?;
        T::from_value(&converted).ok_or(ConversionError::UnsupportedConversion {
            from: converted.type_hash(),
            to: target,
        })
    }

    /// Drain and return the accumulated failure trace.
    pub fn take_trace(&self) -> Diagnostics {
        let mut guard = self.trace.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    fn record(&self, strategy: Strategy, from: TypeHash, to: TypeHash, detail: String) {
        let mut guard = self.trace.lock().unwrap_or_else(|e| e.into_inner());
        guard.record(strategy, from, to, detail);
    }

    /// Registered converters, in the documented sub-attempt order:
    /// target's registered capability converting in, source's registered
    /// capability converting out, then the same pairing for the default
    /// capabilities attached to the type definitions.
    fn try_registered(
        &self,
        value: &Value,
        source: TypeHash,
        target: TypeHash,
        format: &Format,
    ) -> Option<Value> {
        if let Some(converter) = self.converters.lookup(target) {
            match converter.convert_from(value, self.types, format) {
                Ok(Some(converted)) => return Some(converted),
                Ok(None) => {}
                Err(e) => self.record(Strategy::RegisteredConverter, source, target, e.to_string()),
            }
        }

        if let Some(converter) = self.converters.lookup(source) {
            match converter.convert_to(value, target, self.types, format) {
                Ok(Some(converted)) => return Some(converted),
                Ok(None) => {}
                Err(e) => self.record(Strategy::RegisteredConverter, source, target, e.to_string()),
            }
        }

        // Default capabilities declare what they handle up front
        if let Some(converter) = self.types.default_converter(target) {
            if converter.can_convert_from(source, self.types) {
                match converter.convert_from(value, self.types, format) {
                    Ok(Some(converted)) => return Some(converted),
                    Ok(None) => {}
                    Err(e) => {
                        self.record(Strategy::DefaultConverter, source, target, e.to_string())
                    }
                }
            }
        }

        if let Some(converter) = self.types.default_converter(source) {
            if converter.can_convert_to(target, self.types) {
                match converter.convert_to(value, target, self.types, format) {
                    Ok(Some(converted)) => return Some(converted),
                    Ok(None) => {}
                    Err(e) => {
                        self.record(Strategy::DefaultConverter, source, target, e.to_string())
                    }
                }
            }
        }

        None
    }

    /// Conversion operator discovery.
    ///
    /// Candidates on the target come before candidates on the source, and
    /// within each side implicit operators beat explicit ones. A failing
    /// operator body falls through to the next candidate.
    fn try_operators(&self, value: &Value, source: TypeHash, target: TypeHash) -> Option<Value> {
        let candidates = [
            (target, ConvDirection::Implicit),
            (target, ConvDirection::Explicit),
            (source, ConvDirection::Implicit),
            (source, ConvDirection::Explicit),
        ];

        for (declared_on, direction) in candidates {
            for op in self.types.conversion_ops(declared_on) {
                if !self.op_matches(op, direction, source, target) {
                    continue;
                }
                match (op.func)(value) {
                    Ok(converted) => return Some(converted),
                    Err(e) => self.record(Strategy::Operator, source, target, e.to_string()),
                }
            }
        }

        None
    }

    fn op_matches(
        &self,
        op: &ConversionOp,
        direction: ConvDirection,
        source: TypeHash,
        target: TypeHash,
    ) -> bool {
        op.direction == direction
            && self.types.is_assignable(target, op.to)
            && self.types.is_assignable(op.from, source)
    }

    /// Enum parse fallback against the source's default string form:
    /// variant name first (case-insensitively), then the numeric
    /// discriminant. Numbers must name a declared variant.
    fn try_enum_parse(&self, value: &Value, target: TypeHash) -> Option<Value> {
        let is_enum = self
            .types
            .flags(target)
            .is_some_and(|flags| flags.contains(TypeFlags::ENUM));
        if !is_enum {
            return None;
        }

        let rendered;
        let text = match value.as_str() {
            Some(s) => s,
            None => {
                rendered = value.to_string();
                rendered.as_str()
            }
        };
        let trimmed = text.trim();

        if let Some(discriminant) = self.types.enum_variant_by_name(target, trimmed) {
            return Some(Value::Enum { type_hash: target, discriminant });
        }
        if let Ok(discriminant) = trimmed.parse::<i64>() {
            if self.types.enum_has_discriminant(target, discriminant) {
                return Some(Value::Enum { type_hash: target, discriminant });
            }
            self.record(
                Strategy::EnumParse,
                value.type_hash(),
                target,
                format!("{} is not a declared variant", discriminant),
            );
        }

        None
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
