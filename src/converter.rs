//! Pluggable converter capabilities.
//!
//! A [`Converter`] is attached to a type and answers conversions *into* that
//! type (`convert_from`) and *out of* it (`convert_to`). Capabilities live in
//! the [`ConverterRegistry`], a process-wide map consulted by the resolver
//! ahead of the builtin conversion matrix.

use std::sync::{Arc, Mutex, RwLock};

use rustc_hash::FxHashMap;

use crate::convert::Format;
use crate::error::{ConversionError, ConversionResult};
use crate::registry::TypeRegistry;
use crate::type_hash::TypeHash;
use crate::value::Value;

/// A conversion capability attached to a single type.
///
/// Both methods return `Ok(None)` to decline a pairing they do not handle;
/// the resolver then moves on to the next strategy. An `Err` is swallowed by
/// the resolver (recorded, not raised) and likewise falls through.
pub trait Converter: Send + Sync {
    /// Convert `value` *into* the type this capability is attached to.
    fn convert_from(
        &self,
        value: &Value,
        types: &TypeRegistry,
        format: &Format,
    ) -> anyhow::Result<Option<Value>>;

    /// Convert `value` (an instance of the attached type) *out to* `target`.
    fn convert_to(
        &self,
        value: &Value,
        target: TypeHash,
        types: &TypeRegistry,
        format: &Format,
    ) -> anyhow::Result<Option<Value>>;

    /// Cheap pre-check for `convert_from`. Defaults to declining.
    fn can_convert_from(&self, _source: TypeHash, _types: &TypeRegistry) -> bool {
        false
    }

    /// Cheap pre-check for `convert_to`. Defaults to declining.
    fn can_convert_to(&self, _target: TypeHash, _types: &TypeRegistry) -> bool {
        false
    }
}

/// Process-wide map from type identity to its conversion capability.
///
/// Reads never block behind a registration in progress: lookups clone an
/// `Arc` snapshot of the map, and registration rebuilds the map aside,
/// holding the `RwLock` only for the final pointer store. Writers serialize
/// on a separate mutex so a slow rebuild never sits inside the read path's
/// lock.
#[derive(Default)]
pub struct ConverterRegistry {
    map: RwLock<Arc<FxHashMap<TypeHash, Arc<dyn Converter>>>>,
    writer: Mutex<()>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a capability to a type. Re-registering replaces the previous
    /// capability (last wins).
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidArgument`] for the empty hash.
    pub fn register(
        &self,
        hash: TypeHash,
        converter: Arc<dyn Converter>,
    ) -> ConversionResult<()> {
        if hash.is_empty() {
            return Err(ConversionError::InvalidArgument {
                what: "cannot register a converter under the empty hash".into(),
            });
        }
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        // Rebuild from the current snapshot without the read path's lock;
        // the write guard covers nothing but the pointer store.
        let mut next = FxHashMap::clone(&self.snapshot());
        next.insert(hash, converter);
        let mut guard = self.map.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(next);
        Ok(())
    }

    /// Look up the capability attached to a type.
    pub fn lookup(&self, hash: TypeHash) -> Option<Arc<dyn Converter>> {
        self.snapshot().get(&hash).cloned()
    }

    /// A point-in-time snapshot of the whole map.
    pub fn snapshot(&self) -> Arc<FxHashMap<TypeHash, Arc<dyn Converter>>> {
        Arc::clone(&self.map.read().unwrap_or_else(|e| e.into_inner()))
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("registered", &self.snapshot().len())
            .finish()
    }
}
