//! Conversion trace diagnostics.
//!
//! Strategies that decline or fail mid-chain are swallowed, not raised; the
//! resolver records each swallowed failure here so a caller can see why a
//! conversion ended up unsupported.

use std::collections::VecDeque;
use std::fmt;

use crate::type_hash::TypeHash;

/// Which strategy in the chain produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A converter from the process-wide registry.
    RegisteredConverter,
    /// A default converter attached to a type definition.
    DefaultConverter,
    /// The builtin conversion matrix.
    Standard,
    /// An implicit or explicit conversion operator.
    Operator,
    /// The enum name/number parse fallback.
    EnumParse,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strategy::RegisteredConverter => "registered converter",
            Strategy::DefaultConverter => "default converter",
            Strategy::Standard => "standard conversion",
            Strategy::Operator => "conversion operator",
            Strategy::EnumParse => "enum parse",
        };
        write!(f, "{}", label)
    }
}

/// One swallowed failure.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    pub strategy: Strategy,
    pub from: TypeHash,
    pub to: TypeHash,
    pub detail: String,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} -> {}: {}",
            self.strategy, self.from, self.to, self.detail
        )
    }
}

/// Accumulated trace of swallowed failures, oldest first.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    records: VecDeque<TraceRecord>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a swallowed failure.
    pub fn record(
        &mut self,
        strategy: Strategy,
        from: TypeHash,
        to: TypeHash,
        detail: impl Into<String>,
    ) {
        self.records.push_back(TraceRecord {
            strategy,
            from,
            to,
            detail: detail.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }
        Ok(())
    }
}
