//! Error types for trie reconstruction.
//!
//! This module provides [HstratError], the single error type surfaced by
//! builders, postprocessors, and the dataframe driver, together with the
//! crate-wide [Result] alias.

use thiserror::Error;

// =#========================================================================#=
// HSTRAT ERROR
// =#========================================================================#=
/// Errors that can occur while building, postprocessing, or exporting a trie.
///
/// On error, any trie handed over with `mutate = true` is indeterminate and
/// must be discarded.
#[derive(Error, Debug)]
pub enum HstratError {
    /// Annotation (or exploded row) violates a data invariant, e.g.
    /// non-ascending ranks or a fingerprint wider than its bitwidth.
    #[error("Malformed annotation: {message}")]
    MalformedAnnotation { message: String },

    /// Fingerprint bitwidth outside {1, 2, 4, 8, 16, 32, 64}.
    #[error("Invalid differentia bitwidth {bitwidth}; expected one of 1, 2, 4, 8, 16, 32, 64")]
    InvalidBitwidth { bitwidth: u32 },

    /// A per-row column that must be global holds more than one value.
    #[error("Inconsistent global column '{column}': found both {first} and {other}")]
    InconsistentGlobals {
        column: String,
        first: u64,
        other: u64,
    },

    /// Trie root fans out into several clades without forced common ancestry.
    #[error("Population has {num_origins} independent origins; enable forced common ancestry to join them")]
    MultipleIndependentOrigins { num_origins: usize },

    /// Caller supplied an unusable option.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Internal invariant failed to hold.
    #[error("Unsatisfiable invariant: {message}")]
    UnsatisfiableInvariant { message: String },

    /// I/O failure while writing output files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results using [HstratError].
pub type Result<T> = std::result::Result<T, HstratError>;

impl HstratError {
    /// Convenience constructor for [HstratError::MalformedAnnotation]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedAnnotation {
            message: message.into(),
        }
    }

    /// Convenience constructor for [HstratError::InvalidConfiguration]
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Convenience constructor for [HstratError::UnsatisfiableInvariant]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::UnsatisfiableInvariant {
            message: message.into(),
        }
    }

    /// Convenience constructor for [HstratError::InconsistentGlobals]
    pub fn inconsistent_globals(column: impl Into<String>, first: u64, other: u64) -> Self {
        Self::InconsistentGlobals {
            column: column.into(),
            first,
            other,
        }
    }
}
