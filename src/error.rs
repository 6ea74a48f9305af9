//! Error types

use crate::types::{KernelDimensions, KernelKind};

/// Errors raised while configuring or running a verification.
///
/// A numerical discrepancy between solver and reference is not an error: it is
/// reported through [crate::compare::ErrorStats].
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// A configuration value is out of range.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// Offending field
        field: &'static str,
        /// Why the value is rejected
        reason: String,
    },

    /// An array length is not a multiple of its per-point width, or does not
    /// match the length implied by another array.
    #[error("{what} has length {len}, which does not fit a per-point width of {width}")]
    DimensionMismatch {
        /// Description of the array
        what: &'static str,
        /// Length found
        len: usize,
        /// Expected per-point width
        width: usize,
    },

    /// The solver reports different value widths than the dispatch table.
    #[error("solver reports dimensions ({found}) for {kind}, expected ({expected})")]
    KernelDimensionMismatch {
        /// Kernel in question
        kind: KernelKind,
        /// Widths from the dispatch table
        expected: KernelDimensions,
        /// Widths reported by the solver
        found: KernelDimensions,
    },

    /// A check failed on another rank of the process group.
    #[error("{what} failed on rank {rank}")]
    PeerFailure {
        /// Rank that failed first
        rank: usize,
        /// Operation that failed
        what: &'static str,
    },

    /// A collective would move more scalars than the process group can address.
    #[error("{what} holds {len} scalars, more than the limit of {limit} per collective")]
    CountOverflow {
        /// Description of the array
        what: &'static str,
        /// Scalar count found
        len: usize,
        /// Largest count the group supports
        limit: usize,
    },

    /// The external solver failed.
    #[error("solver failure: {0}")]
    Solver(String),

    /// Configuration file could not be parsed.
    #[error("could not parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
