//! # dh-core
//!
//! Shared types for the dihadron spin-asymmetry systematics engine:
//! bin configurations, measurement tables, the partial-wave term table,
//! and the output record schema.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;
/// Partial-wave term table.
pub mod terms;
/// Bin configurations, measurement tables, output records.
pub mod types;

pub use error::{Error, Result};
pub use terms::{partial_waves, term, PwTerm, N_TERMS};
pub use types::{
    BinConfig, FitTable, HadronPair, MeasurementTable, OutputRecord, SourceError,
    SystematicsBreakdown,
};
