//! Aggregation engine for dihadron beam-spin asymmetry results.
//!
//! Takes the per-bin outputs of the upstream reduction pipeline (partial-wave
//! fits, Monte Carlo migration and PID counts, kinematic summaries), attaches
//! a systematic-error breakdown to every fitted term, optionally unfolds bin
//! migration with a response matrix, and serializes flat report records.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod dataset;
pub mod loader;
pub mod migration;
pub mod registry;
pub mod report;
pub mod systematics;
pub mod tables;

pub use aggregator::Aggregator;
pub use dataset::Dataset;
pub use migration::MigrationMatrix;
pub use registry::BinRegistry;
pub use report::Report;
