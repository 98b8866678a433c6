//! Aggregation of identifier abundances into category abundances.

pub mod reaction;

pub use reaction::{aggregate_reactions, aggregate_reactions_with_summary, AggregationSummary};
