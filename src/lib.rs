//! Reaction Abundance Aggregation Library
//!
//! This library turns per-sample orthology abundances (e.g. KEGG KO counts)
//! into per-sample reaction abundances, optionally normalizing a
//! metatranscriptome against the matching metagenome first.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (SampleMatrix, ReferenceMapping, SampleGroups)
//! - **aggregate**: Orthology -> reaction aggregation by mean
//! - **normalize**: Expression ratios (transcript / genomic)
//! - **group**: Averaging across groups of samples
//! - **pipeline**: Run orchestration and configuration
//!
//! # Example
//!
//! ```no_run
//! use kegg_matrix::prelude::*;
//! use std::path::Path;
//!
//! let reference = ReferenceMapping::from_tsv("reaction_to_orthology.tsv").unwrap();
//! let kegg = KeggMatrix::from_paths(
//!     &reference,
//!     Path::new("metagenome_ko.tsv"),
//!     Some(Path::new("metatranscriptome_ko.tsv")),
//! )
//! .unwrap();
//!
//! let burnt = group_average(&["soil_1", "soil_2"], kegg.reaction_matrix()).unwrap();
//! ```

pub mod aggregate;
pub mod data;
pub mod error;
pub mod group;
pub mod normalize;
pub mod pipeline;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aggregate::{
        aggregate_reactions, aggregate_reactions_with_summary, AggregationSummary,
    };
    pub use crate::data::{
        CategoryMatrix, IdentifierMatrix, RatioMatrix, ReferenceMapping, SampleGroups,
        SampleMatrix,
    };
    pub use crate::error::{KeggError, Result};
    pub use crate::group::{group_average, group_average_all, write_group_table, GroupAverage};
    pub use crate::normalize::norm_expression;
    pub use crate::pipeline::{
        run, KeggMatrix, OutputFormat, RunConfig, RunReport, TranscriptomeMatrices,
    };
}
