//! Pipeline composition and execution for reaction abundance runs.

mod kegg_matrix;
mod runner;

pub use kegg_matrix::{KeggMatrix, TranscriptomeMatrices};
pub use runner::{run, OutputFormat, RunConfig, RunReport};
