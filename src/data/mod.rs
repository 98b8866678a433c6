//! Data structures for reaction abundance aggregation.

mod groups;
mod reference;
mod sample_matrix;

pub use groups::SampleGroups;
pub use reference::ReferenceMapping;
pub use sample_matrix::{CategoryMatrix, IdentifierMatrix, RatioMatrix, SampleMatrix};
