//! Normalization of one identifier matrix against another.
//!
//! - **Expression**: transcript abundance divided by genomic abundance

pub mod expression;

pub use expression::norm_expression;
