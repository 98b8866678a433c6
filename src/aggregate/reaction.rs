//! Reaction-level aggregation of orthology abundances.
//!
//! Each reaction is scored per sample as the mean abundance of those of its
//! member orthologs that the sample actually reports. Orthologs missing from
//! a sample are skipped rather than counted as zero.

use crate::data::{CategoryMatrix, IdentifierMatrix, ReferenceMapping, SampleMatrix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts collected while aggregating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    /// Number of samples aggregated.
    pub n_samples: usize,
    /// Number of categories in the reference.
    pub n_categories: usize,
    /// (sample, category) pairs with at least one member present.
    pub n_detected: usize,
    /// Member lookups that found no entry in the sample.
    pub n_missing_lookups: usize,
}

/// Aggregate identifier abundances into category abundances.
///
/// # Formula
/// For sample j and category c with members present P(c, j):
/// - mean(x_kj for k in P(c, j)) if P(c, j) holds at least one non-zero value
/// - 0 otherwise (no member present, or all present members are zero)
///
/// Every sample gets a value for every category of `reference`. An empty
/// reference yields an empty category map per sample.
pub fn aggregate_reactions(
    reference: &ReferenceMapping,
    matrix: &IdentifierMatrix,
) -> CategoryMatrix {
    aggregate_reactions_with_summary(reference, matrix).0
}

/// Aggregate as [`aggregate_reactions`], also returning lookup counts.
pub fn aggregate_reactions_with_summary(
    reference: &ReferenceMapping,
    matrix: &IdentifierMatrix,
) -> (CategoryMatrix, AggregationSummary) {
    if reference.is_empty() {
        log::warn!("Reference mapping has no categories; aggregated matrix will be empty");
    }

    let mut summary = AggregationSummary {
        n_samples: matrix.n_samples(),
        n_categories: reference.len(),
        ..Default::default()
    };

    let mut data = BTreeMap::new();
    for sample_id in matrix.sample_ids() {
        let abundances = matrix.sample(sample_id);
        let mut category_values = BTreeMap::new();

        for (category, members) in reference.iter() {
            let mut present = Vec::with_capacity(members.len());
            for member in members {
                match abundances.and_then(|a| a.get(member)) {
                    Some(&value) => present.push(value),
                    None => {
                        log::debug!(
                            "ID not found in input matrix: {} (sample {})",
                            member,
                            sample_id
                        );
                        summary.n_missing_lookups += 1;
                    }
                }
            }
            if !present.is_empty() {
                summary.n_detected += 1;
            }
            category_values.insert(category.clone(), mean_if_any_nonzero(&present));
        }

        data.insert(sample_id.clone(), category_values);
    }

    log::info!(
        "Aggregated {} samples into {} categories ({} of {} sample/category pairs detected)",
        summary.n_samples,
        summary.n_categories,
        summary.n_detected,
        summary.n_samples * summary.n_categories
    );

    let aggregated = SampleMatrix::from_parts(
        matrix.sample_ids().to_vec(),
        reference.categories().cloned().collect(),
        data,
    );
    (aggregated, summary)
}

/// Mean of `values`, or 0 when none of them is non-zero.
///
/// Zeros still count towards the divisor once one non-zero value is present.
fn mean_if_any_nonzero(values: &[f64]) -> f64 {
    if values.iter().any(|&v| v != 0.0) {
        values.iter().sum::<f64>() / values.len() as f64
    } else {
        0.0
    }
}
