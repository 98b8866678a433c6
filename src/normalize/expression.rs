//! Expression-ratio normalization of a transcriptome against a metagenome.
//!
//! Transcript abundances are divided by the genomic abundance of the same
//! identifier in the same sample, giving expression per detected copy.

use crate::data::{IdentifierMatrix, RatioMatrix, SampleMatrix};
use crate::error::{KeggError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Divide `derived` abundances by `base` abundances.
///
/// # Formula
/// For sample j and identifier k: ratio_kj = derived_kj / base_kj
///
/// A pair is only emitted when `base` holds the identifier for that sample
/// with a value strictly greater than zero. Identifiers expressed but not
/// detected in `base`, or detected at zero, are left out, as is any ratio
/// that overflows to infinity.
///
/// # Arguments
/// * `base` - Genomic (metagenome) abundances
/// * `derived` - Transcript (metatranscriptome) abundances
///
/// # Errors
/// `SampleMismatch` if the two matrices do not cover the same samples.
pub fn norm_expression(
    base: &IdentifierMatrix,
    derived: &IdentifierMatrix,
) -> Result<RatioMatrix> {
    let base_samples: BTreeSet<&str> = base.sample_ids().iter().map(String::as_str).collect();
    let derived_samples: BTreeSet<&str> =
        derived.sample_ids().iter().map(String::as_str).collect();
    if base_samples != derived_samples {
        return Err(KeggError::SampleMismatch(format!(
            "genomic samples [{}] differ from transcript samples [{}]",
            base.sample_ids().join(", "),
            derived.sample_ids().join(", ")
        )));
    }

    let mut data = BTreeMap::new();
    let mut emitted: HashSet<&str> = HashSet::new();
    let mut n_skipped = 0usize;

    for (sample_id, transcript_values) in derived.iter() {
        let genomic_values = base.sample(sample_id);
        let mut ratios = BTreeMap::new();

        for (feature_id, &expressed) in transcript_values {
            let ratio = genomic_values
                .and_then(|g| g.get(feature_id))
                .filter(|&&detected| detected > 0.0)
                .map(|&detected| expressed / detected)
                .filter(|r| r.is_finite());
            match ratio {
                Some(ratio) => {
                    ratios.insert(feature_id.clone(), ratio);
                    emitted.insert(feature_id.as_str());
                }
                None => n_skipped += 1,
            }
        }

        data.insert(sample_id.to_string(), ratios);
    }

    let feature_ids: Vec<String> = derived
        .feature_ids()
        .iter()
        .filter(|f| emitted.contains(f.as_str()))
        .cloned()
        .collect();

    log::info!(
        "Computed expression ratios for {} identifiers ({} pairs without genomic abundance)",
        feature_ids.len(),
        n_skipped
    );

    Ok(SampleMatrix::from_parts(
        derived.sample_ids().to_vec(),
        feature_ids,
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(text: &str) -> IdentifierMatrix {
        SampleMatrix::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_ratio_compute() {
        let base = matrix("ID\tS\nK1\t4.0\n");
        let derived = matrix("ID\tS\nK1\t2.0\n");
        let ratios = norm_expression(&base, &derived).unwrap();
        assert!((ratios.get("S", "K1").unwrap() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_ratio_skips_absent_base() {
        let base = matrix("ID\tS\nK1\t4.0\n");
        let derived = matrix("ID\tS\nK1\t2.0\nK2\t2.0\n");
        let ratios = norm_expression(&base, &derived).unwrap();
        assert_eq!(ratios.get("S", "K2"), None);
        assert_eq!(ratios.feature_ids(), &["K1"]);
    }

    #[test]
    fn test_ratio_skips_zero_base() {
        let base = matrix("ID\tS1\tS2\nK1\t0\t2\n");
        let derived = matrix("ID\tS1\tS2\nK1\t2.0\t3.0\n");
        let ratios = norm_expression(&base, &derived).unwrap();
        assert_eq!(ratios.get("S1", "K1"), None);
        assert!((ratios.get("S2", "K1").unwrap() - 1.5).abs() < 1e-10);
        assert!(ratios.iter().all(|(_, v)| v.values().all(|r| r.is_finite())));
    }

    #[test]
    fn test_ratio_overflow_skipped() {
        let base = matrix("ID\tS\nK1\t1e-300\nK2\t2\n");
        let derived = matrix("ID\tS\nK1\t1e300\nK2\t1\n");
        let ratios = norm_expression(&base, &derived).unwrap();
        assert_eq!(ratios.get("S", "K1"), None);
        assert_eq!(ratios.get("S", "K2"), Some(0.5));
    }

    #[test]
    fn test_skipped_ratios_survive_tsv_roundtrip() {
        let base = matrix("ID\tS1\tS2\nK1\t2\t1\nK2\t0\t1\n");
        let derived = matrix("ID\tS1\tS2\nK1\t4\t1\nK2\t1\t1\n");
        let ratios = norm_expression(&base, &derived).unwrap();

        let mut buf = Vec::new();
        ratios.write_tsv(&mut buf).unwrap();
        let reparsed = SampleMatrix::from_reader(buf.as_slice()).unwrap();
        assert_eq!(reparsed, ratios);
        assert_eq!(reparsed.get("S1", "K2"), None);
    }

    #[test]
    fn test_ratio_zero_expression_kept() {
        let base = matrix("ID\tS\nK1\t5\n");
        let derived = matrix("ID\tS\nK1\t0\n");
        let ratios = norm_expression(&base, &derived).unwrap();
        assert_eq!(ratios.get("S", "K1"), Some(0.0));
    }

    #[test]
    fn test_ratio_follows_derived_sample_order() {
        let base = matrix("ID\tS1\tS2\nK1\t1\t2\n");
        let derived = matrix("ID\tS2\tS1\nK1\t4\t3\n");
        let ratios = norm_expression(&base, &derived).unwrap();
        assert_eq!(ratios.sample_ids(), &["S2", "S1"]);
        assert!((ratios.get("S1", "K1").unwrap() - 3.0).abs() < 1e-10);
        assert!((ratios.get("S2", "K1").unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_sample_mismatch() {
        let base = matrix("ID\tS1\nK1\t1\n");
        let derived = matrix("ID\tS1\tS2\nK1\t1\t1\n");
        let err = norm_expression(&base, &derived).unwrap_err();
        assert!(matches!(err, KeggError::SampleMismatch(_)));
    }
}
