//! Averaging of per-sample values across a group of samples.

use crate::data::{SampleGroups, SampleMatrix};
use crate::error::{KeggError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Group-level values: key -> mean across the group's samples.
///
/// Only strictly positive means are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAverage {
    /// Samples averaged, sorted.
    samples: Vec<String>,
    /// Data stored as key -> averaged value.
    values: BTreeMap<String, f64>,
}

impl GroupAverage {
    /// Averaged value for a key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Samples that contributed, sorted.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Iterate over (key, value) in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> + '_ {
        self.values.iter()
    }

    /// Number of retained keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key was retained.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write the averages to a two-column TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "ID\tmean")?;
        for (key, value) in &self.values {
            writeln!(writer, "{}\t{}", key, value)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Average `matrix` across the requested samples.
///
/// Duplicate names are ignored and the result does not depend on the order
/// of `samples`. The key universe is the union of the keys the requested
/// samples hold; each key is averaged over the samples that hold it. Keys
/// whose mean is not strictly positive are dropped.
///
/// # Errors
/// - `InvalidParameter` if `samples` is empty
/// - `ConfigurationMismatch` if a requested sample is not a column of `matrix`
pub fn group_average<S: AsRef<str>>(samples: &[S], matrix: &SampleMatrix) -> Result<GroupAverage> {
    if samples.is_empty() {
        return Err(KeggError::InvalidParameter(
            "Sample group must contain at least one sample".to_string(),
        ));
    }

    let requested: BTreeSet<&str> = samples.iter().map(AsRef::as_ref).collect();
    let missing: Vec<&str> = requested
        .iter()
        .copied()
        .filter(|s| !matrix.contains_sample(s))
        .collect();
    if !missing.is_empty() {
        return Err(KeggError::ConfigurationMismatch(format!(
            "samples [{}] are not columns of the matrix (available: [{}])",
            missing.join(", "),
            matrix.sample_ids().join(", ")
        )));
    }

    // key -> (sum, number of samples holding the key)
    let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for values in requested.iter().filter_map(|s| matrix.sample(s)) {
        for (key, &value) in values {
            let entry = totals.entry(key.as_str()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let values = totals
        .into_iter()
        .filter_map(|(key, (sum, n))| {
            let mean = sum / n as f64;
            (mean > 0.0).then(|| (key.to_string(), mean))
        })
        .collect();

    Ok(GroupAverage {
        samples: requested.into_iter().map(str::to_string).collect(),
        values,
    })
}

/// Average `matrix` for every group in `groups`.
pub fn group_average_all(
    groups: &SampleGroups,
    matrix: &SampleMatrix,
) -> Result<BTreeMap<String, GroupAverage>> {
    let mut averages = BTreeMap::new();
    for (group, samples) in groups.iter() {
        let members: Vec<&str> = samples.iter().map(String::as_str).collect();
        let average = group_average(members.as_slice(), matrix).map_err(|e| match e {
            KeggError::ConfigurationMismatch(msg) => {
                KeggError::ConfigurationMismatch(format!("group '{}': {}", group, msg))
            }
            other => other,
        })?;
        log::info!(
            "Group '{}': {} samples, {} keys retained",
            group,
            average.samples().len(),
            average.len()
        );
        averages.insert(group.clone(), average);
    }
    Ok(averages)
}

/// Write several group averages as one TSV (keys x groups).
///
/// Keys dropped from a group are written as `0`.
pub fn write_group_table<P: AsRef<Path>>(
    averages: &BTreeMap<String, GroupAverage>,
    path: P,
) -> Result<()> {
    let keys: BTreeSet<&str> = averages
        .values()
        .flat_map(|a| a.iter().map(|(k, _)| k.as_str()))
        .collect();

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write!(writer, "ID")?;
    for group in averages.keys() {
        write!(writer, "\t{}", group)?;
    }
    writeln!(writer)?;

    for key in keys {
        write!(writer, "{}", key)?;
        for average in averages.values() {
            write!(writer, "\t{}", average.get(key).unwrap_or(0.0))?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn matrix(text: &str) -> SampleMatrix {
        SampleMatrix::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_mean_across_samples() {
        let mat = matrix("ID\tS1\tS2\tS3\nR1\t1\t3\t100\nR2\t2\t2\t0\n");
        let avg = group_average(&["S1", "S2"], &mat).unwrap();
        assert!((avg.get("R1").unwrap() - 2.0).abs() < 1e-10);
        assert!((avg.get("R2").unwrap() - 2.0).abs() < 1e-10);
        assert_eq!(avg.samples(), &["S1", "S2"]);
    }

    #[test]
    fn test_non_positive_means_dropped() {
        let mat = matrix("ID\tS1\tS2\nR1\t-1.0\t-3.0\nR2\t0\t0\nR3\t0.05\t0.15\nR4\t-1\t1\n");
        let avg = group_average(&["S1", "S2"], &mat).unwrap();
        assert!(avg.get("R1").is_none());
        assert!(avg.get("R2").is_none());
        assert!(avg.get("R4").is_none());
        assert!((avg.get("R3").unwrap() - 0.1).abs() < 1e-10);
        assert_eq!(avg.len(), 1);
    }

    #[test]
    fn test_order_and_duplicates_do_not_matter() {
        let mat = matrix("ID\tS1\tS2\tS3\nR1\t0.1\t0.2\t0.7\nR2\t1e-3\t5\t9\n");
        let forward = group_average(&["S1", "S2", "S3"], &mat).unwrap();
        let reversed = group_average(&["S3", "S2", "S1", "S2"], &mat).unwrap();
        assert_eq!(forward, reversed);
        assert_eq!(forward, group_average(&["S1", "S2", "S3"], &mat).unwrap());
    }

    #[test]
    fn test_missing_sample_is_configuration_mismatch() {
        let mat = matrix("ID\tS1\tS2\nR1\t1\t2\n");
        let err = group_average(&["S1", "S9"], &mat).unwrap_err();
        match err {
            KeggError::ConfigurationMismatch(msg) => assert!(msg.contains("S9")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_group() {
        let mat = matrix("ID\tS1\nR1\t1\n");
        let empty: [&str; 0] = [];
        let err = group_average(&empty, &mat).unwrap_err();
        assert!(matches!(err, KeggError::InvalidParameter(_)));
    }

    #[test]
    fn test_key_universe_is_union_of_samples() {
        let mut data = BTreeMap::new();
        data.insert(
            "S1".to_string(),
            [("K1".to_string(), 2.0)].into_iter().collect(),
        );
        data.insert(
            "S2".to_string(),
            [("K1".to_string(), 4.0), ("K2".to_string(), 6.0)]
                .into_iter()
                .collect(),
        );
        let mat = SampleMatrix::new(
            vec!["S1".to_string(), "S2".to_string()],
            vec!["K1".to_string(), "K2".to_string()],
            data,
        )
        .unwrap();

        let avg = group_average(&["S2", "S1"], &mat).unwrap();
        assert!((avg.get("K1").unwrap() - 3.0).abs() < 1e-10);
        // only S2 holds K2
        assert!((avg.get("K2").unwrap() - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_group_average_all() {
        let mat = matrix("ID\tS1\tS2\tS3\nR1\t1\t3\t10\n");
        let mut groups = SampleGroups::new();
        groups.insert("control", "S1");
        groups.insert("control", "S2");
        groups.insert("burnt", "S3");

        let averages = group_average_all(&groups, &mat).unwrap();
        assert_eq!(averages.len(), 2);
        assert!((averages["control"].get("R1").unwrap() - 2.0).abs() < 1e-10);
        assert!((averages["burnt"].get("R1").unwrap() - 10.0).abs() < 1e-10);

        groups.insert("burnt", "S4");
        let err = group_average_all(&groups, &mat).unwrap_err();
        match err {
            KeggError::ConfigurationMismatch(msg) => assert!(msg.contains("burnt")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_group_average_to_tsv() {
        let mat = matrix("ID\tS1\tS2\nR1\t1\t2\nR2\t0\t0\n");
        let avg = group_average(&["S1", "S2"], &mat).unwrap();

        let file = NamedTempFile::new().unwrap();
        avg.to_tsv(file.path()).unwrap();
        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "ID\tmean\nR1\t1.5\n");
    }

    #[test]
    fn test_write_group_table() {
        let mat = matrix("ID\tS1\tS2\nR1\t1\t0\nR2\t0\t4\n");
        let mut groups = SampleGroups::new();
        groups.insert("a", "S1");
        groups.insert("b", "S2");
        let averages = group_average_all(&groups, &mat).unwrap();

        let file = NamedTempFile::new().unwrap();
        write_group_table(&averages, file.path()).unwrap();
        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "ID\ta\tb\nR1\t1\t0\nR2\t0\t4\n");
    }
}
