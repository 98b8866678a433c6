//! Named sample groups read from a metadata table.

use crate::error::{KeggError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Assignment of samples to named groups (e.g. treatment / control).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleGroups {
    /// Data stored as group name -> member sample ids.
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl SampleGroups {
    /// Create empty groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load groups from a metadata TSV, using the first variable column.
    ///
    /// Expected format:
    /// - First row: header (first column is sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    ///
    /// Samples with an empty or `NA` group are left out.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), None)
    }

    /// Load groups from a metadata TSV, using the named column.
    pub fn from_tsv_column<P: AsRef<Path>>(path: P, column: &str) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), Some(column))
    }

    /// Parse groups from a buffered reader; `column` defaults to the first
    /// variable column.
    pub fn from_reader<R: BufRead>(reader: R, column: Option<&str>) -> Result<Self> {
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| KeggError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
        if header.len() < 2 {
            return Err(KeggError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }

        let col_idx = match column {
            Some(name) => header
                .iter()
                .skip(1)
                .position(|h| h.trim() == name)
                .map(|i| i + 1)
                .ok_or_else(|| {
                    KeggError::ConfigurationMismatch(format!(
                        "column '{}' not found in metadata header",
                        name
                    ))
                })?,
            None => 1,
        };

        let mut groups = Self::new();
        let mut assigned: BTreeSet<String> = BTreeSet::new();
        for line_result in lines {
            let line = line_result?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].trim();
            if !assigned.insert(sample_id.to_string()) {
                return Err(KeggError::MalformedInput(format!(
                    "sample '{}' listed twice in metadata",
                    sample_id
                )));
            }

            let group = fields.get(col_idx).map(|g| g.trim()).unwrap_or("");
            if group.is_empty() || group == "NA" || group == "na" {
                continue;
            }
            groups.insert(group, sample_id);
        }

        if groups.is_empty() {
            return Err(KeggError::EmptyData(
                "No sample groups in metadata".to_string(),
            ));
        }

        Ok(groups)
    }

    /// Add a sample to a group.
    pub fn insert(&mut self, group: impl Into<String>, sample_id: impl Into<String>) {
        self.groups
            .entry(group.into())
            .or_default()
            .insert(sample_id.into());
    }

    /// Samples belonging to a group.
    pub fn samples(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }

    /// Iterate over (group, samples) in group-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> + '_ {
        self.groups.iter()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
