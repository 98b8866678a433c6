//! Per-sample abundance tables keyed by orthology identifier or reaction id.

use crate::error::{KeggError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Cell marker for a (sample, feature) pair with no value.
pub const MISSING_VALUE: &str = "NA";

/// Abundances stored as sample -> feature -> value.
///
/// Columns are samples, rows are features (orthology identifiers for parsed
/// input, reaction ids after aggregation). The table may be sparse: a
/// (sample, feature) pair can be absent, which is distinct from a stored zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMatrix {
    /// Sample identifiers (column names) in input order.
    sample_ids: Vec<String>,
    /// Feature identifiers (row names) in input order.
    feature_ids: Vec<String>,
    /// Data stored as sample_id -> feature_id -> value.
    data: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Orthology identifier abundances parsed from an input table.
pub type IdentifierMatrix = SampleMatrix;

/// Reaction abundances produced by aggregation.
pub type CategoryMatrix = SampleMatrix;

/// Transcript / genomic expression ratios.
pub type RatioMatrix = SampleMatrix;

impl SampleMatrix {
    /// Create a new SampleMatrix, checking that identifiers and data agree.
    pub fn new(
        sample_ids: Vec<String>,
        feature_ids: Vec<String>,
        data: BTreeMap<String, BTreeMap<String, f64>>,
    ) -> Result<Self> {
        ensure_unique(&sample_ids, "sample")?;
        ensure_unique(&feature_ids, "feature")?;

        if data.len() != sample_ids.len() {
            return Err(KeggError::SampleMismatch(format!(
                "{} sample ids declared but data holds {} samples",
                sample_ids.len(),
                data.len()
            )));
        }

        let known_features: HashSet<&str> = feature_ids.iter().map(String::as_str).collect();
        for sample_id in &sample_ids {
            let values = data.get(sample_id).ok_or_else(|| {
                KeggError::SampleMismatch(format!("no data for sample '{}'", sample_id))
            })?;
            if let Some(unknown) = values.keys().find(|k| !known_features.contains(k.as_str())) {
                return Err(KeggError::MalformedInput(format!(
                    "sample '{}' holds undeclared feature '{}'",
                    sample_id, unknown
                )));
            }
        }

        Ok(Self::from_parts(sample_ids, feature_ids, data))
    }

    /// Assemble a matrix whose invariants already hold by construction.
    pub(crate) fn from_parts(
        sample_ids: Vec<String>,
        feature_ids: Vec<String>,
        data: BTreeMap<String, BTreeMap<String, f64>>,
    ) -> Self {
        Self {
            sample_ids,
            feature_ids,
            data,
        }
    }

    /// Load a matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the identifier header)
    /// - Subsequent rows: identifier followed by one value per sample
    ///
    /// Values must be finite numbers. A cell holding `NA` leaves that
    /// (sample, identifier) pair absent.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a matrix from a TSV file whose header must list `expected_samples`
    /// in exactly that order.
    ///
    /// Used for a second table (e.g. a transcriptome) that has to line up with
    /// an already parsed one.
    pub fn from_tsv_with_samples<P: AsRef<Path>>(
        path: P,
        expected_samples: &[String],
    ) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader_with_samples(BufReader::new(file), expected_samples)
    }

    /// Parse a matrix from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        parse_tsv(reader, None)
    }

    /// Parse a matrix from a buffered reader, requiring the header to match
    /// `expected_samples`.
    pub fn from_reader_with_samples<R: BufRead>(
        reader: R,
        expected_samples: &[String],
    ) -> Result<Self> {
        parse_tsv(reader, Some(expected_samples))
    }

    /// Write the matrix to a TSV file.
    ///
    /// Absent (sample, feature) pairs are written as `NA`, so that parsing
    /// the file back yields the same matrix.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_tsv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the matrix as TSV to an arbitrary writer.
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> Result<()> {
        write!(writer, "ID")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for feature_id in &self.feature_ids {
            write!(writer, "{}", feature_id)?;
            for sample_id in &self.sample_ids {
                match self.get(sample_id, feature_id) {
                    Some(value) => write!(writer, "\t{}", value)?,
                    None => write!(writer, "\t{}", MISSING_VALUE)?,
                }
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Get the value for a sample and feature, if present.
    #[inline]
    pub fn get(&self, sample_id: &str, feature_id: &str) -> Option<f64> {
        self.data.get(sample_id)?.get(feature_id).copied()
    }

    /// All values held for one sample.
    #[inline]
    pub fn sample(&self, sample_id: &str) -> Option<&BTreeMap<String, f64>> {
        self.data.get(sample_id)
    }

    /// Whether the sample is a column of this matrix.
    #[inline]
    pub fn contains_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Total number of stored (sample, feature) entries.
    pub fn nnz(&self) -> usize {
        self.data.values().map(BTreeMap::len).sum()
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Iterate over samples in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, f64>)> + '_ {
        self.sample_ids
            .iter()
            .filter_map(move |s| self.data.get(s).map(|values| (s.as_str(), values)))
    }
}

fn ensure_unique(ids: &[String], kind: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(KeggError::MalformedInput(format!(
                "duplicate {} id '{}'",
                kind, id
            )));
        }
    }
    Ok(())
}

fn parse_tsv<R: BufRead>(reader: R, expected_samples: Option<&[String]>) -> Result<SampleMatrix> {
    let mut lines = reader.lines();

    // Parse header
    let header_line = lines
        .next()
        .ok_or_else(|| KeggError::EmptyData("Empty TSV file".to_string()))??;
    let header: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
    if header.len() < 2 {
        return Err(KeggError::EmptyData(
            "TSV must have at least one sample".to_string(),
        ));
    }
    let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
    if let Some(pos) = sample_ids.iter().position(|s| s.is_empty()) {
        return Err(KeggError::MalformedInput(format!(
            "empty sample name in header column {}",
            pos + 2
        )));
    }
    ensure_unique(&sample_ids, "sample")?;

    if let Some(expected) = expected_samples {
        if expected != sample_ids.as_slice() {
            return Err(KeggError::SampleMismatch(format!(
                "header declares [{}] but expected [{}]",
                sample_ids.join(", "),
                expected.join(", ")
            )));
        }
    }

    let n_columns = header.len();
    let mut data: BTreeMap<String, BTreeMap<String, f64>> = sample_ids
        .iter()
        .map(|s| (s.clone(), BTreeMap::new()))
        .collect();
    let mut feature_ids: Vec<String> = Vec::new();
    let mut seen_features: HashSet<String> = HashSet::new();

    // Header is line 1
    for (idx, line_result) in lines.enumerate() {
        let line_no = idx + 2;
        let line = line_result?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != n_columns {
            return Err(KeggError::ColumnCountMismatch {
                line: line_no,
                expected: n_columns,
                actual: fields.len(),
            });
        }

        let feature_id = fields[0].trim();
        if feature_id.is_empty() {
            return Err(KeggError::MalformedInput(format!(
                "missing identifier at line {}",
                line_no
            )));
        }
        if !seen_features.insert(feature_id.to_string()) {
            return Err(KeggError::MalformedInput(format!(
                "duplicate identifier '{}' at line {}",
                feature_id, line_no
            )));
        }

        for (value_str, sample_id) in fields[1..].iter().zip(&sample_ids) {
            let raw = value_str.trim();
            if raw == MISSING_VALUE {
                continue;
            }
            let value = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| KeggError::InvalidValue {
                    value: value_str.to_string(),
                    line: line_no,
                    sample: sample_id.clone(),
                })?;
            if let Some(values) = data.get_mut(sample_id) {
                values.insert(feature_id.to_string(), value);
            }
        }
        feature_ids.push(feature_id.to_string());
    }

    if feature_ids.is_empty() {
        log::warn!(
            "Matrix header lists {} samples but no identifier rows follow",
            sample_ids.len()
        );
    }

    Ok(SampleMatrix::from_parts(sample_ids, feature_ids, data))
}
