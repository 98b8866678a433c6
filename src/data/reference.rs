//! Reaction -> orthology reference mapping.

use crate::error::{KeggError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Mapping from category id (e.g. a reaction) to the identifiers it groups.
///
/// Aggregation only reads from it. Categories iterate in sorted order, which
/// fixes the row order of every aggregated matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMapping {
    members: BTreeMap<String, BTreeSet<String>>,
}

impl ReferenceMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from (category, member) pairs.
    pub fn from_pairs<I, C, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, M)>,
        C: Into<String>,
        M: Into<String>,
    {
        let mut mapping = Self::new();
        for (category, member) in pairs {
            mapping.insert(category, member);
        }
        mapping
    }

    /// Load a mapping from a TSV file.
    ///
    /// Each line is `category<TAB>member[<TAB>member...]`. A member field may
    /// itself hold a comma-separated list. Lines starting with `#` are ignored.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a mapping from any reader, in the format of [`Self::from_tsv`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut mapping = Self::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let mut fields = record.iter().map(str::trim);

            let category = match fields.next() {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };

            let mut n_members = 0;
            for member in fields
                .flat_map(|f| f.split(','))
                .map(str::trim)
                .filter(|m| !m.is_empty())
            {
                mapping.insert(category, member);
                n_members += 1;
            }

            if n_members == 0 {
                return Err(KeggError::MalformedInput(format!(
                    "category '{}' at line {} lists no member identifiers",
                    category, line
                )));
            }
        }

        if mapping.is_empty() {
            return Err(KeggError::EmptyData(
                "Reference mapping has no categories".to_string(),
            ));
        }

        log::info!(
            "Loaded reference mapping: {} categories, {} distinct identifiers",
            mapping.len(),
            mapping.identifiers().len()
        );

        Ok(mapping)
    }

    /// Add a member identifier to a category.
    pub fn insert(&mut self, category: impl Into<String>, member: impl Into<String>) {
        self.members
            .entry(category.into())
            .or_default()
            .insert(member.into());
    }

    /// Member identifiers of a category.
    pub fn members(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.members.get(category)
    }

    /// Category ids in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &String> + '_ {
        self.members.keys()
    }

    /// Iterate over (category, members) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> + '_ {
        self.members.iter()
    }

    /// Every identifier referenced by any category.
    pub fn identifiers(&self) -> BTreeSet<&str> {
        self.members
            .values()
            .flat_map(|m| m.iter().map(String::as_str))
            .collect()
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the mapping has no categories.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_groups_members() {
        let mapping = ReferenceMapping::from_pairs([
            ("R00002", "K00002"),
            ("R00001", "K00001"),
            ("R00001", "K00003"),
            ("R00001", "K00001"),
        ]);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.members("R00001").unwrap().len(), 2);
        let categories: Vec<&String> = mapping.categories().collect();
        assert_eq!(categories, vec!["R00001", "R00002"]);
        assert_eq!(mapping.identifiers().len(), 3);
    }

    #[test]
    fn test_from_reader_formats() {
        let text = "# reaction\tko\n\
                    R00001\tK00001\n\
                    R00001\tK00002\tK00003\n\
                    R00002\tK00004,K00005\n\
                    \n";
        let mapping = ReferenceMapping::from_reader(text.as_bytes()).unwrap();
        assert_eq!(mapping.len(), 2);

        let r1: Vec<&str> = mapping
            .members("R00001")
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(r1, vec!["K00001", "K00002", "K00003"]);
        assert!(mapping.members("R00002").unwrap().contains("K00005"));
        assert!(mapping.members("R99999").is_none());
    }

    #[test]
    fn test_from_reader_category_without_members() {
        let err = ReferenceMapping::from_reader("R00001\n".as_bytes()).unwrap_err();
        assert!(matches!(err, KeggError::MalformedInput(_)));
    }

    #[test]
    fn test_from_reader_empty() {
        let err = ReferenceMapping::from_reader("# only a comment\n".as_bytes()).unwrap_err();
        assert!(matches!(err, KeggError::EmptyData(_)));
    }
}
