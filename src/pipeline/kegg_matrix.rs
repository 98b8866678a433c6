//! Orthology -> reaction matrices for one run, with optional transcriptome.

use crate::aggregate::aggregate_reactions;
use crate::data::{
    CategoryMatrix, IdentifierMatrix, RatioMatrix, ReferenceMapping, SampleGroups, SampleMatrix,
};
use crate::error::Result;
use crate::group::{group_average_all, GroupAverage};
use crate::normalize::norm_expression;
use std::collections::BTreeMap;
use std::path::Path;

/// Matrices derived from a transcriptome layered over the orthology matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptomeMatrices {
    orthology_matrix: IdentifierMatrix,
    reaction_matrix: CategoryMatrix,
    orthology_expression: RatioMatrix,
    reaction_expression: CategoryMatrix,
}

impl TranscriptomeMatrices {
    fn build(
        reference: &ReferenceMapping,
        genomic: &IdentifierMatrix,
        transcriptome: IdentifierMatrix,
    ) -> Result<Self> {
        log::info!("Calculating reaction transcriptome abundances");
        let reaction_matrix = aggregate_reactions(reference, &transcriptome);

        log::info!("Calculating normalized expression abundances");
        let orthology_expression = norm_expression(genomic, &transcriptome)?;

        log::info!("Calculating reaction expression abundances");
        let reaction_expression = aggregate_reactions(reference, &orthology_expression);

        Ok(Self {
            orthology_matrix: transcriptome,
            reaction_matrix,
            orthology_expression,
            reaction_expression,
        })
    }

    /// Parsed transcript abundances per orthology identifier.
    pub fn orthology_matrix(&self) -> &IdentifierMatrix {
        &self.orthology_matrix
    }

    /// Reaction abundances from raw transcript counts.
    pub fn reaction_matrix(&self) -> &CategoryMatrix {
        &self.reaction_matrix
    }

    /// Transcript / genomic ratio per orthology identifier.
    pub fn orthology_expression(&self) -> &RatioMatrix {
        &self.orthology_expression
    }

    /// Reaction abundances from expression ratios.
    pub fn reaction_expression(&self) -> &CategoryMatrix {
        &self.reaction_expression
    }
}

/// Reaction abundance matrices for one run.
///
/// Built once from the inputs; the pipeline runs a second time on expression
/// ratios when a transcriptome is supplied.
///
/// # Example
/// ```ignore
/// let reference = ReferenceMapping::from_tsv("reaction_to_orthology.tsv")?;
/// let kegg = KeggMatrix::from_paths(&reference, Path::new("ko.tsv"), None)?;
/// let abundance = kegg.reaction_matrix().get("sample_1", "R00001");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KeggMatrix {
    orthology_matrix: IdentifierMatrix,
    reaction_matrix: CategoryMatrix,
    transcriptome: Option<TranscriptomeMatrices>,
}

impl KeggMatrix {
    /// Parse the input tables and aggregate them.
    ///
    /// The transcriptome header must list the same samples, in the same
    /// order, as the orthology matrix.
    pub fn from_paths(
        reference: &ReferenceMapping,
        matrix: &Path,
        transcriptome: Option<&Path>,
    ) -> Result<Self> {
        log::info!("Parsing input matrix: {}", matrix.display());
        let orthology_matrix = SampleMatrix::from_tsv(matrix)?;

        let transcriptome_matrix = match transcriptome {
            Some(path) => {
                log::info!("Parsing input transcriptome: {}", path.display());
                Some(SampleMatrix::from_tsv_with_samples(
                    path,
                    orthology_matrix.sample_ids(),
                )?)
            }
            None => None,
        };

        Self::from_matrices(reference, orthology_matrix, transcriptome_matrix)
    }

    /// Aggregate already parsed matrices.
    pub fn from_matrices(
        reference: &ReferenceMapping,
        orthology_matrix: IdentifierMatrix,
        transcriptome: Option<IdentifierMatrix>,
    ) -> Result<Self> {
        log::info!("Calculating reaction abundances");
        let reaction_matrix = aggregate_reactions(reference, &orthology_matrix);

        let transcriptome = match transcriptome {
            Some(t) => Some(TranscriptomeMatrices::build(reference, &orthology_matrix, t)?),
            None => None,
        };

        Ok(Self {
            orthology_matrix,
            reaction_matrix,
            transcriptome,
        })
    }

    /// Parsed orthology abundances.
    pub fn orthology_matrix(&self) -> &IdentifierMatrix {
        &self.orthology_matrix
    }

    /// Reaction abundances from the orthology matrix.
    pub fn reaction_matrix(&self) -> &CategoryMatrix {
        &self.reaction_matrix
    }

    /// Transcriptome-derived matrices, if a transcriptome was supplied.
    pub fn transcriptome(&self) -> Option<&TranscriptomeMatrices> {
        self.transcriptome.as_ref()
    }

    /// Sample identifiers shared by every matrix of the run.
    pub fn sample_ids(&self) -> &[String] {
        self.orthology_matrix.sample_ids()
    }

    /// Derived matrices by output name, in pipeline order.
    pub fn tables(&self) -> Vec<(&'static str, &SampleMatrix)> {
        let mut tables = vec![("reaction_abundance", &self.reaction_matrix)];
        if let Some(t) = &self.transcriptome {
            tables.push(("reaction_transcriptome", &t.reaction_matrix));
            tables.push(("orthology_expression", &t.orthology_expression));
            tables.push(("reaction_expression", &t.reaction_expression));
        }
        tables
    }

    /// Average every derived matrix over every sample group.
    ///
    /// Fails on the first group naming a sample the run does not have.
    pub fn group_abundances(
        &self,
        groups: &SampleGroups,
    ) -> Result<BTreeMap<&'static str, BTreeMap<String, GroupAverage>>> {
        let mut grouped = BTreeMap::new();
        for (name, matrix) in self.tables() {
            log::info!("Averaging {} over {} sample groups", name, groups.len());
            grouped.insert(name, group_average_all(groups, matrix)?);
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeggError;

    fn matrix(text: &str) -> IdentifierMatrix {
        SampleMatrix::from_reader(text.as_bytes()).unwrap()
    }

    fn reference() -> ReferenceMapping {
        ReferenceMapping::from_pairs([("R1", "K1"), ("R1", "K2"), ("R2", "K3")])
    }

    #[test]
    fn test_genomic_only() {
        let kegg = KeggMatrix::from_matrices(
            &reference(),
            matrix("ID\tS1\tS2\nK1\t4\t0\nK2\t6\t0\nK3\t1\t2\n"),
            None,
        )
        .unwrap();

        assert!(kegg.transcriptome().is_none());
        assert_eq!(kegg.sample_ids(), &["S1", "S2"]);
        assert!((kegg.reaction_matrix().get("S1", "R1").unwrap() - 5.0).abs() < 1e-10);
        assert_eq!(kegg.reaction_matrix().get("S2", "R1"), Some(0.0));
        assert_eq!(kegg.tables().len(), 1);
    }

    #[test]
    fn test_with_transcriptome() {
        let kegg = KeggMatrix::from_matrices(
            &reference(),
            matrix("ID\tS1\tS2\nK1\t4\t0\nK2\t2\t1\nK3\t1\t2\n"),
            Some(matrix("ID\tS1\tS2\nK1\t2\t5\nK2\t4\t1\nK4\t9\t9\n")),
        )
        .unwrap();

        let t = kegg.transcriptome().unwrap();
        // raw transcript counts: R1 = mean(2, 4), R2 has no K3 transcripts
        assert!((t.reaction_matrix().get("S1", "R1").unwrap() - 3.0).abs() < 1e-10);
        assert_eq!(t.reaction_matrix().get("S1", "R2"), Some(0.0));

        // ratios: S1 K1 = 0.5, K2 = 2.0; S2 K1 skipped (zero genomic), K2 = 1.0
        let ratios = t.orthology_expression();
        assert!((ratios.get("S1", "K1").unwrap() - 0.5).abs() < 1e-10);
        assert!((ratios.get("S1", "K2").unwrap() - 2.0).abs() < 1e-10);
        assert_eq!(ratios.get("S2", "K1"), None);
        assert_eq!(ratios.get("S1", "K4"), None);

        let expression = t.reaction_expression();
        assert!((expression.get("S1", "R1").unwrap() - 1.25).abs() < 1e-10);
        assert!((expression.get("S2", "R1").unwrap() - 1.0).abs() < 1e-10);
        assert_eq!(expression.get("S2", "R2"), Some(0.0));

        let names: Vec<&str> = kegg.tables().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "reaction_abundance",
                "reaction_transcriptome",
                "orthology_expression",
                "reaction_expression"
            ]
        );
    }

    #[test]
    fn test_reaction_expression_matches_reparsed_ratios() {
        let reference = ReferenceMapping::from_pairs([("R1", "K1"), ("R1", "K2")]);
        let kegg = KeggMatrix::from_matrices(
            &reference,
            matrix("ID\tS1\tS2\nK1\t2\t1\nK2\t0\t1\n"),
            Some(matrix("ID\tS1\tS2\nK1\t4\t1\nK2\t1\t1\n")),
        )
        .unwrap();
        let t = kegg.transcriptome().unwrap();
        // K2 has no genomic copies in S1, so R1 is K1's ratio alone
        assert!((t.reaction_expression().get("S1", "R1").unwrap() - 2.0).abs() < 1e-10);

        let mut buf = Vec::new();
        t.orthology_expression().write_tsv(&mut buf).unwrap();
        let reparsed = SampleMatrix::from_reader(buf.as_slice()).unwrap();
        assert_eq!(&aggregate_reactions(&reference, &reparsed), t.reaction_expression());
    }

    #[test]
    fn test_transcriptome_sample_mismatch() {
        let err = KeggMatrix::from_matrices(
            &reference(),
            matrix("ID\tS1\nK1\t1\n"),
            Some(matrix("ID\tS2\nK1\t1\n")),
        )
        .unwrap_err();
        assert!(matches!(err, KeggError::SampleMismatch(_)));
    }

    #[test]
    fn test_group_abundances() {
        let kegg = KeggMatrix::from_matrices(
            &reference(),
            matrix("ID\tS1\tS2\tS3\nK1\t2\t4\t0\nK3\t1\t1\t0\n"),
            None,
        )
        .unwrap();

        let mut groups = SampleGroups::new();
        groups.insert("wet", "S1");
        groups.insert("wet", "S2");
        groups.insert("dry", "S3");

        let grouped = kegg.group_abundances(&groups).unwrap();
        let reactions = &grouped["reaction_abundance"];
        assert!((reactions["wet"].get("R1").unwrap() - 3.0).abs() < 1e-10);
        assert!(reactions["dry"].is_empty());

        groups.insert("dry", "S9");
        let err = kegg.group_abundances(&groups).unwrap_err();
        assert!(matches!(err, KeggError::ConfigurationMismatch(_)));
    }
}
