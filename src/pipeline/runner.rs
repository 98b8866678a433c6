//! Configured runs: load inputs, build the matrices, write the outputs.

use crate::data::{ReferenceMapping, SampleGroups, SampleMatrix};
use crate::error::{KeggError, Result};
use crate::group::{write_group_table, GroupAverage};
use crate::pipeline::KeggMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Output format for the results of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One TSV per matrix.
    #[default]
    Tsv,
    /// TSVs plus a `results.json` dump of every matrix and group average.
    Json,
}

/// Run configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Name of the run.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Reaction -> orthology reference TSV.
    pub reference: PathBuf,
    /// Orthology abundance matrix TSV.
    pub matrix: PathBuf,
    /// Optional transcriptome matrix TSV with the same samples.
    #[serde(default)]
    pub transcriptome: Option<PathBuf>,
    /// Optional metadata TSV assigning samples to groups.
    #[serde(default)]
    pub groups: Option<PathBuf>,
    /// Metadata column holding the group; defaults to the first one.
    #[serde(default)]
    pub group_column: Option<String>,
    /// Directory receiving the output tables.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

impl RunConfig {
    /// Create a configuration with the required inputs and no options.
    pub fn new(
        name: impl Into<String>,
        reference: impl Into<PathBuf>,
        matrix: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            reference: reference.into(),
            matrix: matrix.into(),
            transcriptome: None,
            groups: None,
            group_column: None,
            output_dir: output_dir.into(),
            format: OutputFormat::default(),
        }
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(KeggError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(KeggError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Example configuration with every option filled in.
    pub fn example() -> Self {
        Self {
            name: "reaction_abundance".to_string(),
            description: Some(
                "Reaction abundances and expression ratios for burnt vs control soils".to_string(),
            ),
            reference: PathBuf::from("reaction_to_orthology.tsv"),
            matrix: PathBuf::from("metagenome_ko.tsv"),
            transcriptome: Some(PathBuf::from("metatranscriptome_ko.tsv")),
            groups: Some(PathBuf::from("metadata.tsv")),
            group_column: Some("treatment".to_string()),
            output_dir: PathBuf::from("kegg_matrix_output"),
            format: OutputFormat::Tsv,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Name of the run.
    pub name: String,
    /// Number of samples.
    pub n_samples: usize,
    /// Number of reactions in the reference.
    pub n_reactions: usize,
    /// Whether a transcriptome was layered in.
    pub with_transcriptome: bool,
    /// Files written, in order.
    pub outputs: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ResultsDump<'a> {
    name: &'a str,
    sample_ids: &'a [String],
    matrices: BTreeMap<&'static str, &'a SampleMatrix>,
    groups: &'a BTreeMap<&'static str, BTreeMap<String, GroupAverage>>,
}

/// Execute a configured run.
///
/// Every matrix and group average is computed before anything is written, so
/// a failing run leaves no partial output behind.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    log::info!("Loading reference mapping: {}", config.reference.display());
    let reference = ReferenceMapping::from_tsv(&config.reference)?;

    let groups = match &config.groups {
        Some(path) => {
            log::info!("Loading sample groups: {}", path.display());
            Some(match &config.group_column {
                Some(column) => SampleGroups::from_tsv_column(path, column)?,
                None => SampleGroups::from_tsv(path)?,
            })
        }
        None => None,
    };

    let kegg = KeggMatrix::from_paths(
        &reference,
        &config.matrix,
        config.transcriptome.as_deref(),
    )?;

    let grouped = match &groups {
        Some(groups) => kegg.group_abundances(groups)?,
        None => BTreeMap::new(),
    };

    std::fs::create_dir_all(&config.output_dir)?;
    let mut outputs = Vec::new();

    for (name, matrix) in kegg.tables() {
        let path = config.output_dir.join(format!("{}.tsv", name));
        log::info!("Writing {}", path.display());
        matrix.to_tsv(&path)?;
        outputs.push(path);

        if let Some(averages) = grouped.get(name) {
            let path = config.output_dir.join(format!("{}_groups.tsv", name));
            log::info!("Writing {}", path.display());
            write_group_table(averages, &path)?;
            outputs.push(path);
        }
    }

    if config.format == OutputFormat::Json {
        let path = config.output_dir.join("results.json");
        log::info!("Writing {}", path.display());
        let dump = ResultsDump {
            name: &config.name,
            sample_ids: kegg.sample_ids(),
            matrices: kegg.tables().into_iter().collect(),
            groups: &grouped,
        };
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, &dump)?;
        outputs.push(path);
    }

    Ok(RunReport {
        name: config.name.clone(),
        n_samples: kegg.sample_ids().len(),
        n_reactions: reference.len(),
        with_transcriptome: kegg.transcriptome().is_some(),
        outputs,
    })
}
