//! kegg-matrix - reaction abundance CLI
//!
//! Command-line interface for aggregating orthology matrices into reactions.

use clap::{Parser, Subcommand, ValueEnum};
use kegg_matrix::error::Result;
use kegg_matrix::pipeline::{run, OutputFormat, RunConfig, RunReport};
use std::path::PathBuf;

/// CLI-friendly output format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    /// One TSV per matrix
    Tsv,
    /// TSVs plus a JSON dump of all results
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Tsv => OutputFormat::Tsv,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

/// Aggregate orthology abundances into reaction abundances
#[derive(Parser)]
#[command(name = "kegg-matrix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log missing identifiers and other debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a matrix (and optionally a transcriptome) into reactions
    Run {
        /// Path to reaction -> orthology reference TSV
        #[arg(short, long)]
        reference: PathBuf,

        /// Path to orthology abundance matrix TSV
        #[arg(short, long)]
        matrix: PathBuf,

        /// Path to transcriptome matrix TSV with the same samples
        #[arg(short, long)]
        transcriptome: Option<PathBuf>,

        /// Path to metadata TSV assigning samples to groups
        #[arg(short, long)]
        groups: Option<PathBuf>,

        /// Metadata column holding the group (default: first column)
        #[arg(long)]
        group_column: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: CliFormat,
    },

    /// Run from a YAML configuration file
    Config {
        /// Path to run configuration YAML
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate an example run configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "kegg_matrix.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match cli.command {
        Commands::Run {
            reference,
            matrix,
            transcriptome,
            groups,
            group_column,
            output,
            format,
        } => {
            let mut config = RunConfig::new("kegg_matrix", reference, matrix, output);
            config.transcriptome = transcriptome;
            config.groups = groups;
            config.group_column = group_column;
            config.format = format.into();
            cmd_run(&config)
        }

        Commands::Config { config } => cmd_config(&config),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run from an in-memory configuration
fn cmd_run(config: &RunConfig) -> Result<()> {
    log::info!("Running '{}'...", config.name);
    let report = run(config)?;
    print_report(&report);
    Ok(())
}

/// Run from a configuration file
fn cmd_config(config_path: &PathBuf) -> Result<()> {
    log::info!("Loading run configuration from {:?}...", config_path);
    let config = RunConfig::from_file(config_path)?;
    cmd_run(&config)
}

/// Write an example configuration
fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let yaml = RunConfig::example().to_yaml()?;
    std::fs::write(output_path, yaml)?;
    eprintln!("Example configuration written to {:?}", output_path);
    Ok(())
}

fn print_report(report: &RunReport) {
    eprintln!(
        "Done! {} samples x {} reactions{}",
        report.n_samples,
        report.n_reactions,
        if report.with_transcriptome {
            " (with transcriptome)"
        } else {
            ""
        }
    );
    for path in &report.outputs {
        eprintln!("  {}", path.display());
    }
}
