use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::ontology::parse_annotation_override;

#[derive(Parser, Debug)]
#[command(
    name = "battery-model-mapper",
    version,
    about = "Convert battery parameter sets between JSON schemas using ontology path annotations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Mappings(MappingsArgs),
    Convert(ConvertArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnnotationArgs {
    /// Extra or replacement schema annotation, as `key=iri`.
    #[arg(long = "annotation", value_parser = parse_annotation_override)]
    pub annotations: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct MappingsArgs {
    #[arg(long)]
    pub ontology: PathBuf,

    #[arg(long)]
    pub input_type: String,

    #[arg(long)]
    pub output_type: String,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub annotation: AnnotationArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long, required_unless_present = "mapping_table", conflicts_with = "mapping_table")]
    pub ontology: Option<PathBuf>,

    /// Previously resolved table written by `mappings --output`.
    #[arg(long)]
    pub mapping_table: Option<PathBuf>,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub template: PathBuf,

    #[arg(long)]
    pub input_type: String,

    #[arg(long)]
    pub output_type: String,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub defaults_report: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// Text used for the header description instead of the input path.
    #[arg(long)]
    pub source_label: Option<String>,

    #[command(flatten)]
    pub annotation: AnnotationArgs,
}
