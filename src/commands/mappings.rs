use anyhow::Result;
use tracing::info;

use crate::cli::MappingsArgs;
use crate::ontology::{AnnotationConfig, OntologyGraph, resolve_mappings};
use crate::util::write_json_pretty;

pub fn run(args: MappingsArgs) -> Result<()> {
    let config = AnnotationConfig::default().with_overrides(args.annotation.annotations);
    let graph = OntologyGraph::load(&args.ontology)?;
    let resolution = resolve_mappings(&graph, &config, &args.input_type, &args.output_type)?;

    for (source, target) in resolution.table.iter() {
        info!(source = %source, target = %target, "mapping");
    }

    if resolution.table.is_empty() {
        info!(
            input_type = %args.input_type,
            output_type = %args.output_type,
            "ontology has no subject annotated for both types"
        );
    }

    if let Some(output) = args.output {
        write_json_pretty(&output, &resolution.table)?;
        info!(path = %output.display(), mappings = resolution.table.len(), "wrote mapping table");
    }

    Ok(())
}
