use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::ConvertArgs;
use crate::mapper::{Diagnostic, ParameterMapper};
use crate::model::{
    ConversionCounts, ConversionPaths, ConversionRunManifest, MANIFEST_VERSION, SourceFile,
};
use crate::ontology::{AnnotationConfig, MappingTable, OntologyGraph, resolve_mappings};
use crate::util::{now_utc_string, read_json, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: ConvertArgs) -> Result<()> {
    let manifest = convert(&args)?;

    info!(
        run_id = %manifest.run_id,
        output = %manifest.paths.output_path,
        defaults_report = %manifest.paths.defaults_report_path,
        manifest = %manifest.paths.manifest_path,
        applied = manifest.counts.applied,
        defaults_used = manifest.counts.defaults_used,
        warnings = manifest.warnings.len(),
        "conversion completed"
    );
    Ok(())
}

pub fn convert(args: &ConvertArgs) -> Result<ConversionRunManifest> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("convert-{}", utc_compact_string(started_ts));

    info!(
        run_id = %run_id,
        input = %args.input.display(),
        input_type = %args.input_type,
        output_type = %args.output_type,
        "starting conversion"
    );

    let config = AnnotationConfig::default().with_overrides(args.annotation.annotations.clone());
    let (table, table_source, mut diagnostics) = load_mapping_table(args, &config)?;
    let literal_failures = diagnostics.len();

    let source: Value = read_json(&args.input)?;
    let template: Value = read_json(&args.template)?;

    let source_origin = args
        .source_label
        .clone()
        .unwrap_or_else(|| args.input.display().to_string());
    let mapper = ParameterMapper::new(&table, &template, &args.input_type, source_origin.clone())?;
    let outcome = mapper.map_parameters(&source);

    let defaults_report_path = args
        .defaults_report
        .clone()
        .unwrap_or_else(|| sibling_artifact(&args.output, "defaults_used"));
    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| sibling_artifact(&args.output, "manifest"));

    write_json_pretty(&args.output, &outcome.output)?;
    info!(path = %args.output.display(), "wrote converted parameter set");

    write_json_pretty(&defaults_report_path, &outcome.defaults_used)?;
    if !outcome.defaults_used.is_empty() {
        warn!(
            count = outcome.defaults_used.len(),
            path = %defaults_report_path.display(),
            "template defaults left in output"
        );
    }

    let counts = ConversionCounts::new(
        &outcome.stats,
        literal_failures,
        outcome.defaults_used.len(),
    );
    diagnostics.extend(outcome.diagnostics);

    let source_hashes = vec![
        table_source,
        hash_source("input", &args.input)?,
        hash_source("template", &args.template)?,
    ];

    let manifest = ConversionRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        status: "completed".to_string(),
        started_at,
        finished_at: now_utc_string(),
        input_type: args.input_type.clone(),
        output_type: args.output_type.clone(),
        source_origin,
        paths: ConversionPaths {
            output_path: args.output.display().to_string(),
            defaults_report_path: defaults_report_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts,
        source_hashes,
        warnings: diagnostics.iter().map(ToString::to_string).collect(),
    };

    write_json_pretty(&manifest_path, &manifest)?;
    Ok(manifest)
}

fn load_mapping_table(
    args: &ConvertArgs,
    config: &AnnotationConfig,
) -> Result<(MappingTable, SourceFile, Vec<Diagnostic>)> {
    match (&args.mapping_table, &args.ontology) {
        (Some(path), _) => {
            config.annotation_pair(&args.input_type, &args.output_type)?;
            let table: MappingTable = read_json(path)?;
            info!(path = %path.display(), mappings = table.len(), "loaded mapping table");
            Ok((table, hash_source("mapping_table", path)?, Vec::new()))
        }
        (None, Some(path)) => {
            let graph = OntologyGraph::load(path)?;
            let resolution =
                resolve_mappings(&graph, config, &args.input_type, &args.output_type)?;
            let diagnostics = resolution
                .literal_failures
                .into_iter()
                .map(Diagnostic::LiteralParse)
                .collect();
            Ok((resolution.table, hash_source("ontology", path)?, diagnostics))
        }
        (None, None) => bail!("either --ontology or --mapping-table is required"),
    }
}

fn hash_source(role: &str, path: &Path) -> Result<SourceFile> {
    Ok(SourceFile {
        role: role.to_string(),
        path: path.display().to_string(),
        sha256: sha256_file(path)?,
    })
}

/// `out/cell.json` + `manifest` -> `out/cell.manifest.json`.
fn sibling_artifact(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    output.with_file_name(format!("{stem}.{suffix}.json"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::cli::AnnotationArgs;

    const ONTOLOGY: &str = r#"
@prefix bmli: <https://w3id.org/emmo/domain/battery-model-lithium-ion#> .

bmli:ElectrodeArea
    bmli:bmli_0a5b99ee_995b_4899_a79b_925a4086da37 "['Parameterisation', 'Cell', 'Electrode area [m2]']" ;
    bmli:bmli_1b718841_5d72_4071_bb71_fc4a754f5e30 "['cell', 'area']" .

bmli:ReactionRate
    bmli:bmli_0a5b99ee_995b_4899_a79b_925a4086da37 "['Parameterisation', 'Negative electrode', 'Reaction rate constant [mol.m-2.s-1]']" ;
    bmli:bmli_1b718841_5d72_4071_bb71_fc4a754f5e30 "['electrodes', 'anode', 'kinetic_constant']" .

bmli:OpenCircuit
    bmli:bmli_0a5b99ee_995b_4899_a79b_925a4086da37 "['Parameterisation', 'Negative electrode', 'OCP [V]']" ;
    bmli:bmli_1b718841_5d72_4071_bb71_fc4a754f5e30 "['electrodes', 'anode', 'ocp'" .
"#;

    fn args(dir: &Path) -> ConvertArgs {
        ConvertArgs {
            ontology: Some(dir.join("ontology.ttl")),
            mapping_table: None,
            input: dir.join("cell.cidemod.json"),
            template: dir.join("template.json"),
            input_type: "cidemod".to_string(),
            output_type: "bpx".to_string(),
            output: dir.join("out").join("cell.bpx.json"),
            defaults_report: None,
            manifest_path: None,
            source_label: Some("https://example.org/cell.json".to_string()),
            annotation: AnnotationArgs {
                annotations: Vec::new(),
            },
        }
    }

    fn write_fixtures(dir: &Path) {
        fs::write(dir.join("ontology.ttl"), ONTOLOGY).expect("ontology");
        fs::write(
            dir.join("cell.cidemod.json"),
            json!({
                "cell": {"area": 0.1027},
                "electrodes": {"anode": {"kinetic_constant": 6.48e-13, "ocp": "1.9 - x_s"}}
            })
            .to_string(),
        )
        .expect("input");
        fs::write(
            dir.join("template.json"),
            json!({
                "Header": {"BPX": 0.4},
                "Parameterisation": {"Cell": {"Electrode area [m2]": 0.0}, "Negative electrode": {}},
                "Validation": {"C/20": {}},
                "Extra": {"Ambient temperature [K]": 298.15}
            })
            .to_string(),
        )
        .expect("template");
    }

    #[test]
    fn convert_writes_output_defaults_report_and_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixtures(dir.path());
        let args = args(dir.path());

        let manifest = convert(&args).expect("convert");

        let output: Value = read_json(&args.output).expect("output");
        assert_eq!(
            output["Parameterisation"]["Cell"]["Electrode area [m2]"],
            json!(0.1027)
        );
        assert_eq!(
            output["Parameterisation"]["Negative electrode"]["Reaction rate constant [mol.m-2.s-1]"],
            json!(6.48e-13 * 1e6)
        );
        assert!(output.get("Validation").is_none());
        assert_eq!(output["Header"]["Model"], json!("DFN"));

        let defaults: Vec<String> =
            read_json(&dir.path().join("out").join("cell.bpx.defaults_used.json"))
                .expect("defaults report");
        assert_eq!(defaults, vec!["Extra.Ambient temperature [K]".to_string()]);

        assert_eq!(manifest.counts.mappings, 2);
        assert_eq!(manifest.counts.applied, 2);
        assert_eq!(manifest.counts.literal_failures, 1);
        assert_eq!(manifest.source_hashes.len(), 3);
        assert_eq!(manifest.source_hashes[0].role, "ontology");
        assert!(manifest.warnings[0].contains("unparseable path literal"));
        assert!(dir.path().join("out").join("cell.bpx.manifest.json").exists());
    }

    #[test]
    fn convert_accepts_a_pre_resolved_mapping_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixtures(dir.path());
        fs::write(
            dir.path().join("table.json"),
            json!([{"source": ["cell", "area"], "target": ["Geometry", "Area"]}]).to_string(),
        )
        .expect("table");

        let mut args = args(dir.path());
        args.ontology = None;
        args.mapping_table = Some(dir.path().join("table.json"));
        args.defaults_report = Some(dir.path().join("defaults.json"));

        let manifest = convert(&args).expect("convert");
        let output: Value = read_json(&args.output).expect("output");

        assert_eq!(output["Geometry"]["Area"], json!(0.1027));
        assert_eq!(manifest.source_hashes[0].role, "mapping_table");
        assert!(dir.path().join("defaults.json").exists());
    }

    #[test]
    fn convert_rejects_unknown_types_before_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixtures(dir.path());
        let mut args = args(dir.path());
        args.output_type = "pybamm".to_string();

        let err = convert(&args).unwrap_err();
        assert!(err.to_string().contains("invalid input or output type"));
        assert!(!args.output.exists());
    }

    #[test]
    fn sibling_artifact_reuses_the_output_stem() {
        assert_eq!(
            sibling_artifact(Path::new("out/cell.json"), "manifest"),
            PathBuf::from("out/cell.manifest.json")
        );
    }
}
