use std::fmt;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::defaults::DefaultUsageTracker;
use crate::document::{PathMiss, PathWriteError, assign, lookup};
use crate::ontology::{LiteralFailure, MappingTable};
use crate::transform::{TransformNoOp, ValueTransformer};

pub const HEADER_KEY: &str = "Header";
pub const VALIDATION_KEY: &str = "Validation";
pub const HEADER_FORMAT_VERSION: f64 = 0.1;
pub const HEADER_TITLE: &str = "An autoconverted parameter set using BatteryModelMapper";
pub const HEADER_MODEL: &str = "DFN";

/// Non-fatal event recorded while resolving or converting.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    ReadMiss(PathMiss),
    WriteFailure(PathWriteError),
    TransformNoOp(TransformNoOp),
    LiteralParse(LiteralFailure),
    RootReplaced,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadMiss(miss) => write!(f, "source value absent: {miss}"),
            Self::WriteFailure(err) => write!(f, "write abandoned: {err}"),
            Self::TransformNoOp(skip) => write!(
                f,
                "transform {} skipped for {}: {}",
                skip.rule, skip.path, skip.reason
            ),
            Self::LiteralParse(failure) => write!(
                f,
                "unparseable path literal {:?} for {} on {}: {}",
                failure.literal, failure.predicate, failure.subject, failure.error
            ),
            Self::RootReplaced => {
                f.write_str("template root was not a mapping and was replaced before adding the header")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub mappings: usize,
    pub applied: usize,
    pub absent: usize,
    pub write_failures: usize,
    pub transform_no_ops: usize,
}

#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub output: Value,
    pub defaults_used: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ConversionStats,
}

/// Copies mapped values from a source document into a fresh copy of the template.
///
/// The mapper only borrows the table and template, so one instance can serve
/// any number of independent conversions.
pub struct ParameterMapper<'a> {
    table: &'a MappingTable,
    template: &'a Value,
    transformer: ValueTransformer,
    source_origin: String,
}

impl<'a> ParameterMapper<'a> {
    pub fn new(
        table: &'a MappingTable,
        template: &'a Value,
        input_type: &str,
        source_origin: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            table,
            template,
            transformer: ValueTransformer::new(input_type)?,
            source_origin: source_origin.into(),
        })
    }

    pub fn map_parameters(&self, source: &Value) -> ConversionOutcome {
        let mut output = self.template.clone();
        let mut tracker = DefaultUsageTracker::from_template(self.template);
        debug!(template_paths = tracker.remaining().len(), "tracking template defaults");
        let mut diagnostics = Vec::new();
        let mut stats = ConversionStats {
            mappings: self.table.len(),
            ..ConversionStats::default()
        };

        for (source_path, target_path) in self.table.iter() {
            let value = match lookup(source, source_path) {
                Ok(value) => value.clone(),
                Err(miss) => {
                    debug!(path = %source_path, reason = %miss, "source value absent");
                    stats.absent += 1;
                    diagnostics.push(Diagnostic::ReadMiss(miss));
                    continue;
                }
            };

            let (value, skipped) = self.transformer.apply(source_path, value);
            stats.transform_no_ops += skipped.len();
            diagnostics.extend(skipped.into_iter().map(Diagnostic::TransformNoOp));

            if let Err(err) = assign(&mut output, target_path, value) {
                warn!(source = %source_path, target = %target_path, error = %err, "write abandoned");
                stats.write_failures += 1;
                diagnostics.push(Diagnostic::WriteFailure(err));
                continue;
            }

            tracker.record_write(&output, target_path);
            stats.applied += 1;
            debug!(source = %source_path, target = %target_path, "value mapped");
        }

        if inject_header(&mut output, &self.source_origin) {
            warn!("template root was not a mapping; output restarted from an empty mapping");
            diagnostics.push(Diagnostic::RootReplaced);
        }
        tracker.forget_subtree(VALIDATION_KEY);

        let defaults_used = tracker.into_report();
        info!(
            input_type = self.transformer.input_type(),
            mappings = stats.mappings,
            applied = stats.applied,
            absent = stats.absent,
            write_failures = stats.write_failures,
            defaults_used = defaults_used.len(),
            "conversion finished"
        );

        ConversionOutcome {
            output,
            defaults_used,
            diagnostics,
            stats,
        }
    }
}

pub fn header_block(source_origin: &str) -> Value {
    json!({
        "BPX": HEADER_FORMAT_VERSION,
        "Title": HEADER_TITLE,
        "Description": format!(
            "This data set was automatically generated from {source_origin}. Please check carefully."
        ),
        "Model": HEADER_MODEL,
    })
}

/// Sets the header block and drops any validation section.
/// Returns true when a non-mapping root had to be replaced first.
pub fn inject_header(output: &mut Value, source_origin: &str) -> bool {
    let replaced = !output.is_object();
    if replaced {
        *output = Value::Object(Map::new());
    }
    if let Value::Object(map) = output {
        map.insert(HEADER_KEY.to_string(), header_block(source_origin));
        map.remove(VALIDATION_KEY);
    }
    replaced
}
