use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path as FsPath;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use sophia_api::source::TripleSource;
use sophia_api::term::{SimpleTerm, Term};
use sophia_turtle::parser::{nt, turtle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::path::{LiteralError, Path, parse_path_literal};

const EMMO_BATTERY_MODEL: &str = "https://w3id.org/emmo/domain/battery-model-lithium-ion#";

pub const BPX_ANNOTATION: &str = "bmli_0a5b99ee_995b_4899_a79b_925a4086da37";
pub const CIDEMOD_ANNOTATION: &str = "bmli_1b718841_5d72_4071_bb71_fc4a754f5e30";
pub const BATTMO_ANNOTATION: &str = "bmli_2c718841_6d73_5082_bb81_gc5b754f6e40";

/// Subject/predicate/object access the resolver needs from an ontology.
pub trait TripleStore {
    fn subjects(&self) -> impl Iterator<Item = &str>;
    fn predicate_objects(&self, subject: &str) -> impl Iterator<Item = (&str, &str)>;
}

/// In-memory triple store keeping subjects in first-seen order.
#[derive(Debug, Default)]
pub struct OntologyGraph {
    order: Vec<String>,
    statements: HashMap<String, Vec<(String, String)>>,
}

impl OntologyGraph {
    pub fn insert(
        &mut self,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) {
        let subject = subject.into();
        if !self.statements.contains_key(&subject) {
            self.order.push(subject.clone());
        }
        self.statements
            .entry(subject)
            .or_default()
            .push((predicate.into(), object.into()));
    }

    pub fn subject_count(&self) -> usize {
        self.order.len()
    }

    pub fn triple_count(&self) -> usize {
        self.statements.values().map(Vec::len).sum()
    }

    /// Loads a local Turtle file, or N-Triples when the extension is `.nt`.
    pub fn load(path: &FsPath) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read ontology {}", path.display()))?;

        let is_ntriples = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("nt"))
            .unwrap_or(false);

        let graph = if is_ntriples {
            Self::parse_ntriples(&text)
        } else {
            Self::parse_turtle(&text)
        }
        .with_context(|| format!("failed to parse ontology {}", path.display()))?;

        info!(
            path = %path.display(),
            subjects = graph.subject_count(),
            triples = graph.triple_count(),
            "loaded ontology"
        );
        Ok(graph)
    }

    pub fn parse_turtle(text: &str) -> Result<Self> {
        let triples: Vec<[SimpleTerm<'static>; 3]> = turtle::parse_str(text)
            .collect_triples()
            .map_err(|err| anyhow!("turtle parse error: {err}"))?;
        Ok(Self::from_terms(&triples))
    }

    pub fn parse_ntriples(text: &str) -> Result<Self> {
        let triples: Vec<[SimpleTerm<'static>; 3]> = nt::parse_str(text)
            .collect_triples()
            .map_err(|err| anyhow!("n-triples parse error: {err}"))?;
        Ok(Self::from_terms(&triples))
    }

    fn from_terms(triples: &[[SimpleTerm<'static>; 3]]) -> Self {
        let mut graph = Self::default();
        for [subject, predicate, object] in triples {
            let (Some(subject), Some(predicate), Some(object)) =
                (term_text(subject), term_text(predicate), term_text(object))
            else {
                debug!("skipping triple with a quoted-triple or variable term");
                continue;
            };
            graph.insert(subject, predicate, object);
        }
        graph
    }
}

impl TripleStore for OntologyGraph {
    fn subjects(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn predicate_objects(&self, subject: &str) -> impl Iterator<Item = (&str, &str)> {
        self.statements
            .get(subject)
            .into_iter()
            .flatten()
            .map(|(predicate, object)| (predicate.as_str(), object.as_str()))
    }
}

/// Textual form of a term: literal lexical form, IRI, or `_:` blank node label.
fn term_text(term: &SimpleTerm<'_>) -> Option<String> {
    if let Some(lexical) = term.lexical_form() {
        return Some(lexical.to_string());
    }
    if let Some(iri) = term.iri() {
        return Some(iri.as_str().to_string());
    }
    term.bnode_id().map(|id| format!("_:{}", id.as_str()))
}

/// TypeKey to annotation IRI table handed to the resolver.
#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    annotations: BTreeMap<String, String>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        let annotations = [
            ("bpx", BPX_ANNOTATION),
            ("cidemod", CIDEMOD_ANNOTATION),
            ("battmo", BATTMO_ANNOTATION),
        ]
        .into_iter()
        .map(|(key, local)| (key.to_string(), format!("{EMMO_BATTERY_MODEL}{local}")))
        .collect();

        Self { annotations }
    }
}

impl AnnotationConfig {
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, iri) in overrides {
            self.annotations.insert(normalize_type_key(&key), iri.trim().to_string());
        }
        self
    }

    pub fn annotation(&self, type_key: &str) -> Option<&str> {
        self.annotations
            .get(&normalize_type_key(type_key))
            .map(String::as_str)
    }

    /// Annotation IRIs for both sides of a conversion, or an invalid-type error.
    pub fn annotation_pair(
        &self,
        input_type: &str,
        output_type: &str,
    ) -> Result<(&str, &str), ResolveError> {
        match (self.annotation(input_type), self.annotation(output_type)) {
            (Some(input), Some(output)) => Ok((input, output)),
            _ => Err(ResolveError::InvalidType {
                input: input_type.to_string(),
                output: output_type.to_string(),
                known: self.type_keys().collect::<Vec<_>>().join(", "),
            }),
        }
    }

    pub fn type_keys(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }
}

fn normalize_type_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Parses a `key=iri` command-line override.
pub fn parse_annotation_override(raw: &str) -> Result<(String, String)> {
    let (key, iri) = raw
        .split_once('=')
        .with_context(|| format!("annotation override must look like key=iri: {raw}"))?;
    if key.trim().is_empty() || iri.trim().is_empty() {
        bail!("annotation override has an empty key or iri: {raw}");
    }
    Ok((normalize_type_key(key), iri.trim().to_string()))
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid input or output type: {input}, {output} (known types: {known})")]
    InvalidType {
        input: String,
        output: String,
        known: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source: Path,
    pub target: Path,
}

/// Source path to target path table for one schema pair, ordered by source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MappingEntry>", into = "Vec<MappingEntry>")]
pub struct MappingTable(BTreeMap<Path, Path>);

impl MappingTable {
    /// Inserts a pair; a repeated source path replaces the earlier target.
    pub fn insert(&mut self, source: Path, target: Path) -> Option<Path> {
        self.0.insert(source, target)
    }

    #[allow(dead_code)]
    pub fn get(&self, source: &Path) -> Option<&Path> {
        self.0.get(source)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.0.iter()
    }
}

impl From<Vec<MappingEntry>> for MappingTable {
    fn from(entries: Vec<MappingEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry.source, entry.target);
        }
        table
    }
}

impl From<MappingTable> for Vec<MappingEntry> {
    fn from(table: MappingTable) -> Self {
        table
            .0
            .into_iter()
            .map(|(source, target)| MappingEntry { source, target })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralFailure {
    pub subject: String,
    pub predicate: String,
    pub literal: String,
    pub error: LiteralError,
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub table: MappingTable,
    pub literal_failures: Vec<LiteralFailure>,
}

/// Builds the mapping table for `input_type` to `output_type` from annotated subjects.
pub fn resolve_mappings<S: TripleStore>(
    store: &S,
    config: &AnnotationConfig,
    input_type: &str,
    output_type: &str,
) -> Result<Resolution, ResolveError> {
    let (input_annotation, output_annotation) = config.annotation_pair(input_type, output_type)?;

    let mut resolution = Resolution::default();
    for subject in store.subjects() {
        let mut source = None;
        let mut target = None;

        for (predicate, object) in store.predicate_objects(subject) {
            if predicate == input_annotation {
                source = parse_annotation(subject, predicate, object, &mut resolution);
            }
            if predicate == output_annotation {
                target = parse_annotation(subject, predicate, object, &mut resolution);
            }
        }

        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };
        debug!(subject, source = %source, target = %target, "mapping added");
        if let Some(previous) = resolution.table.insert(source.clone(), target) {
            debug!(subject, source = %source, replaced = %previous, "mapping replaced");
        }
    }

    info!(
        input_type,
        output_type,
        mappings = resolution.table.len(),
        literal_failures = resolution.literal_failures.len(),
        "resolved mapping table"
    );
    Ok(resolution)
}

fn parse_annotation(
    subject: &str,
    predicate: &str,
    literal: &str,
    resolution: &mut Resolution,
) -> Option<Path> {
    match parse_path_literal(literal) {
        Ok(path) => Some(path),
        Err(error) => {
            warn!(subject, literal, error = %error, "failed to parse path literal");
            resolution.literal_failures.push(LiteralFailure {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                literal: literal.to_string(),
                error,
            });
            None
        }
    }
}
