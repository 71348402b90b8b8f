use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::path::{Path, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    MissingKey,
    IndexOutOfRange,
    NonIntegerIndex,
    ScalarNode,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingKey => "key not found",
            Self::IndexOutOfRange => "index out of range",
            Self::NonIntegerIndex => "non-integer segment against a sequence",
            Self::ScalarNode => "cannot descend into a scalar",
        })
    }
}

/// Where and why a read stopped short of the end of its path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} at segment {segment:?} (depth {depth}) of path {path}")]
pub struct PathMiss {
    pub path: Path,
    pub segment: Segment,
    pub depth: usize,
    pub reason: MissReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteConflict {
    NotASequence,
    NotAMapping,
    ScalarContainer,
}

impl fmt::Display for WriteConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotASequence => "numeric segment against a non-sequence container",
            Self::NotAMapping => "field segment against a sequence",
            Self::ScalarContainer => "cannot write through a scalar",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{conflict} at segment {segment:?} (depth {depth}) of path {path}")]
pub struct PathWriteError {
    pub path: Path,
    pub segment: Segment,
    pub depth: usize,
    pub conflict: WriteConflict,
}

pub fn lookup<'a>(doc: &'a Value, path: &Path) -> Result<&'a Value, PathMiss> {
    let mut node = doc;
    for (depth, segment) in path.segments().iter().enumerate() {
        let miss = |reason| PathMiss {
            path: path.clone(),
            segment: segment.clone(),
            depth,
            reason,
        };

        node = match node {
            Value::Object(map) => map
                .get(&*segment.as_key())
                .ok_or_else(|| miss(MissReason::MissingKey))?,
            Value::Array(items) => {
                let index = segment
                    .as_index()
                    .ok_or_else(|| miss(MissReason::NonIntegerIndex))?;
                items
                    .get(index)
                    .ok_or_else(|| miss(MissReason::IndexOutOfRange))?
            }
            _ => return Err(miss(MissReason::ScalarNode)),
        };
    }
    Ok(node)
}

#[allow(dead_code)]
pub fn get<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    lookup(doc, path).ok()
}

/// Writes `value` at `path`, materialising intermediate containers on demand.
///
/// Numeric segments grow sequences with empty mappings up to the requested
/// index; a freshly created (still empty) mapping is turned into a sequence
/// when a numeric segment reaches it. The final segment overwrites whatever
/// was there.
pub fn assign(doc: &mut Value, path: &Path, value: Value) -> Result<(), PathWriteError> {
    let (last, parents) = path.split_last();
    let conflict = |segment: &Segment, depth: usize, conflict| PathWriteError {
        path: path.clone(),
        segment: segment.clone(),
        depth,
        conflict,
    };

    let mut node = doc;
    for (depth, segment) in parents.iter().enumerate() {
        node = match segment.as_index() {
            Some(index) => {
                let items = sequence_slot(node)
                    .ok_or_else(|| conflict(segment, depth, WriteConflict::NotASequence))?;
                grow(items, index);
                &mut items[index]
            }
            None => match node {
                Value::Object(map) => map
                    .entry(segment.as_key().into_owned())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(_) => {
                    return Err(conflict(segment, depth, WriteConflict::NotAMapping));
                }
                _ => return Err(conflict(segment, depth, WriteConflict::ScalarContainer)),
            },
        };
    }

    let depth = parents.len();
    match node {
        Value::Object(map) => {
            map.insert(last.as_key().into_owned(), value);
        }
        Value::Array(items) => {
            let index = last
                .as_index()
                .ok_or_else(|| conflict(last, depth, WriteConflict::NotAMapping))?;
            grow(items, index);
            items[index] = value;
        }
        _ => return Err(conflict(last, depth, WriteConflict::ScalarContainer)),
    }
    Ok(())
}

fn sequence_slot(node: &mut Value) -> Option<&mut Vec<Value>> {
    if matches!(node, Value::Object(map) if map.is_empty()) {
        *node = Value::Array(Vec::new());
    }
    node.as_array_mut()
}

fn grow(items: &mut Vec<Value>, index: usize) {
    while items.len() <= index {
        items.push(Value::Object(Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(segments: Vec<Segment>) -> Path {
        Path::new(segments).expect("non-empty path")
    }

    #[test]
    fn lookup_walks_mappings_and_sequences() {
        let doc = json!({"Cell": {"layers": [{"name": "anode"}, {"name": "cathode"}]}});
        let found = get(
            &doc,
            &path(vec!["Cell".into(), "layers".into(), "1".into(), "name".into()]),
        );
        assert_eq!(found, Some(&json!("cathode")));
    }

    #[test]
    fn lookup_distinguishes_falsy_values_from_absence() {
        let doc = json!({"zero": 0, "off": false, "empty": "", "nothing": null});
        assert_eq!(get(&doc, &path(vec!["zero".into()])), Some(&json!(0)));
        assert_eq!(get(&doc, &path(vec!["off".into()])), Some(&json!(false)));
        assert_eq!(get(&doc, &path(vec!["empty".into()])), Some(&json!("")));
        assert_eq!(get(&doc, &path(vec!["nothing".into()])), Some(&Value::Null));
        assert_eq!(get(&doc, &path(vec!["missing".into()])), None);
    }

    #[test]
    fn lookup_reports_the_failing_segment() {
        let doc = json!({"a": {"b": [1, 2]}, "s": "text"});

        let miss = lookup(&doc, &path(vec!["a".into(), "c".into()])).unwrap_err();
        assert_eq!(miss.reason, MissReason::MissingKey);
        assert_eq!(miss.segment, Segment::key("c"));
        assert_eq!(miss.depth, 1);

        let miss = lookup(&doc, &path(vec!["a".into(), "b".into(), Segment::Index(5)]))
            .unwrap_err();
        assert_eq!(miss.reason, MissReason::IndexOutOfRange);

        let miss = lookup(&doc, &path(vec!["a".into(), "b".into(), "x".into()])).unwrap_err();
        assert_eq!(miss.reason, MissReason::NonIntegerIndex);

        let miss = lookup(&doc, &path(vec!["s".into(), "deeper".into()])).unwrap_err();
        assert_eq!(miss.reason, MissReason::ScalarNode);
    }

    #[test]
    fn lookup_trims_padded_keys() {
        let doc = json!({"Electrolyte": {"Conductivity [S.m-1]": 1.2}});
        let padded = path(vec![
            Segment::Key(" Electrolyte ".to_string()),
            Segment::Key("Conductivity [S.m-1]  ".to_string()),
        ]);
        assert_eq!(get(&doc, &padded), Some(&json!(1.2)));
    }

    #[test]
    fn assign_then_get_round_trips() {
        let mut doc = json!({"existing": {"keep": true}});
        let target = path(vec!["existing".into(), "added".into(), "deep".into()]);
        assign(&mut doc, &target, json!([1, 2, 3])).expect("write should succeed");

        assert_eq!(get(&doc, &target), Some(&json!([1, 2, 3])));
        assert_eq!(doc["existing"]["keep"], json!(true));
    }

    #[test]
    fn assign_grows_sequences_with_empty_mappings() {
        let mut doc = json!({"items": [{"v": 0}]});
        let target = path(vec!["items".into(), "3".into(), "v".into()]);
        assign(&mut doc, &target, json!(7)).expect("write should succeed");

        assert_eq!(doc, json!({"items": [{"v": 0}, {}, {}, {"v": 7}]}));
    }

    #[test]
    fn assign_turns_fresh_mappings_into_sequences() {
        let mut doc = json!({});
        let target = path(vec!["layers".into(), Segment::Index(1), "name".into()]);
        assign(&mut doc, &target, json!("cathode")).expect("write should succeed");

        assert_eq!(doc, json!({"layers": [{}, {"name": "cathode"}]}));
    }

    #[test]
    fn assign_overwrites_without_merging() {
        let mut doc = json!({"a": {"b": {"c": 1, "d": 2}}});
        assign(&mut doc, &path(vec!["a".into(), "b".into()]), json!("flat"))
            .expect("write should succeed");
        assert_eq!(doc, json!({"a": {"b": "flat"}}));
    }

    #[test]
    fn assign_rejects_structural_conflicts() {
        let mut doc = json!({"scalar": 3, "map": {"k": 1}, "list": [1]});

        let err = assign(&mut doc, &path(vec!["scalar".into(), "x".into()]), json!(1)).unwrap_err();
        assert_eq!(err.conflict, WriteConflict::ScalarContainer);

        let err = assign(
            &mut doc,
            &path(vec!["map".into(), Segment::Index(0), "x".into()]),
            json!(1),
        )
        .unwrap_err();
        assert_eq!(err.conflict, WriteConflict::NotASequence);

        let err = assign(&mut doc, &path(vec!["list".into(), "x".into()]), json!(1)).unwrap_err();
        assert_eq!(err.conflict, WriteConflict::NotAMapping);

        assert_eq!(doc, json!({"scalar": 3, "map": {"k": 1}, "list": [1]}));
    }
}
