use std::collections::BTreeSet;
use std::ops::Bound;

use serde_json::Value;

use crate::path::{Path, Segment};

/// Sections owned by the mapping table and the header step; never reported.
pub const RESERVED_SECTIONS: &[&str] = &["Parameterisation", "Header"];

/// Template paths that have not been overwritten yet.
#[derive(Debug, Clone)]
pub struct DefaultUsageTracker {
    remaining: BTreeSet<String>,
}

impl DefaultUsageTracker {
    pub fn from_template(template: &Value) -> Self {
        let mut remaining = BTreeSet::new();
        collect_paths(template, "", &mut remaining);
        Self { remaining }
    }

    /// Drops the rendering of `path` as it now sits in `doc`. Returns whether it was tracked.
    pub fn record_write(&mut self, doc: &Value, path: &Path) -> bool {
        self.remaining.remove(&render_path(doc, path))
    }

    /// Forgets a top-level section that no longer exists in the output.
    pub fn forget_subtree(&mut self, root: &str) {
        let nested = [format!("{root}."), format!("{root}[")];
        self.remaining
            .retain(|path| path != root && !nested.iter().any(|prefix| path.starts_with(prefix)));
    }

    pub fn remaining(&self) -> &BTreeSet<String> {
        &self.remaining
    }

    /// Final report: reserved sections removed, and containers dropped
    /// whenever one of their own entries is still listed.
    pub fn into_report(self) -> Vec<String> {
        let reportable: BTreeSet<String> = self
            .remaining
            .into_iter()
            .filter(|path| !RESERVED_SECTIONS.iter().any(|section| path.contains(section)))
            .collect();

        reportable
            .iter()
            .filter(|path| !has_descendant(&reportable, path))
            .cloned()
            .collect()
    }
}

fn has_descendant(paths: &BTreeSet<String>, path: &str) -> bool {
    [format!("{path}."), format!("{path}[")].iter().any(|prefix| {
        paths
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .next()
            .is_some_and(|next| next.starts_with(prefix.as_str()))
    })
}

fn collect_paths(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let current = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_paths(child, &current, out);
                out.insert(current);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let current = format!("{prefix}[{index}]");
                collect_paths(child, &current, out);
                out.insert(current);
            }
        }
        _ => {}
    }
}

/// Renders `path` the way template enumeration does, following the shapes in `doc`.
///
/// A segment that lands on a sequence renders as `[i]`, anything else as a
/// dotted field. Past the point where `doc` runs out, the segment's own kind
/// decides.
pub fn render_path(doc: &Value, path: &Path) -> String {
    let mut rendered = String::new();
    let mut node = Some(doc);

    for segment in path.segments() {
        let index = match node {
            Some(Value::Array(_)) => segment.as_index(),
            Some(_) => None,
            None => match segment {
                Segment::Index(index) => Some(*index),
                Segment::Key(_) => None,
            },
        };

        match index {
            Some(index) => rendered.push_str(&format!("[{index}]")),
            None => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(&segment.as_key());
            }
        }

        node = match (node, index) {
            (Some(Value::Array(items)), Some(index)) => items.get(index),
            (Some(Value::Object(map)), _) => map.get(&*segment.as_key()),
            _ => None,
        };
    }

    rendered
}
