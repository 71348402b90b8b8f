use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Number, Value};
use tracing::warn;

use crate::path::Path;

const CANONICAL_SYMBOL: &str = "x";
const SYMBOL_PATTERN: &str = r"\b(?:x_s|c_e)\b";

/// Numeric rescale applied when a source path from `input_type` passes through `segment`.
#[derive(Debug, Clone, Copy)]
pub struct ScaleRule {
    pub input_type: &'static str,
    pub segment: &'static str,
    pub factor: f64,
}

pub const SCALE_RULES: &[ScaleRule] = &[ScaleRule {
    input_type: "cidemod",
    segment: "kinetic_constant",
    factor: 1e6,
}];

#[derive(Debug, Clone, PartialEq)]
pub struct TransformNoOp {
    pub path: Path,
    pub rule: String,
    pub reason: String,
}

pub struct ValueTransformer {
    input_type: String,
    symbols: Regex,
    scale_rules: Vec<ScaleRule>,
}

impl ValueTransformer {
    pub fn new(input_type: &str) -> Result<Self> {
        let symbols =
            Regex::new(SYMBOL_PATTERN).context("failed to compile symbol canonicalization regex")?;
        let input_type = input_type.trim().to_ascii_lowercase();
        let scale_rules = SCALE_RULES
            .iter()
            .filter(|rule| rule.input_type == input_type)
            .copied()
            .collect();

        Ok(Self {
            input_type,
            symbols,
            scale_rules,
        })
    }

    pub fn input_type(&self) -> &str {
        &self.input_type
    }

    /// Runs every rule in order on a value read from `source`.
    pub fn apply(&self, source: &Path, value: Value) -> (Value, Vec<TransformNoOp>) {
        let mut skipped = Vec::new();
        let mut value = self.canonicalize_symbols(value);

        for rule in &self.scale_rules {
            if !source.contains_key(rule.segment) {
                continue;
            }
            value = match scale(&value, rule.factor) {
                Some(scaled) => scaled,
                None => {
                    let skip = TransformNoOp {
                        path: source.clone(),
                        rule: format!("{} scale x{}", rule.segment, rule.factor),
                        reason: format!("value is not a finite number: {value}"),
                    };
                    warn!(path = %skip.path, rule = %skip.rule, reason = %skip.reason, "transform skipped");
                    skipped.push(skip);
                    value
                }
            };
        }

        (value, skipped)
    }

    pub fn canonicalize_symbols(&self, value: Value) -> Value {
        match value {
            Value::String(text) => Value::String(
                self.symbols
                    .replace_all(&text, CANONICAL_SYMBOL)
                    .into_owned(),
            ),
            other => other,
        }
    }
}

fn scale(value: &Value, factor: f64) -> Option<Value> {
    let number = value.as_f64()?;
    Number::from_f64(number * factor).map(Value::Number)
}
