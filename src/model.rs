use serde::{Deserialize, Serialize};

use crate::mapper::ConversionStats;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub role: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionPaths {
    pub output_path: String,
    pub defaults_report_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionCounts {
    pub mappings: usize,
    pub applied: usize,
    pub absent: usize,
    pub write_failures: usize,
    pub transform_no_ops: usize,
    pub literal_failures: usize,
    pub defaults_used: usize,
}

impl ConversionCounts {
    pub fn new(stats: &ConversionStats, literal_failures: usize, defaults_used: usize) -> Self {
        Self {
            mappings: stats.mappings,
            applied: stats.applied,
            absent: stats.absent,
            write_failures: stats.write_failures,
            transform_no_ops: stats.transform_no_ops,
            literal_failures,
            defaults_used,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub input_type: String,
    pub output_type: String,
    pub source_origin: String,
    pub paths: ConversionPaths,
    pub counts: ConversionCounts,
    pub source_hashes: Vec<SourceFile>,
    pub warnings: Vec<String>,
}
