//! Core data models used throughout medprep.
//!
//! These types represent the source files, token records and derived topic
//! values that flow through the extraction and query pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Source file formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Pdf,
    Xlsx,
    Xls,
    Csv,
}

impl FileType {
    /// Resolve a file type from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "xlsx" => Some(FileType::Xlsx),
            "xls" => Some(FileType::Xls),
            "csv" => Some(FileType::Csv),
            _ => None,
        }
    }

    /// Dotted extension as stored in the token store (`".pdf"`).
    pub fn as_extension(&self) -> &'static str {
        match self {
            FileType::Pdf => ".pdf",
            FileType::Xlsx => ".xlsx",
            FileType::Xls => ".xls",
            FileType::Csv => ".csv",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_extension())
    }
}

/// A file after extraction, before chunking.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub category: String,
    pub file_type: FileType,
    pub size_bytes: u64,
    pub raw_text: String,
}

/// Per-file extraction and tokenization result. One per [`SourceFile`].
///
/// Field names follow the on-disk token store layout. The category is the
/// key the record is stored under, so it is not serialized per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(default)]
    pub filename: String,
    #[serde(skip)]
    pub category: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub original_size_bytes: u64,
    #[serde(default)]
    pub text_length: usize,
    /// Chunks produced before any storage cap was applied.
    #[serde(default)]
    pub num_chunks: usize,
    #[serde(default, rename = "total_tokens")]
    pub total_token_count: usize,
    #[serde(default, rename = "unique_tokens")]
    pub unique_token_count: usize,
    #[serde(default)]
    pub chunks: Vec<String>,
    #[serde(default)]
    pub sample_tokens: Vec<String>,
}

/// Aggregated content for one topic. Derived per query, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicEntry {
    pub topic_slug: String,
    pub aggregated_content: String,
    pub matched_files: Vec<String>,
    pub category: String,
}

/// A ranked topic returned by the predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionItem {
    #[serde(rename = "topic")]
    pub topic_slug: String,
    pub score: f64,
}
