//! Corpus discovery.
//!
//! The corpus is a root directory with one folder per category. Each
//! configured folder is listed (non-recursively) and files are kept when
//! their extension matches `corpus.extensions`. Results are sorted by
//! category then filename.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::FileType;

/// A file found under a category folder.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusFile {
    pub path: PathBuf,
    pub folder: String,
    pub category: String,
    pub filename: String,
    pub file_type: FileType,
    pub size_bytes: u64,
}

#[derive(Debug, Default)]
pub struct CorpusScan {
    pub files: Vec<CorpusFile>,
    /// Configured folders that do not exist under the root.
    pub missing_folders: Vec<String>,
    /// Every configured category key, present or not.
    pub categories: Vec<String>,
}

impl CorpusScan {
    pub fn files_in(&self, category: &str) -> impl Iterator<Item = &CorpusFile> {
        let category = category.to_string();
        self.files.iter().filter(move |f| f.category == category)
    }
}

pub fn scan_corpus(corpus: &CorpusConfig) -> Result<CorpusScan> {
    let root = &corpus.root;
    if !root.exists() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let include = build_extension_set(&corpus.extensions)?;
    let mut scan = CorpusScan::default();

    for (folder, category) in &corpus.categories {
        scan.categories.push(category.clone());
        let dir = root.join(folder);
        if !dir.is_dir() {
            warn!(folder = %folder, path = %dir.display(), "category folder not found");
            scan.missing_folders.push(folder.clone());
            continue;
        }

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().to_string();
            if !include.is_match(&filename) {
                debug!(file = %filename, "skipping unsupported file");
                continue;
            }
            let Some(file_type) = FileType::from_path(entry.path()) else {
                continue;
            };
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            scan.files.push(CorpusFile {
                path: entry.path().to_path_buf(),
                folder: folder.clone(),
                category: category.clone(),
                filename,
                file_type,
                size_bytes,
            });
        }
    }

    scan.categories.sort();
    scan.categories.dedup();
    scan.files.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.filename.cmp(&b.filename))
    });
    Ok(scan)
}

fn build_extension_set(extensions: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        let pattern = format!("*.{}", ext.trim_start_matches('.'));
        builder.add(
            GlobBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid extension pattern: {}", pattern))?,
        );
    }
    Ok(builder.build()?)
}
