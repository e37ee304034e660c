//! Tokenization pipeline orchestration.
//!
//! Coordinates a full run: corpus scan → extraction → cleaning/chunking →
//! token store. Extraction is CPU-bound and runs on blocking tasks, at most
//! `ingest.workers` at a time. Records are merged in (category, filename)
//! order regardless of completion order, so the store is deterministic.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::chunk::{build_record, ChunkOptions};
use crate::config::Config;
use crate::corpus::{scan_corpus, CorpusFile};
use crate::extract::{load_source, placeholder};
use crate::models::{SourceFile, TokenRecord};
use crate::progress::{format_number, TokenizeProgressEvent, TokenizeProgressReporter};
use crate::store::TokenStore;

/// Per-category outcome of a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CategorySummary {
    pub files: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Default)]
pub struct TokenizeSummary {
    pub categories: BTreeMap<String, CategorySummary>,
    pub missing_folders: Vec<String>,
    pub dry_run: bool,
}

impl TokenizeSummary {
    pub fn total_files(&self) -> usize {
        self.categories.values().map(|c| c.files).sum()
    }

    pub fn total_tokens(&self) -> usize {
        self.categories.values().map(|c| c.total_tokens).sum()
    }
}

/// Extract and tokenize one corpus file. Never fails: extraction errors are
/// carried as placeholder text.
pub fn tokenize_file(file: &CorpusFile, opts: &ChunkOptions) -> TokenRecord {
    let source = load_source(&file.path, &file.category, file.file_type);
    build_record(&source, opts)
}

/// Record for a file whose extraction task died, so the file still lands in
/// the store with a failure placeholder.
fn failed_task_record(file: &CorpusFile, opts: &ChunkOptions, err: &JoinError) -> TokenRecord {
    let source = SourceFile {
        filename: file.filename.clone(),
        category: file.category.clone(),
        file_type: file.file_type,
        size_bytes: file.size_bytes,
        raw_text: placeholder(&file.filename, file.size_bytes, err),
    };
    build_record(&source, opts)
}

pub async fn run_tokenize(
    config: &Config,
    dry_run: bool,
    progress: &dyn TokenizeProgressReporter,
) -> Result<TokenizeSummary> {
    progress.report(TokenizeProgressEvent::Discovering {
        root: config.corpus.root.display().to_string(),
    });
    let scan = scan_corpus(&config.corpus)?;

    let mut summary = TokenizeSummary {
        missing_folders: scan.missing_folders.clone(),
        dry_run,
        ..Default::default()
    };
    for category in &scan.categories {
        summary.categories.entry(category.clone()).or_default();
    }

    if dry_run {
        for file in &scan.files {
            if let Some(c) = summary.categories.get_mut(&file.category) {
                c.files += 1;
            }
        }
        println!("tokenize (dry-run)");
        println!("  corpus: {}", config.corpus.root.display());
        for (category, c) in &summary.categories {
            println!("  {}: {} files", category, c.files);
        }
        for folder in &summary.missing_folders {
            println!("  missing folder: {}", folder);
        }
        println!("  files found: {}", summary.total_files());
        return Ok(summary);
    }

    let opts = Arc::new(config.chunking.options());
    let workers = config.ingest.workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    info!(files = scan.files.len(), workers, "tokenizing corpus");

    let mut handles = Vec::with_capacity(scan.files.len());
    for file in scan.files.iter().cloned() {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let task_file = file.clone();
        let task_opts = Arc::clone(&opts);
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            tokenize_file(&task_file, &task_opts)
        });
        handles.push((file, handle));
    }

    let total = handles.len() as u64;
    let mut store = TokenStore::new();
    for category in &scan.categories {
        store.ensure_category(category);
    }
    for (i, (file, handle)) in handles.into_iter().enumerate() {
        let record = match handle.await {
            Ok(record) => record,
            Err(e) => {
                warn!(file = %file.filename, error = %e, "extraction task failed");
                failed_task_record(&file, &opts, &e)
            }
        };
        progress.report(TokenizeProgressEvent::Extracting {
            category: record.category.clone(),
            file: record.filename.clone(),
            n: i as u64 + 1,
            total,
        });
        let c = summary.categories.entry(record.category.clone()).or_default();
        c.files += 1;
        c.total_tokens += record.total_token_count;
        store.insert(record);
    }

    store
        .save(&config.store.path)
        .with_context(|| format!("Failed to save token store: {}", config.store.path.display()))?;
    progress.report(TokenizeProgressEvent::Saved {
        path: config.store.path.display().to_string(),
        files: total,
    });

    println!("tokenize");
    for (category, c) in &summary.categories {
        println!(
            "  {}: {} files, {} tokens",
            category,
            c.files,
            format_number(c.total_tokens as u64)
        );
    }
    for folder in &summary.missing_folders {
        println!("  missing folder: {}", folder);
    }
    println!(
        "  total: {} files, {} tokens",
        summary.total_files(),
        format_number(summary.total_tokens() as u64)
    );
    println!("  saved: {}", config.store.path.display());
    println!("ok");

    Ok(summary)
}
