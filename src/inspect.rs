//! Corpus and token store inspection commands.
//!
//! `medprep files`, `medprep token-data` and `medprep validate`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::corpus::scan_corpus;
use crate::stats::format_bytes;
use crate::store::TokenStore;

/// List corpus files grouped by category folder.
pub fn run_files(config: &Config) -> Result<()> {
    let scan = scan_corpus(&config.corpus)?;

    println!("{:<22} {:<6} {:>10}  FILE", "CATEGORY", "TYPE", "SIZE");
    for file in &scan.files {
        println!(
            "{:<22} {:<6} {:>10}  {}",
            file.category,
            file.file_type,
            format_bytes(file.size_bytes),
            file.filename
        );
    }
    for folder in &scan.missing_folders {
        println!("{:<22} {:<6} {:>10}  (folder not found)", folder, "-", "-");
    }
    println!();
    println!("{} files in {}", scan.files.len(), config.corpus.root.display());
    Ok(())
}

/// Print one token record as JSON.
pub fn run_token_data(config: &Config, category: &str, filename: &str) -> Result<()> {
    let store = TokenStore::load(&config.store.path)?;
    let Some(record) = store.find(category, filename) else {
        if !store.has_category(category) {
            bail!("Unknown category: {}", category);
        }
        bail!("No token data for {}/{}", category, filename);
    };
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Problems found in a token store.
#[derive(Debug, Default, PartialEq)]
pub struct ValidationReport {
    /// Configured categories with no key in the store.
    pub missing_categories: Vec<String>,
    /// `(category, filename, total_tokens)` below the configured minimum.
    pub sparse_files: Vec<(String, String, usize)>,
    pub files: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_categories.is_empty() && self.sparse_files.is_empty()
    }
}

pub fn validate_store(store: &TokenStore, config: &Config) -> ValidationReport {
    let mut report = ValidationReport {
        files: store.file_count(),
        ..Default::default()
    };

    let mut expected: Vec<&String> = config.corpus.categories.values().collect();
    expected.sort();
    expected.dedup();
    for category in expected {
        if !store.has_category(category) {
            report.missing_categories.push(category.clone());
        }
    }

    let min = config.validate.min_tokens_per_file;
    for record in store.records() {
        if record.total_token_count < min {
            report.sparse_files.push((
                record.category.clone(),
                record.filename.clone(),
                record.total_token_count,
            ));
        }
    }
    report
}

/// Check the token store; fails when the store is absent or unreadable.
pub fn run_validate(config: &Config) -> Result<()> {
    let path = &config.store.path;
    if !path.exists() {
        bail!("Token store not found: {}", path.display());
    }
    let store = TokenStore::load(path)?;
    let report = validate_store(&store, config);

    println!("validate {}", path.display());
    println!("  files: {}", report.files);
    for category in &report.missing_categories {
        println!("  warning: category missing from store: {}", category);
    }
    for (category, filename, tokens) in &report.sparse_files {
        println!(
            "  warning: {}/{} has only {} tokens (minimum {})",
            category, filename, tokens, config.validate.min_tokens_per_file
        );
    }
    if report.is_clean() {
        println!("ok");
    } else {
        println!(
            "{} warning(s)",
            report.missing_categories.len() + report.sparse_files.len()
        );
    }
    Ok(())
}
