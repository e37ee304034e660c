//! Token store exports.
//!
//! - `csv`: one row per file with its size and token counts.
//! - `vocab`: the sorted set of distinct tokens across all stored chunks,
//!   behind a `#` comment header.
//!
//! Both write to a file when `output` is given, otherwise to stdout.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

use crate::chunk::{tokenize, TokenizerKind};
use crate::config::Config;
use crate::store::TokenStore;

const CSV_HEADER: &str =
    "category,filename,file_type,size_bytes,text_length,total_tokens,unique_tokens";

pub fn render_csv(store: &TokenStore) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for record in store.records() {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            csv_field(&record.category),
            csv_field(&record.filename),
            csv_field(&record.file_type),
            record.original_size_bytes,
            record.text_length,
            record.total_token_count,
            record.unique_token_count
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Distinct tokens over every stored chunk.
///
/// When `chunking.stored_chunks` capped the store, only the kept chunks
/// contribute.
pub fn vocabulary(store: &TokenStore, kind: TokenizerKind) -> BTreeSet<String> {
    store
        .records()
        .flat_map(|r| r.chunks.iter())
        .flat_map(|chunk| tokenize(chunk, kind))
        .collect()
}

pub fn render_vocab(store: &TokenStore, kind: TokenizerKind) -> String {
    let vocab = vocabulary(store, kind);
    let mut out = String::new();
    out.push_str("# medprep vocabulary\n");
    out.push_str(&format!(
        "# {} files, {} unique tokens\n",
        store.file_count(),
        vocab.len()
    ));
    for token in vocab {
        out.push_str(&token);
        out.push('\n');
    }
    out
}

pub fn run_export_csv(config: &Config, output: Option<&Path>) -> Result<()> {
    let store = TokenStore::load(&config.store.path)?;
    write_output(&render_csv(&store), output, "rows", store.file_count())
}

pub fn run_export_vocab(config: &Config, output: Option<&Path>) -> Result<()> {
    let store = TokenStore::load(&config.store.path)?;
    let text = render_vocab(&store, config.chunking.tokenizer);
    let count = text.lines().filter(|l| !l.starts_with('#')).count();
    write_output(&text, output, "tokens", count)
}

fn write_output(text: &str, output: Option<&Path>, unit: &str, count: usize) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} {} to {}", count, unit, path.display());
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}
