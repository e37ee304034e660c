//! Token store statistics.
//!
//! Summarizes what the last tokenization run produced: files, token counts
//! and source bytes per category. Used by `medprep stats` to check that a
//! run picked up the whole corpus.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::progress::format_number;
use crate::store::TokenStore;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CategoryStats {
    pub files: usize,
    pub total_tokens: usize,
    /// Sum of per-file unique token counts.
    pub unique_tokens: usize,
    pub size_bytes: u64,
}

impl CategoryStats {
    pub fn avg_tokens_per_file(&self) -> usize {
        if self.files == 0 {
            0
        } else {
            self.total_tokens / self.files
        }
    }

    fn add(&mut self, other: &CategoryStats) {
        self.files += other.files;
        self.total_tokens += other.total_tokens;
        self.unique_tokens += other.unique_tokens;
        self.size_bytes += other.size_bytes;
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreStats {
    pub categories: BTreeMap<String, CategoryStats>,
    pub totals: CategoryStats,
}

pub fn compute_stats(store: &TokenStore) -> StoreStats {
    let mut stats = StoreStats::default();
    for (category, records) in store.categories() {
        let mut c = CategoryStats::default();
        for record in records {
            c.files += 1;
            c.total_tokens += record.total_token_count;
            c.unique_tokens += record.unique_token_count;
            c.size_bytes += record.original_size_bytes;
        }
        stats.totals.add(&c);
        stats.categories.insert(category.to_string(), c);
    }
    stats
}

/// Run the stats command: load the store and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let path = &config.store.path;
    if !path.exists() {
        anyhow::bail!(
            "Token store not found: {} (run `medprep tokenize` first)",
            path.display()
        );
    }
    let store = TokenStore::load(path)?;
    let stats = compute_stats(&store);

    let meta = std::fs::metadata(path)?;
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);

    println!("medprep: Token Store Stats");
    println!("===========================");
    println!();
    println!("  Store:       {}", path.display());
    println!("  Size:        {}", format_bytes(meta.len()));
    if let Some(ts) = modified {
        println!("  Tokenized:   {}", format_ts_relative(ts));
    }
    println!();

    if !stats.categories.is_empty() {
        println!(
            "  {:<22} {:>6} {:>12} {:>10} {:>10} {:>9}",
            "CATEGORY", "FILES", "TOKENS", "UNIQUE", "SIZE", "AVG/FILE"
        );
        println!("  {}", "-".repeat(74));
        for (category, c) in &stats.categories {
            print_row(category, c);
        }
        println!("  {}", "-".repeat(74));
    }
    print_row("total", &stats.totals);
    println!();

    Ok(())
}

fn print_row(label: &str, c: &CategoryStats) {
    println!(
        "  {:<22} {:>6} {:>12} {:>10} {:>10} {:>9}",
        label,
        c.files,
        format_number(c.total_tokens as u64),
        format_number(c.unique_tokens as u64),
        format_bytes(c.size_bytes),
        format_number(c.avg_tokens_per_file() as u64)
    );
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
