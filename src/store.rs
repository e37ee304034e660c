//! Flat-file token store.
//!
//! The token store is a single JSON object with one key per corpus category,
//! each holding an array of [`TokenRecord`]s. It is the only durable artifact
//! the query side depends on and is replaced wholesale by every tokenization
//! run.
//!
//! Loading fails open: an absent file is an empty store, and a malformed file
//! is an empty store plus a warning.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::models::TokenRecord;

/// In-memory snapshot of the token store, categories in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStore {
    categories: BTreeMap<String, Vec<TokenRecord>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records, grouping by category and ordering each
    /// category by filename.
    pub fn from_records(records: impl IntoIterator<Item = TokenRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        for records in store.categories.values_mut() {
            records.sort_by(|a, b| a.filename.cmp(&b.filename));
        }
        store
    }

    /// Append a record under its category.
    pub fn insert(&mut self, record: TokenRecord) {
        self.categories
            .entry(record.category.clone())
            .or_default()
            .push(record);
    }

    /// Make sure a category key exists even when it has no files.
    pub fn ensure_category(&mut self, category: &str) {
        self.categories.entry(category.to_string()).or_default();
    }

    /// Read a store file, treating absence or corruption as empty.
    pub fn load_or_empty(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "token store not found, using empty index");
            return Self::new();
        }
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "malformed token store, using empty index");
                Self::new()
            }
        }
    }

    /// Read a store file, propagating IO and parse errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read token store: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse token store: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut categories: BTreeMap<String, Vec<TokenRecord>> = serde_json::from_str(content)?;
        for (category, records) in categories.iter_mut() {
            for record in records.iter_mut() {
                record.category = category.clone();
            }
        }
        Ok(Self { categories })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.categories)?)
    }

    /// Atomically replace the store file (write sibling temp file, rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = self.to_json()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace token store: {}", path.display()))?;
        Ok(())
    }

    /// Categories with their records, in name order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[TokenRecord])> {
        self.categories
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All records in processing order: category name, then stored order.
    pub fn records(&self) -> impl Iterator<Item = &TokenRecord> {
        self.categories.values().flatten()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn find(&self, category: &str, filename: &str) -> Option<&TokenRecord> {
        self.categories
            .get(category)?
            .iter()
            .find(|r| r.filename == filename)
    }

    pub fn file_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }
}
