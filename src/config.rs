//! TOML configuration.
//!
//! Every section is optional; a missing file is equivalent to
//! [`Config::minimal`]. Values are validated in [`load_config`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::chunk::{ChunkOptions, TokenizerKind};
use crate::taxonomy::Taxonomy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub predict: PredictConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub validate: ValidateConfig,
    /// Full replacement for the reference taxonomy.
    #[serde(default)]
    pub taxonomy: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Folder name under `root` to category key.
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<String, String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            extensions: default_extensions(),
            categories: default_categories(),
        }
    }
}

fn default_corpus_root() -> PathBuf {
    PathBuf::from("PDFs")
}

fn default_extensions() -> Vec<String> {
    ["pdf", "xlsx", "xls", "csv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_categories() -> BTreeMap<String, String> {
    [
        ("Harrison_Textbooks", "harrison_textbooks"),
        ("Guidelines", "guidelines"),
        ("Neurology_Textbooks", "neurology_textbooks"),
        ("Question_Papers", "question_papers"),
    ]
    .iter()
    .map(|(folder, key)| (folder.to_string(), key.to_string()))
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("tokenized_content.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_sample_tokens")]
    pub sample_tokens: usize,
    #[serde(default)]
    pub stored_chunks: usize,
    #[serde(default)]
    pub tokenizer: TokenizerKind,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            sample_tokens: default_sample_tokens(),
            stored_chunks: 0,
            tokenizer: TokenizerKind::default(),
        }
    }
}

fn default_max_words() -> usize {
    512
}
fn default_sample_tokens() -> usize {
    50
}

impl ChunkingConfig {
    pub fn options(&self) -> ChunkOptions {
        ChunkOptions {
            max_words: self.max_words,
            sample_tokens: self.sample_tokens,
            stored_chunks: self.stored_chunks,
            tokenizer: self.tokenizer,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            seed: None,
        }
    }
}

fn default_limit() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8001".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidateConfig {
    #[serde(default = "default_min_tokens")]
    pub min_tokens_per_file: usize,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            min_tokens_per_file: default_min_tokens(),
        }
    }
}

fn default_min_tokens() -> usize {
    10
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// The configured taxonomy, or the reference one.
    pub fn taxonomy(&self) -> Taxonomy {
        match &self.taxonomy {
            Some(topics) => Taxonomy::new(topics.iter().map(|(k, v)| (k.as_str(), v.clone()))),
            None => Taxonomy::reference(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`Config::minimal`].
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::minimal());
    }
    load_config(path)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_words == 0 {
        anyhow::bail!("chunking.max_words must be > 0");
    }

    if config.predict.default_limit < 1 {
        anyhow::bail!("predict.default_limit must be >= 1");
    }

    if config.ingest.workers == 0 {
        anyhow::bail!("ingest.workers must be >= 1");
    }

    if config.corpus.extensions.is_empty() {
        anyhow::bail!("corpus.extensions must not be empty");
    }
    for ext in &config.corpus.extensions {
        if crate::models::FileType::from_extension(ext).is_none() {
            anyhow::bail!(
                "Unsupported extension in corpus.extensions: '{}'. Must be pdf, xlsx, xls, or csv.",
                ext
            );
        }
    }

    if let Some(topics) = &config.taxonomy {
        if config.taxonomy().is_empty() {
            anyhow::bail!(
                "taxonomy defines {} topic(s) but none has a usable name and keyword",
                topics.len()
            );
        }
    }

    Ok(())
}
