//! Query operations over a token store snapshot.
//!
//! [`QueryService`] builds the topic index once from an immutable
//! [`TokenStore`] and answers content, summary and prediction queries from
//! it. Every operation is total: unknown topics are a distinct
//! [`QueryError::TopicNotFound`] (content) or a placeholder (summary), and
//! prediction limits are clamped.

use serde::Serialize;

use crate::config::Config;
use crate::index::{build_topic_index, find_topic, TopicIndex};
use crate::models::PredictionItem;
use crate::predict::{predict, RandomSource};
use crate::store::TokenStore;
use crate::summarize::summarize;
use crate::taxonomy::Taxonomy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentResponse {
    pub topic: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResponse {
    pub topic: String,
    pub summary: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub predictions: Vec<PredictionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No indexed topic matches the query. `available` lists indexed slugs.
    TopicNotFound { topic: String, available: Vec<String> },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::TopicNotFound { topic, available } if available.is_empty() => {
                write!(f, "Topic '{}' not found (index is empty)", topic)
            }
            QueryError::TopicNotFound { topic, available } => write!(
                f,
                "Topic '{}' not found. Available topics: {}",
                topic,
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for QueryError {}

pub struct QueryService {
    index: TopicIndex,
}

impl QueryService {
    pub fn new(store: &TokenStore, taxonomy: &Taxonomy) -> Self {
        Self {
            index: build_topic_index(store, taxonomy),
        }
    }

    /// Load the configured store (failing open to empty) and index it.
    pub fn from_config(config: &Config) -> Self {
        let store = TokenStore::load_or_empty(&config.store.path);
        Self::new(&store, &config.taxonomy())
    }

    pub fn index(&self) -> &TopicIndex {
        &self.index
    }

    pub fn topics(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    pub fn content(&self, topic: &str) -> Result<ContentResponse, QueryError> {
        match find_topic(topic, &self.index) {
            Some(entry) => Ok(ContentResponse {
                topic: topic.to_string(),
                content: entry.aggregated_content.trim().to_string(),
            }),
            None => Err(QueryError::TopicNotFound {
                topic: topic.to_string(),
                available: self.topics(),
            }),
        }
    }

    /// High-yield points for `topic`; an unknown topic summarizes empty
    /// content and gets the placeholder point.
    pub fn summarize(&self, topic: &str) -> SummaryResponse {
        let content = find_topic(topic, &self.index)
            .map(|e| e.aggregated_content.as_str())
            .unwrap_or("");
        SummaryResponse {
            topic: topic.to_string(),
            summary: summarize(topic, content),
        }
    }

    pub fn predict(&self, limit: usize, rng: &mut dyn RandomSource) -> PredictionResponse {
        PredictionResponse {
            predictions: predict(&self.index, limit, rng),
        }
    }
}

// ============ CLI runners ============

pub fn run_content(config: &Config, topic: &str, json: bool) -> anyhow::Result<()> {
    let service = QueryService::from_config(config);
    let resp = service.content(topic)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        println!("{}", resp.content);
    }
    Ok(())
}

pub fn run_summarize(config: &Config, topic: &str, json: bool) -> anyhow::Result<()> {
    let service = QueryService::from_config(config);
    let resp = service.summarize(topic);
    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        println!("High-yield points: {}", resp.topic);
        for (i, point) in resp.summary.iter().enumerate() {
            println!("  {}. {}", i + 1, point);
        }
    }
    Ok(())
}

pub fn run_predict(
    config: &Config,
    limit: Option<usize>,
    seed: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let service = QueryService::from_config(config);
    let limit = limit.unwrap_or(config.predict.default_limit);
    let mut rng = crate::predict::StdRandom::from_seed_option(seed.or(config.predict.seed));
    let resp = service.predict(limit, &mut rng);
    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        println!("{:<4} {:<28} SCORE", "RANK", "TOPIC");
        for (i, p) in resp.predictions.iter().enumerate() {
            println!("{:<4} {:<28} {:.2}", i + 1, p.topic_slug, p.score);
        }
    }
    Ok(())
}
