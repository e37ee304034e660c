//! Topic index built on demand from the token store.
//!
//! Every (file, topic) pair is tested against the taxonomy: a file matches a
//! topic when any of the topic's keywords appears (case-insensitively) in the
//! filename or in a sample of the file's leading chunks. Matching fans out, so
//! one file can feed several topics. The index is never persisted.

use std::collections::BTreeMap;

use crate::models::{TokenRecord, TopicEntry};
use crate::store::TokenStore;
use crate::taxonomy::{normalize_slug, Taxonomy};

/// Chunks inspected when matching keywords against content.
const MATCH_CHUNKS: usize = 5;
/// Chunks copied into a topic's aggregated content per matched file.
const SAMPLE_CHUNKS: usize = 3;
/// Character budget for one file's content sample.
const SAMPLE_MAX_CHARS: usize = 1000;

/// Topic slug to entry, in slug order.
pub type TopicIndex = BTreeMap<String, TopicEntry>;

/// Cross-reference every record in the store against the taxonomy.
pub fn build_topic_index(store: &TokenStore, taxonomy: &Taxonomy) -> TopicIndex {
    let mut index = TopicIndex::new();

    for record in store.records() {
        let filename = record.filename.to_lowercase();
        let content = leading_chunks(record, MATCH_CHUNKS).to_lowercase();

        for (topic, keywords) in taxonomy.iter() {
            let matched = keywords
                .iter()
                .any(|k| filename.contains(k.as_str()) || content.contains(k.as_str()));
            if !matched {
                continue;
            }

            let entry = index
                .entry(topic.to_string())
                .or_insert_with(|| TopicEntry {
                    topic_slug: topic.to_string(),
                    aggregated_content: String::new(),
                    matched_files: Vec::new(),
                    category: record.category.clone(),
                });
            entry.matched_files.push(record.filename.clone());
            if !record.chunks.is_empty() {
                entry.aggregated_content.push_str(&format!(
                    "\n\nFrom {}:\n{}",
                    record.filename,
                    content_sample(record)
                ));
            }
        }
    }

    index
}

fn leading_chunks(record: &TokenRecord, n: usize) -> String {
    record
        .chunks
        .iter()
        .take(n)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First [`SAMPLE_CHUNKS`] chunks, cut to [`SAMPLE_MAX_CHARS`] characters
/// with a trailing `...` when longer.
fn content_sample(record: &TokenRecord) -> String {
    let sample = leading_chunks(record, SAMPLE_CHUNKS);
    if sample.chars().count() > SAMPLE_MAX_CHARS {
        let mut cut: String = sample.chars().take(SAMPLE_MAX_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        sample
    }
}

/// Resolve a free-form topic query against the index.
///
/// Tries the exact normalized slug first. Otherwise any slug that contains
/// the query, or is contained in it, is a candidate; the candidate with the
/// longest overlap wins and equal overlaps go to the smallest slug.
pub fn find_topic<'a>(query: &str, index: &'a TopicIndex) -> Option<&'a TopicEntry> {
    let normalized = normalize_slug(query);
    if normalized.is_empty() {
        return None;
    }
    if let Some(entry) = index.get(&normalized) {
        return Some(entry);
    }

    let mut best: Option<(&'a TopicEntry, usize)> = None;
    for (slug, entry) in index {
        let overlap = if slug.contains(normalized.as_str()) {
            normalized.len()
        } else if normalized.contains(slug.as_str()) {
            slug.len()
        } else {
            continue;
        };
        // BTreeMap iteration is slug-ordered, so strict > keeps the smallest
        // slug among equal overlaps.
        if best.map_or(true, |(_, o)| overlap > o) {
            best = Some((entry, overlap));
        }
    }
    best.map(|(entry, _)| entry)
}
