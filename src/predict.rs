//! Heuristic exam-topic prediction.
//!
//! Each indexed topic is scored from corpus coverage plus a random
//! perturbation drawn from an injected [`RandomSource`]:
//!
//! ```text
//! score = min(files × 0.1, 0.5) + min(content_len / 10000, 0.3) + U(0.1, 0.4)
//! ```
//!
//! capped at 1.0 and rounded to two decimals. The random term stands in for
//! historical exam patterns the corpus does not record. Pass a seeded
//! [`StdRandom`] for reproducible rankings.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::index::TopicIndex;
use crate::models::PredictionItem;

/// Upper bound on predictions returned in one call.
pub const MAX_LIMIT: usize = 50;

const FILE_WEIGHT: f64 = 0.1;
const FILE_SCORE_CAP: f64 = 0.5;
const CONTENT_NORMALIZER: f64 = 10_000.0;
const CONTENT_SCORE_CAP: f64 = 0.3;
const JITTER_LOW: f64 = 0.1;
const JITTER_HIGH: f64 = 0.4;

/// Returned when no topic could be indexed.
const FALLBACK: [(&str, f64); 3] = [
    ("cardiovascular_disease", 0.85),
    ("diabetes_management", 0.78),
    ("respiratory_conditions", 0.72),
];

/// Source of the uniform perturbation term.
pub trait RandomSource {
    /// A value in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// [`RandomSource`] backed by the standard seedable generator.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeded when `seed` is given, OS entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.random_range(low..high)
    }
}

/// Clamp a requested limit into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

/// Rank indexed topics, highest score first.
pub fn predict<R: RandomSource + ?Sized>(
    index: &TopicIndex,
    limit: usize,
    rng: &mut R,
) -> Vec<PredictionItem> {
    let limit = clamp_limit(limit);

    if index.is_empty() {
        return FALLBACK
            .iter()
            .take(limit)
            .map(|(topic, score)| PredictionItem {
                topic_slug: topic.to_string(),
                score: *score,
            })
            .collect();
    }

    let mut scored: Vec<PredictionItem> = index
        .values()
        .map(|entry| {
            let files = (entry.matched_files.len() as f64 * FILE_WEIGHT).min(FILE_SCORE_CAP);
            let content = (entry.aggregated_content.chars().count() as f64 / CONTENT_NORMALIZER)
                .min(CONTENT_SCORE_CAP);
            let jitter = rng.uniform(JITTER_LOW, JITTER_HIGH);
            let score = (files + content + jitter).clamp(0.0, 1.0);
            PredictionItem {
                topic_slug: entry.topic_slug.clone(),
                score: round2(score),
            }
        })
        .collect();

    // Stable sort: equal scores keep slug order.
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
