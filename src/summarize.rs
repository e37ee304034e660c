//! Keyword-scored "high-yield" summaries.
//!
//! Picks short clinical sentences from a topic's aggregated content. A
//! sentence qualifies when it mentions one of [`HIGH_YIELD_KEYWORDS`] and its
//! cleaned length falls inside the point length window. When too few
//! sentences qualify, generic filler points naming the topic are appended.

use regex::Regex;
use std::sync::OnceLock;

/// Words that mark a sentence as exam-relevant.
pub const HIGH_YIELD_KEYWORDS: &[&str] = &[
    "diagnosis",
    "treatment",
    "management",
    "symptoms",
    "signs",
    "complications",
    "prognosis",
    "pathophysiology",
    "etiology",
    "epidemiology",
    "risk factors",
    "prevention",
    "guidelines",
    "criteria",
    "classification",
    "staging",
    "monitoring",
];

/// Maximum points returned.
pub const MAX_POINTS: usize = 5;
/// Below this many extracted points, filler points are appended.
const MIN_POINTS: usize = 3;
/// Only the first sentences of the content are scanned.
const SCAN_SENTENCES: usize = 20;
/// Candidate sentences at or below this length are ignored.
const MIN_CANDIDATE_CHARS: usize = 20;
/// Kept points must be strictly longer than this...
const MIN_POINT_CHARS: usize = 30;
/// ...and strictly shorter than this.
const MAX_POINT_CHARS: usize = 200;

fn sentence_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("static regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Extract up to [`MAX_POINTS`] high-yield points for `topic`.
pub fn summarize(topic: &str, content: &str) -> Vec<String> {
    if content.is_empty() {
        return vec![format!("No specific content available for {}", topic)];
    }

    let mut points: Vec<String> = Vec::new();
    let candidates = sentence_split_re()
        .split(content)
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_CANDIDATE_CHARS)
        .take(SCAN_SENTENCES);

    for sentence in candidates {
        let lower = sentence.to_lowercase();
        if HIGH_YIELD_KEYWORDS.iter().any(|k| lower.contains(k)) {
            let clean = whitespace_re().replace_all(sentence, " ").trim().to_string();
            let len = clean.chars().count();
            if len > MIN_POINT_CHARS && len < MAX_POINT_CHARS {
                points.push(clean);
            }
        }
        if points.len() >= MAX_POINTS {
            break;
        }
    }

    if points.len() < MIN_POINTS {
        points.extend(filler_points(topic));
    }
    points.truncate(MAX_POINTS);
    points
}

fn filler_points(topic: &str) -> [String; 3] {
    [
        format!("Key clinical considerations for {}", topic),
        "Diagnostic and therapeutic approaches".to_string(),
        "Important management principles".to_string(),
    ]
}
