//! Topic taxonomy and slug normalization.
//!
//! A [`Taxonomy`] maps topic slugs to the keywords that identify them in
//! filenames and content. It is a plain value passed into the indexer so
//! callers (and tests) can substitute their own.

use std::collections::BTreeMap;

/// Normalize a free-form topic name into a slug.
///
/// Lower-cases, replaces every character outside `[a-z0-9_]` with `_`,
/// collapses underscore runs and trims leading/trailing underscores.
/// Total and idempotent.
pub fn normalize_slug(topic: &str) -> String {
    let mut out = String::with_capacity(topic.len());
    for c in topic.trim().to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// Mapping of topic slug to matching keywords.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Taxonomy {
    topics: BTreeMap<String, Vec<String>>,
}

impl Taxonomy {
    /// Build a taxonomy from `(topic, keywords)` pairs. Topic names are
    /// normalized; topics without any non-blank keyword are dropped.
    pub fn new<I, K, W>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<W>)>,
        K: AsRef<str>,
        W: AsRef<str>,
    {
        let mut topics: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (topic, keywords) in entries {
            let slug = normalize_slug(topic.as_ref());
            if slug.is_empty() {
                continue;
            }
            let keywords: Vec<String> = keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                continue;
            }
            topics.entry(slug).or_default().extend(keywords);
        }
        Self { topics }
    }

    /// The reference medical taxonomy of ten topics.
    pub fn reference() -> Self {
        Self::new([
            (
                "heart_failure",
                vec!["heart failure", "cardiac failure", "CHF", "congestive heart"],
            ),
            (
                "diabetes",
                vec!["diabetes", "diabetic", "insulin", "glucose", "glycemic"],
            ),
            (
                "hypertension",
                vec!["hypertension", "blood pressure", "HTN", "antihypertensive"],
            ),
            (
                "pneumonia",
                vec!["pneumonia", "respiratory infection", "lung infection"],
            ),
            (
                "kidney_disease",
                vec!["kidney", "renal", "nephrology", "CKD", "acute kidney"],
            ),
            (
                "neurology",
                vec!["neurology", "neurological", "brain", "nervous system"],
            ),
            (
                "rheumatology",
                vec!["rheumatology", "arthritis", "joint", "autoimmune"],
            ),
            (
                "cardiology",
                vec!["cardiology", "cardiac", "heart", "cardiovascular"],
            ),
            (
                "endocrinology",
                vec!["endocrine", "hormone", "thyroid", "adrenal"],
            ),
            (
                "gastroenterology",
                vec!["gastro", "digestive", "liver", "intestinal"],
            ),
        ])
    }

    /// Iterate topics in slug order. Keywords are lower-case.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.topics.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_examples() {
        assert_eq!(normalize_slug("Heart Failure"), "heart_failure");
        assert_eq!(normalize_slug("  --CKD (stage 3)-- "), "ckd_stage_3");
        assert_eq!(normalize_slug("heart__failure"), "heart_failure");
        assert_eq!(normalize_slug("Ödem"), "dem");
        assert_eq!(normalize_slug(""), "");
        assert_eq!(normalize_slug("!!!"), "");
    }

    #[test]
    fn reference_has_ten_topics() {
        let t = Taxonomy::reference();
        assert_eq!(t.len(), 10);
        let hf = t.iter().find(|(s, _)| *s == "heart_failure").unwrap().1;
        assert!(hf.contains(&"chf".to_string()));
    }

    #[test]
    fn new_drops_empty_topics_and_merges_duplicates() {
        let t = Taxonomy::new([
            ("Heart Failure", vec!["CHF"]),
            ("heart_failure", vec!["cardiac failure"]),
            ("empty", vec!["  "]),
            ("???", vec!["x"]),
        ]);
        assert_eq!(t.len(), 1);
        let (slug, kws) = t.iter().next().unwrap();
        assert_eq!(slug, "heart_failure");
        assert_eq!(kws, &["chf".to_string(), "cardiac failure".to_string()]);
    }
}
