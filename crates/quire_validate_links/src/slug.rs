//! GitHub style heading slugs.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Everything that is not a letter, mark, number, connector, space or hyphen.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{M}\p{N}\p{Pc} -]").expect("Invalid slug pattern"));

/// Generates unique slugs for the headings of one document.
///
/// Repeated slugs get an ordinal suffix: `intro`, `intro-1`, `intro-2`.
#[derive(Debug, Default)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slug of `value`, unique within this slugger.
    pub fn slug(&mut self, value: &str) -> String {
        let original = slug(value);
        let mut result = original.clone();

        while self.occurrences.contains_key(&result) {
            let count = self.occurrences.entry(original.clone()).or_insert(0);
            *count += 1;
            result = format!("{original}-{count}");
        }

        self.occurrences.insert(result.clone(), 0);
        result
    }

    /// Forgets every slug generated so far.
    pub fn reset(&mut self) {
        self.occurrences.clear();
    }
}

/// Returns the slug of `value`, without deduplication.
pub fn slug(value: &str) -> String {
    DISALLOWED
        .replace_all(&value.to_lowercase(), "")
        .replace(' ', "-")
}
