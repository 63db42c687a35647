//! Fuzzy "did you mean" suggestions.

/// Minimum similarity for a suggestion.
pub const THRESHOLD: f64 = 0.7;

/// Returns the entry of `dictionary` most similar to `value`.
///
/// Similarity is the normalized Levenshtein distance, compared case
/// insensitively. Nothing is proposed below `threshold`; on a tie the first
/// entry wins.
pub fn propose<'a>(value: &str, dictionary: &'a [String], threshold: f64) -> Option<&'a str> {
    let value = value.to_lowercase();
    let mut best: Option<(&str, f64)> = None;

    for candidate in dictionary {
        let similarity = strsim::normalized_levenshtein(&value, &candidate.to_lowercase());
        if similarity < threshold {
            continue;
        }
        if best.is_none_or(|(_, highest)| similarity > highest) {
            best = Some((candidate, similarity));
        }
    }

    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dictionary(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    #[rstest]
    #[case("intro", &["intros"], Some("intros"))]
    #[case("intro", &["other"], None)]
    #[case("intro", &[], None)]
    #[case("Install", &["usage", "installs", "install-1"], Some("installs"))]
    #[case("readm.md", &["a.md", "readme.md"], Some("readme.md"))]
    fn test_propose(
        #[case] value: &str,
        #[case] words: &[&str],
        #[case] expected: Option<&str>,
    ) {
        let words = dictionary(words);
        assert_eq!(propose(value, &words, THRESHOLD), expected);
    }

    #[test]
    fn test_first_of_equals_wins() {
        let words = dictionary(&["abcd", "abce"]);
        assert_eq!(propose("abcf", &words, 0.5), Some("abcd"));
    }
}
