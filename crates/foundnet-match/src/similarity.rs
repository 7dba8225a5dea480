//! Bag-of-words text similarity over a two-document corpus.
//!
//! Each company is reduced to one short string (description + industry).
//! The corpus for a comparison is exactly the two strings being compared, so
//! IDF is computed from that 2-document set alone with the smoothed form
//! `ln((1 + n) / (1 + df)) + 1`. Smoothing keeps terms shared by both
//! documents at a positive weight, which is what makes identical texts score
//! 1.0 instead of collapsing to a zero vector.

use std::collections::{BTreeSet, HashMap};

/// Lowercase and split on non-alphanumeric boundaries, keeping tokens of at
/// least two characters. Single-character tokens carry no signal for this
/// kind of text and only inflate the vocabulary.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

fn term_counts(tokens: &[String]) -> HashMap<&str, u32> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity of the TF-IDF vectors of `text_a` and `text_b`,
/// in `[0, 1]`. Symmetric. Degenerate input (either text empty after
/// tokenization, or a zero-norm vector) fails soft to 0.0.
pub fn similarity(text_a: &str, text_b: &str) -> f64 {
    let tokens_a = tokenize(text_a);
    let tokens_b = tokenize(text_b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let tf_a = term_counts(&tokens_a);
    let tf_b = term_counts(&tokens_b);

    let vocab: BTreeSet<&str> = tf_a.keys().chain(tf_b.keys()).copied().collect();

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for term in vocab {
        let count_a = f64::from(tf_a.get(term).copied().unwrap_or(0));
        let count_b = f64::from(tf_b.get(term).copied().unwrap_or(0));

        let df = f64::from(u32::from(count_a > 0.0) + u32::from(count_b > 0.0));
        // n = 2 documents, smoothed
        let idf = ((1.0 + 2.0) / (1.0 + df)).ln() + 1.0;

        let weight_a = count_a * idf;
        let weight_b = count_b * idf;

        dot += weight_a * weight_b;
        norm_a += weight_a * weight_a;
        norm_b += weight_b * weight_b;
    }

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_short_tokens() {
        assert_eq!(
            tokenize("AI-powered B2B Analytics, v2!"),
            vec!["ai", "powered", "b2b", "analytics", "v2"]
        );
        assert_eq!(tokenize("a b c"), Vec::<String>::new());
    }

    #[test]
    fn identical_texts_score_one() {
        let text = "AI analytics for healthcare HealthTech";
        let score = similarity(text, text);
        assert!((score - 1.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "fintech payments infrastructure for small merchants";
        let b = "merchant payments and lending fintech";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn disjoint_vocabulary_scores_zero() {
        assert_eq!(similarity("quantum robotics", "organic farming"), 0.0);
    }

    #[test]
    fn empty_text_fails_soft() {
        assert_eq!(similarity("", "healthcare analytics"), 0.0);
        assert_eq!(similarity("healthcare analytics", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn partial_overlap_scores_between_zero_and_one() {
        let score = similarity(
            "AI analytics for healthcare HealthTech",
            "AI diagnostics for hospitals HealthTech",
        );
        assert!(score > 0.0 && score < 1.0, "got {score}");
    }

    #[test]
    fn scores_never_leave_unit_interval() {
        let pairs = [
            ("seed stage biotech", "seed stage biotech startup"),
            ("one two three", "three two one"),
            ("repeated repeated repeated terms", "repeated terms"),
        ];
        for (a, b) in pairs {
            let score = similarity(a, b);
            assert!((0.0..=1.0).contains(&score), "({a}, {b}) -> {score}");
        }
    }
}
