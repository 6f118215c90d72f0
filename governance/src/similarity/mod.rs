//! Text similarity used for clustering findings and matching decisions.
//!
//! The combined score is the larger of two Jaccard similarities computed on
//! lower-cased, non-alphanumeric-split tokens with stop words removed:
//! one over the unigram keyword sets, one over adjacent-token bigrams.
//! Keyword overlap catches short claims sharing a single key term; bigram
//! overlap catches longer paraphrases that share phrasing.

pub mod search;

pub use search::{DecisionEntry, DecisionIndex, SimilarMatch, SimilaritySearch};

use std::collections::HashSet;

/// Function words plus generic verbs that carry no claim-specific meaning.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "then", "else", "of", "to", "in", "on", "at",
    "by", "for", "with", "from", "into", "onto", "as", "is", "are", "was", "were", "be", "been",
    "being", "it", "its", "this", "that", "these", "those", "there", "their", "they", "them",
    "we", "our", "you", "your", "should", "would", "could", "can", "may", "might", "must",
    "will", "shall", "do", "does", "did", "has", "have", "had", "not", "no", "all", "any",
    "each", "when", "which", "who", "what", "where", "so", "such", "than", "too", "very",
    "also", "more", "most", "some", "ensure", "implement", "use", "add", "make", "consider",
    "provide", "allow", "need", "needs",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Lower-case and split on anything that is not alphanumeric.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens with stop words removed, in original order.
fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .collect()
}

pub fn keywords(text: &str) -> HashSet<String> {
    content_tokens(text).into_iter().collect()
}

/// Adjacent content-token pairs, joined with a single space.
pub fn bigrams(text: &str) -> HashSet<String> {
    content_tokens(text)
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

/// |A ∩ B| / |A ∪ B|; two empty sets score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Combined similarity in [0, 1].
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let keyword_score = jaccard(&keywords(a), &keywords(b));
    let bigram_score = jaccard(&bigrams(a), &bigrams(b));
    keyword_score.max(bigram_score)
}
