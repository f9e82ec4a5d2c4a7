//! Text normalisation shared by every text field.

use crate::data::MISSING_PLACEHOLDER;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// NLTK English stopword list.
const STOPWORDS: [&str; 179] = [
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

/// Irregular plurals and words the suffix rules would mangle.
const EXCEPTIONS: [(&str, &str); 24] = [
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("mice", "mouse"),
    ("people", "people"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("lives", "life"),
    ("leaves", "leaf"),
    ("halves", "half"),
    ("scarves", "scarf"),
    ("shelves", "shelf"),
    ("wolves", "wolf"),
    ("hoodies", "hoodie"),
    ("jeans", "jeans"),
    ("trousers", "trousers"),
    ("shorts", "shorts"),
    ("pants", "pants"),
    ("leggings", "leggings"),
    ("sunglasses", "sunglasses"),
    ("clothes", "clothes"),
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.into_iter().collect())
}

fn exceptions() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| EXCEPTIONS.into_iter().collect())
}

/// Rule-based noun lemmatiser.
pub fn lemmatize(token: &str) -> String {
    if let Some(lemma) = exceptions().get(token) {
        return lemma.to_string();
    }
    if token.chars().count() <= 3
        || token.ends_with("ss")
        || token.ends_with("us")
        || token.ends_with("is")
    {
        return token.to_string();
    }
    if let Some(stem) = token.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }
    match token.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => token.to_string(),
    }
}

/// Lowercase, tokenize, drop stopwords and non-alphabetic tokens, lemmatise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextCleaner;

impl TextCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Cleaned tokens in input order.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && t.chars().all(char::is_alphabetic))
            .filter(|t| !stopwords().contains(t))
            .map(lemmatize)
            .collect()
    }

    /// Cleaned text; never empty.
    ///
    /// ```rust
    /// use resale_pricer::text::TextCleaner;
    ///
    /// let cleaner = TextCleaner::new();
    /// assert_eq!(cleaner.clean("The Boxes, 2 Jackets & a Dress!"), "box jacket dress");
    /// assert_eq!(cleaner.clean("and the 42"), "missing");
    /// ```
    pub fn clean(&self, text: &str) -> String {
        let tokens = self.tokens(text);
        if tokens.is_empty() {
            MISSING_PLACEHOLDER.to_string()
        } else {
            tokens.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lemmatize_rules() {
        assert_eq!(lemmatize("jackets"), "jacket");
        assert_eq!(lemmatize("hoodies"), "hoodie");
        assert_eq!(lemmatize("berries"), "berry");
        assert_eq!(lemmatize("watches"), "watch");
        assert_eq!(lemmatize("dresses"), "dress");
        assert_eq!(lemmatize("dress"), "dress");
        assert_eq!(lemmatize("sleeves"), "sleeve");
        assert_eq!(lemmatize("scarves"), "scarf");
        assert_eq!(lemmatize("jeans"), "jeans");
        assert_eq!(lemmatize("status"), "status");
        assert_eq!(lemmatize("bus"), "bus");
        assert_eq!(lemmatize("women"), "woman");
    }

    #[test]
    fn test_clean_drops_stopwords_and_numbers() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean("Brand NEW with tags, size 3XL"), "brand new tag size");
    }

    #[test]
    fn test_clean_splits_hashtags() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean("#prada #tops"), "prada top");
    }

    #[test]
    fn test_clean_empty_becomes_placeholder() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean(""), MISSING_PLACEHOLDER);
        assert_eq!(cleaner.clean("!!! 123"), MISSING_PLACEHOLDER);
        assert_eq!(cleaner.clean(MISSING_PLACEHOLDER), MISSING_PLACEHOLDER);
    }

    #[test]
    fn test_stopword_list_has_no_duplicates() {
        assert_eq!(stopwords().len(), STOPWORDS.len());
    }
}
