//! Word filtering for added/removed text

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Shortest word kept is one character longer than this
const MIN_WORD_LEN: usize = 2;

/// Wiki markup and talk-page words that dominate every diff
const WIKI_STOPWORDS: &[&str] = &[
    "ref", "redirect", "cite", "date", "article", "title", "via", "flag", "web", "user",
    "talk", "page", "url", "access", "accessdate", "publisher", "website", "reflist", "http",
    "https", "www", "com", "org", "html", "infobox", "category", "file", "thumb", "png", "jpg",
];

const ENGLISH_STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "and", "any", "are", "aren",
    "because", "been", "before", "being", "below", "between", "both", "but", "can", "cannot",
    "could", "couldn", "did", "didn", "does", "doesn", "doing", "don", "down", "during", "each",
    "else", "ever", "few", "for", "from", "further", "get", "had", "hadn", "has", "hasn",
    "have", "haven", "having", "hence", "her", "here", "hers", "herself", "him", "himself",
    "his", "how", "however", "into", "isn", "its", "itself", "just", "let", "like", "more",
    "most", "mustn", "myself", "nor", "not", "off", "once", "only", "other", "otherwise",
    "ought", "our", "ours", "ourselves", "out", "over", "own", "same", "shall", "shan", "she",
    "should", "shouldn", "since", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "therefore", "these", "they", "this", "those",
    "through", "too", "under", "until", "very", "was", "wasn", "were", "weren", "what", "when",
    "where", "which", "while", "who", "whom", "why", "with", "won", "would", "wouldn", "you",
    "your", "yours", "yourself", "yourselves",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        WIKI_STOPWORDS
            .iter()
            .chain(ENGLISH_STOPWORDS)
            .copied()
            .collect()
    })
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]+(?:['\x{2019}][A-Za-z]+)*").expect("valid regex"))
}

pub fn is_stopword(word: &str) -> bool {
    stopwords().contains(word.to_ascii_lowercase().as_str())
}

/// Words of a fragment: runs of ASCII letters, with inner apostrophes
/// dropped (`senator's` -> `senators`). Short words and stop words are
/// filtered out.
pub fn words(fragment: &str) -> Vec<String> {
    word_regex()
        .find_iter(fragment)
        .map(|m| m.as_str().replace(['\'', '\u{2019}'], ""))
        .filter(|w| w.len() > MIN_WORD_LEN && !is_stopword(w))
        .collect()
}

/// A word and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// The `limit` most frequent words across fragments, compared
/// case-insensitively. Ties are broken alphabetically.
pub fn top_words<'a, I>(fragments: I, limit: usize) -> Vec<WordCount>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for fragment in fragments {
        for word in words(fragment) {
            *counts.entry(word.to_lowercase()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    ranked.truncate(limit);
    ranked
}
