//! Phrase search over extracted page text.
//!
//! Page text coming out of a PDF is noisy: words of one phrase may be split
//! across lines, separated by several spaces, or set in capitals in a
//! heading. Matching therefore runs on *normalised* text (every whitespace
//! run collapsed to one space, everything lowercased) with a pattern that
//! accepts any whitespace run between the words of the phrase and requires
//! word boundaries at both ends.
//!
//! Pages are scanned independently. A phrase broken across a page boundary
//! is never reported.

use crate::error::GazetteError;
use crate::pipeline::extract::PageText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Characters of context kept on each side of a match.
pub const DEFAULT_SNIPPET_RADIUS: usize = 50;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs to a single space and lowercase.
pub fn normalize_text(raw: &str) -> String {
    RE_WHITESPACE.replace_all(raw, " ").to_lowercase()
}

/// A validated search phrase.
#[derive(Debug, Clone)]
pub struct SearchTerm {
    phrase: String,
    words: Vec<String>,
    pattern: Regex,
}

impl SearchTerm {
    /// Build a term from a user-supplied phrase.
    ///
    /// # Errors
    /// [`GazetteError::InvalidTerm`] when the phrase has no words.
    pub fn new(phrase: impl AsRef<str>) -> Result<Self, GazetteError> {
        let phrase = phrase.as_ref().trim();
        let words: Vec<String> = phrase
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            return Err(GazetteError::InvalidTerm(
                "search phrase must contain at least one word".into(),
            ));
        }

        let body = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join(r"\s+");
        let pattern = Regex::new(&format!(r"\b{body}\b"))
            .map_err(|e| GazetteError::InvalidTerm(e.to_string()))?;

        Ok(Self {
            phrase: phrase.to_string(),
            words,
            pattern,
        })
    }

    /// The phrase as configured (trimmed, original case).
    pub fn as_str(&self) -> &str {
        &self.phrase
    }

    /// Lowercased words of the phrase.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Byte ranges of every non-overlapping match in already-normalised text.
    pub fn find_in<'t>(&'t self, normalized: &'t str) -> impl Iterator<Item = (usize, usize)> + 't {
        self.pattern.find_iter(normalized).map(|m| (m.start(), m.end()))
    }
}

impl std::fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.phrase)
    }
}

/// One located match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// 1-based page number.
    pub page: usize,
    /// Normalised text around the match, trimmed.
    pub snippet: String,
}

/// All matches in a document, in page order then match order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub occurrences: Vec<Occurrence>,
    pub pages_scanned: usize,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Occurrence> {
        self.occurrences.iter()
    }

    /// Distinct page numbers that contain at least one match, ascending.
    pub fn pages_with_hits(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.occurrences.iter().map(|o| o.page).collect();
        pages.dedup();
        pages
    }
}

impl<'a> IntoIterator for &'a ScanResult {
    type Item = &'a Occurrence;
    type IntoIter = std::slice::Iter<'a, Occurrence>;

    fn into_iter(self) -> Self::IntoIter {
        self.occurrences.iter()
    }
}

/// Searches pages for one [`SearchTerm`].
#[derive(Debug, Clone)]
pub struct Scanner {
    term: SearchTerm,
    radius: usize,
}

impl Scanner {
    pub fn new(term: SearchTerm, radius: usize) -> Self {
        Self { term, radius }
    }

    pub fn term(&self) -> &SearchTerm {
        &self.term
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Matches on a single page.
    pub fn scan_page(&self, page: &PageText) -> Vec<Occurrence> {
        let normalized = normalize_text(&page.text);
        self.term
            .find_in(&normalized)
            .map(|(start, end)| Occurrence {
                page: page.number,
                snippet: context_window(&normalized, start, end, self.radius).to_string(),
            })
            .collect()
    }

    /// Matches across all pages, in the order the pages are given.
    pub fn scan(&self, pages: &[PageText]) -> ScanResult {
        let occurrences = pages.iter().flat_map(|p| self.scan_page(p)).collect();
        ScanResult {
            occurrences,
            pages_scanned: pages.len(),
        }
    }
}

/// `radius` characters either side of `text[start..end]`, clamped to the
/// text bounds and trimmed. Counts `char`s, never splits one.
fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    text[from..to].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: usize, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    fn scanner(phrase: &str, radius: usize) -> Scanner {
        Scanner::new(SearchTerm::new(phrase).unwrap(), radius)
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("A  B\n\tC"), "a b c");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("CONSERVAÇÃO"), "conservação");
    }

    #[test]
    fn test_empty_term_rejected() {
        assert!(matches!(
            SearchTerm::new(""),
            Err(GazetteError::InvalidTerm(_))
        ));
        assert!(matches!(
            SearchTerm::new("  \n\t "),
            Err(GazetteError::InvalidTerm(_))
        ));
    }

    #[test]
    fn test_term_words_lowercased() {
        let t = SearchTerm::new("  Conservação   de PAVIMENTO ").unwrap();
        assert_eq!(t.words(), &["conservação", "de", "pavimento"]);
        assert_eq!(t.as_str(), "Conservação   de PAVIMENTO");
    }

    #[test]
    fn test_term_with_regex_metacharacters() {
        let s = scanner("lei 14.133", 10);
        let hits = s.scan_page(&page(1, "nos termos da lei 14.133 e nao da lei 14x133"));
        assert_eq!(hits.len(), 1);
        assert!(hits[0].snippet.contains("lei 14.133"));
    }

    #[test]
    fn test_absent_phrase_yields_nothing() {
        let s = scanner("conservação de pavimento", 30);
        let result = s.scan(&[page(1, "nada aqui"), page(2, "pavimento novo")]);
        assert!(result.is_empty());
        assert_eq!(result.pages_scanned, 2);
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let s = scanner("pavimento", 30);
        assert!(s.scan_page(&page(1, "")).is_empty());
    }

    #[test]
    fn test_single_hit_page_and_snippet() {
        let s = scanner("conservação de pavimento", 30);
        let text = "...obras de conservação de pavimento na avenida...";
        let result = s.scan(&[page(1, "capa"), page(2, ""), page(3, text)]);
        assert_eq!(
            result.occurrences,
            vec![Occurrence {
                page: 3,
                snippet: text.to_string(),
            }]
        );
    }

    #[test]
    fn test_snippet_clamped_to_radius() {
        let s = scanner("alvo", 5);
        let hits = s.scan_page(&page(1, "0123456789 alvo 0123456789"));
        assert_eq!(hits.len(), 1);
        // 5 chars before ("6789 "), 5 after (" 0123"), then trimmed
        assert_eq!(hits[0].snippet, "6789 alvo 0123");
    }

    #[test]
    fn test_snippet_counts_chars_not_bytes() {
        let s = scanner("alvo", 3);
        let hits = s.scan_page(&page(1, "ãçé alvo éçã"));
        assert_eq!(hits[0].snippet, "çé alvo éç");
    }

    #[test]
    fn test_zero_radius_snippet_is_match() {
        let s = scanner("de pavimento", 0);
        let hits = s.scan_page(&page(1, "conservação de  Pavimento urbano"));
        assert_eq!(hits[0].snippet, "de pavimento");
    }

    #[test]
    fn test_word_boundary() {
        let s = scanner("pavimento", 10);
        assert!(s.scan_page(&page(1, "o pavimentouse ficou")).is_empty());
        assert!(s.scan_page(&page(1, "repavimento")).is_empty());
        assert_eq!(s.scan_page(&page(1, "pavimento.")).len(), 1);
    }

    #[test]
    fn test_word_boundary_with_accented_letters() {
        let s = scanner("conservação", 10);
        assert!(s.scan_page(&page(1, "conservaçãoes")).is_empty());
        assert_eq!(s.scan_page(&page(1, "a conservação.")).len(), 1);
    }

    #[test]
    fn test_whitespace_insensitive() {
        let s = scanner("a b", 10);
        let single = s.scan_page(&page(1, "x a b y"));
        let spaces = s.scan_page(&page(1, "x a    b y"));
        let newline = s.scan_page(&page(1, "x a\nb y"));
        assert_eq!(single.len(), 1);
        assert_eq!(single, spaces);
        assert_eq!(single, newline);
    }

    #[test]
    fn test_case_insensitive() {
        let s = scanner("Pavimento", 10);
        let hits = s.scan_page(&page(1, "OBRAS DE PAVIMENTO"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet, "obras de pavimento");
    }

    #[test]
    fn test_order_pages_then_matches() {
        let s = scanner("x", 0);
        let result = s.scan(&[page(1, "x y x"), page(2, "y"), page(3, "x")]);
        let pages: Vec<usize> = result.iter().map(|o| o.page).collect();
        assert_eq!(pages, vec![1, 1, 3]);
        assert_eq!(result.pages_with_hits(), vec![1, 3]);
    }

    #[test]
    fn test_no_match_across_pages() {
        let s = scanner("conservação de pavimento", 10);
        let result = s.scan(&[page(1, "obras de conservação"), page(2, "de pavimento")]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_scan_is_idempotent() {
        let s = scanner("pavimento", 20);
        let pages = vec![
            page(1, "pavimento e mais pavimento"),
            page(2, "PAVIMENTO\n\nnovo"),
        ];
        assert_eq!(s.scan(&pages), s.scan(&pages));
    }
}
