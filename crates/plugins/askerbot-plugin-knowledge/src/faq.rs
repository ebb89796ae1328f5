/*!
# FAQ table

Pre-written answers for the most common questions. A hit bypasses scoring
and the completion service entirely.

Matching runs on the normalized query: first an exact comparison against
every key, then a fuzzy pass where at least 70 % of a key's words must
appear in the query.
*/

use askerbot_core::Source;
use serde::{Deserialize, Serialize};

const FUZZY_WORD_SHARE: f64 = 0.7;
const FAQ_SCORE: f64 = 10.0;

/// A canned answer with its citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Normalized match phrase
    pub key: String,
    /// Answer text returned verbatim
    pub answer: String,
    /// Ordered citations
    pub citations: Vec<Source>,
}

/// How a FAQ entry was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqMatchKind {
    /// Query equals the key
    Exact,
    /// Enough key words occur in the query
    Fuzzy,
}

/// Ordered FAQ table
#[derive(Debug, Clone)]
pub struct FaqTable {
    entries: Vec<FaqEntry>,
}

impl FaqTable {
    /// Build a table from entries; table order decides fuzzy ties
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    /// The club's built-in FAQ
    pub fn standard() -> Self {
        let cite = |title: &str, url: &str| Source {
            title: title.to_string(),
            url: url.to_string(),
            score: FAQ_SCORE,
        };

        Self::new(vec![
            FaqEntry {
                key: "akademi+".to_string(),
                answer: "Akademi+ er et forsterket tilbud for ekstra motiverte spillere mellom 10 og 16 år.\n\
                         Kontakt Lars Henrik på lars.henrik@askerfotball.no for mer informasjon."
                    .to_string(),
                citations: vec![cite("Akademi+", "https://askerfotball.no/akademi-pluss")],
            },
            FaqEntry {
                key: "obos akademi".to_string(),
                answer: "OBOS Akademi er for spillere fra 7 til 13 år og koster fra 955,- til 2500,- per måned, avhengig av antall dager.\n\
                         Påmelding skjer via akademisiden."
                    .to_string(),
                citations: vec![
                    cite("OBOS Akademi", "https://askerfotball.no/akademi"),
                    cite(
                        "Påmelding OBOS Akademi",
                        "https://askerfotball.no/akademi/pamelding",
                    ),
                ],
            },
            FaqEntry {
                key: "kontakt klubben".to_string(),
                answer: "Du når Asker Fotball på post@askerfotball.no.\n\
                         Daglig leder Rolf-Magne Walstad nås på walstad@askerfotball.no."
                    .to_string(),
                citations: vec![cite("Kontakt oss", "https://askerfotball.no/kontakt")],
            },
            FaqEntry {
                key: "a-laget".to_string(),
                answer: "A-laget ledes av hovedtrener Magnus Bredal.\n\
                         Spillertroppen og terminlisten finner du på lagsiden."
                    .to_string(),
                citations: vec![cite("Spillere A-laget", "https://askerfotball.no/lag/a-laget")],
            },
        ])
    }

    /// Find the answer for a normalized query
    pub fn lookup(&self, normalized: &str) -> Option<(&FaqEntry, FaqMatchKind)> {
        let query = normalized.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.iter().find(|e| e.key == query) {
            return Some((entry, FaqMatchKind::Exact));
        }

        self.entries
            .iter()
            .find(|e| Self::fuzzy_matches(&e.key, query))
            .map(|e| (e, FaqMatchKind::Fuzzy))
    }

    fn fuzzy_matches(key: &str, query: &str) -> bool {
        let words: Vec<&str> = key.split_whitespace().collect();
        if words.is_empty() {
            return false;
        }
        let hits = words.iter().filter(|w| query.contains(*w)).count();
        hits as f64 >= words.len() as f64 * FUZZY_WORD_SHARE
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::normalize;

    #[test]
    fn test_exact_match() {
        let faq = FaqTable::standard();
        let (entry, kind) = faq.lookup(&normalize("Kontakt klubben")).unwrap();
        assert_eq!(entry.key, "kontakt klubben");
        assert_eq!(kind, FaqMatchKind::Exact);
    }

    #[test]
    fn test_fuzzy_match_needs_most_words() {
        let faq = FaqTable::standard();
        let (entry, kind) = faq
            .lookup(&normalize("Hva koster OBOS Akademi for min sønn?"))
            .unwrap();
        assert_eq!(entry.key, "obos akademi");
        assert_eq!(kind, FaqMatchKind::Fuzzy);
        assert_eq!(entry.citations.len(), 2);

        // One of two words is below the 70 % share.
        assert!(faq.lookup(&normalize("Hvem er styret i OBOS?")).is_none());
    }

    #[test]
    fn test_plus_and_hyphen_keys() {
        let faq = FaqTable::standard();
        assert_eq!(
            faq.lookup(&normalize("Hva er Akademi+?")).unwrap().0.key,
            "akademi+"
        );
        assert_eq!(
            faq.lookup(&normalize("Når spiller A-laget?")).unwrap().0.key,
            "a-laget"
        );
    }

    #[test]
    fn test_no_match_for_unrelated_query() {
        let faq = FaqTable::standard();
        assert!(faq.lookup(&normalize("Hvor kan jeg parkere på Føyka?")).is_none());
        assert!(faq.lookup("").is_none());
    }
}
