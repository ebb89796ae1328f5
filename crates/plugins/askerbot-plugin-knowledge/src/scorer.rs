/*!
# Relevance Scorer

Pure scoring of one candidate against one [`QueryAnalysis`]. A candidate is
either a lexicon entry or an indexed chunk; both are reduced to the same
[`Candidate`] shape so the rules apply uniformly.

Composite score:

- per search term: title substring +15, body substring +8
- per significant word (stemmed): title +5, body +2
- terms contributed by enrichment weigh ×1.5
- synonym cluster shared by query and candidate: fixed bonus
- thematic boosts and irrelevance penalties from the [`RuleSet`]

Scores are clamped at zero and only compare within one request.
*/

use crate::query::{normalize, stem, QueryAnalysis};
use crate::rules::RuleSet;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

const TITLE_TERM: f64 = 15.0;
const BODY_TERM: f64 = 8.0;
const TITLE_WORD: f64 = 5.0;
const BODY_WORD: f64 = 2.0;
const ENRICHED_FACTOR: f64 = 1.5;

const TITLE_HIT: f64 = 1.0;
const BODY_HIT: f64 = 0.7;

const HEURISTIC_QUERY: f64 = 20.0;
const HEURISTIC_TERM: f64 = 5.0;
const HEURISTIC_BOOST: f64 = 15.0;
const HEURISTIC_CAP: f64 = 100.0;

/// Text scored against a query, with lowercase copies precomputed
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Lexicon key or chunk id
    pub id: String,
    /// Display title
    pub title: String,
    /// Source URL
    pub url: String,
    /// Body text
    pub body: String,
    /// Optional freshness date from the index
    pub date: Option<String>,
    /// Bonus added to the combined index score
    pub priority: f64,
    title_lc: String,
    body_lc: String,
    words: HashSet<String>,
}

impl Candidate {
    /// Prepare a candidate for scoring
    pub fn new(id: &str, title: &str, url: &str, body: &str) -> Self {
        let title_lc = title.to_lowercase();
        let body_lc = body.to_lowercase();
        let words = normalize(&format!("{} {}", title, body))
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            body: body.to_string(),
            date: None,
            priority: 0.0,
            title_lc,
            body_lc,
            words,
        }
    }

    /// Set the index priority bonus
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = if priority.is_finite() { priority } else { 0.0 };
        self
    }

    /// Set the freshness date
    pub fn with_date(mut self, date: Option<String>) -> Self {
        self.date = date;
        self
    }

    /// Lowercased title
    pub fn title_lc(&self) -> &str {
        &self.title_lc
    }

    /// Lowercased body
    pub fn body_lc(&self) -> &str {
        &self.body_lc
    }

    fn has_word_starting_with(&self, prefix: &str) -> bool {
        self.words.iter().any(|w| w.starts_with(prefix))
    }
}

/// Which retrieval path produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Curated lexicon
    Lexicon,
    /// Statistical index
    Index,
}

/// A candidate with its score for the current request
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// What was scored
    pub candidate: Arc<Candidate>,
    /// Composite score, never negative
    pub score: f64,
    /// Share of query keywords found, title hits weighted higher
    pub relevance_ratio: f64,
    /// Terms that hit title or body
    pub matched_terms: Vec<String>,
    /// Lexicon or index
    pub origin: CandidateOrigin,
}

/// Score a candidate against an analysis
pub fn score_candidate(
    analysis: &QueryAnalysis,
    candidate: &Arc<Candidate>,
    rules: &RuleSet,
) -> ScoredCandidate {
    let mut score = 0.0;
    let mut matched = Vec::new();

    let weight = |term: &str| {
        if analysis.is_enriched_term(term) {
            ENRICHED_FACTOR
        } else {
            1.0
        }
    };

    for term in analysis.search_terms() {
        let w = weight(&term);
        let mut hit = false;
        if candidate.title_lc.contains(&term) {
            score += TITLE_TERM * w;
            hit = true;
        }
        if candidate.body_lc.contains(&term) {
            score += BODY_TERM * w;
            hit = true;
        }
        if hit {
            matched.push(term);
        }
    }

    for word in &analysis.significant {
        let stemmed = stem(word);
        let w = weight(word);
        if candidate.title_lc.contains(&stemmed) {
            score += TITLE_WORD * w;
        }
        if candidate.body_lc.contains(&stemmed) {
            score += BODY_WORD * w;
        }
    }

    for cluster in &rules.clusters {
        let query_touches = analysis
            .tokens
            .iter()
            .any(|t| cluster.words.iter().any(|w| t.starts_with(w)));
        if query_touches && cluster.words.iter().any(|w| candidate.has_word_starting_with(w)) {
            score += rules.cluster_bonus;
        }
    }

    let intent = analysis.intent.as_deref();
    for rule in rules.scoring.iter().filter(|r| r.target == candidate.id) {
        if rule.when.holds(&analysis.normalized, intent) {
            score += rule.weight;
        }
    }

    ScoredCandidate {
        candidate: Arc::clone(candidate),
        score: score.max(0.0),
        relevance_ratio: relevance_ratio(analysis, candidate),
        matched_terms: matched,
        origin: CandidateOrigin::Lexicon,
    }
}

/// Share of query keywords present in the candidate
///
/// Keywords are the significant query words plus any search terms added by
/// enrichment. A title hit counts 1.0, a body-only hit 0.7. No keywords
/// gives 0.
pub fn relevance_ratio(analysis: &QueryAnalysis, candidate: &Candidate) -> f64 {
    if analysis.keywords.is_empty() {
        return 0.0;
    }
    let total: f64 = analysis
        .keywords
        .iter()
        .map(|word| {
            let stemmed = stem(word);
            if candidate.title_lc.contains(&stemmed) {
                TITLE_HIT
            } else if candidate.body_lc.contains(&stemmed) {
                BODY_HIT
            } else {
                0.0
            }
        })
        .sum();
    total / analysis.keywords.len() as f64
}

/// Semantic relevance of a chunk, used as a small correction on BM25
///
/// +20 when the normalized query occurs verbatim, +5 per expansion term,
/// +15 per intent boost term; capped at 100.
pub fn heuristic_relevance(analysis: &QueryAnalysis, candidate: &Candidate) -> f64 {
    let text = format!("{} {}", candidate.title_lc, candidate.body_lc);
    let mut score = 0.0;

    if !analysis.normalized.is_empty() && text.contains(&analysis.normalized) {
        score += HEURISTIC_QUERY;
    }
    score += analysis
        .expansion_terms()
        .iter()
        .filter(|t| text.contains(t.as_str()))
        .count() as f64
        * HEURISTIC_TERM;
    score += analysis
        .boost_terms
        .iter()
        .filter(|t| text.contains(t.as_str()))
        .count() as f64
        * HEURISTIC_BOOST;

    score.min(HEURISTIC_CAP)
}

/// Descending score, then ascending id
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

/// Drop non-positive and weakly related candidates, then sort
pub fn rank(scored: Vec<ScoredCandidate>, min_ratio: f64) -> Vec<ScoredCandidate> {
    let mut kept: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|s| s.score > 0.0 && s.relevance_ratio >= min_ratio)
        .collect();
    kept.sort_by(compare);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::analyze_locally;
    use crate::Lexicon;

    fn score_all(query: &str) -> Vec<ScoredCandidate> {
        let rules = RuleSet::standard();
        let lexicon = Lexicon::standard();
        let analysis = analyze_locally(&rules, query);
        let scored = lexicon
            .candidates()
            .iter()
            .map(|c| score_candidate(&analysis, c, &rules))
            .collect();
        rank(scored, 0.0)
    }

    #[test]
    fn test_ticket_query_prefers_tickets_over_membership() {
        let ranked = score_all("Hva koster enkeltbillett?");
        let pos = |id: &str| ranked.iter().position(|s| s.candidate.id == id);
        let tickets = pos("billetter").expect("tickets entry ranked");
        assert_eq!(tickets, 0);
        if let Some(membership) = pos("priser_medlemskap") {
            assert!(tickets < membership);
        }
    }

    #[test]
    fn test_whistleblowing_boost() {
        let ranked = score_all("Hvor melder jeg avvik?");
        assert_eq!(ranked[0].candidate.id, "varsling");
    }

    #[test]
    fn test_scores_never_negative() {
        for query in ["Hva koster enkeltbillett?", "parkering", "asdkjasd", ""] {
            for s in score_all(query) {
                assert!(s.score > 0.0);
            }
        }
    }

    #[test]
    fn test_relevance_ratio_weights_title() {
        let rules = RuleSet::standard();
        let analysis = analyze_locally(&rules, "parkering avgift");
        let in_title = Candidate::new("a", "Parkering og avgift", "", "");
        let in_body = Candidate::new("b", "Annet", "", "parkering avgift");
        let nowhere = Candidate::new("c", "Annet", "", "ingenting");
        assert_eq!(relevance_ratio(&analysis, &in_title), 1.0);
        assert!((relevance_ratio(&analysis, &in_body) - 0.7).abs() < 1e-9);
        assert_eq!(relevance_ratio(&analysis, &nowhere), 0.0);
    }

    #[test]
    fn test_tie_break_by_id() {
        let make = |id: &str, score: f64| ScoredCandidate {
            candidate: Arc::new(Candidate::new(id, "", "", "")),
            score,
            relevance_ratio: 1.0,
            matched_terms: vec![],
            origin: CandidateOrigin::Lexicon,
        };
        let ranked = rank(vec![make("b", 5.0), make("a", 5.0), make("c", 9.0), make("d", 0.0)], 0.5);
        let ids: Vec<_> = ranked.iter().map(|s| s.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_heuristic_is_capped() {
        let rules = RuleSet::standard();
        let analysis = analyze_locally(&rules, "parkering avgift kampdag");
        let chunk = Candidate::new(
            "chunk-1",
            "Parkering",
            "",
            "parkering avgift kampdag parkere føyka parkering avgift kampdag",
        );
        let h = heuristic_relevance(&analysis, &chunk);
        assert!(h > 0.0);
        assert!(h <= 100.0);
    }
}
