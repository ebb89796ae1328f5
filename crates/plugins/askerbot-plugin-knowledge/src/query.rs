/*!
# Query Understanding

Turns a raw question into a [`QueryAnalysis`]:

1. normalize and tokenize
2. classify intent with the ordered fast-path rules
3. for ambiguous or complex questions, ask the completion service for a
   structured analysis and merge it in

Enrichment never fails the request: a service error, a timeout or an
unparseable reply all leave the local analysis in place.
*/

use crate::rules::{IntentRule, RuleSet};
use askerbot_core::{
    utils::scrub_message, with_deadline, CancellationToken, ChatConfig, CompletionProvider,
    CompletionPurpose, CompletionRequest, TtlCache,
};
use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Confidence for a pattern or word-start keyword match
pub const CONFIDENT_MATCH: f64 = 0.8;
/// Confidence for a keyword found only inside another word
pub const WEAK_MATCH: f64 = 0.4;

const LOW_CONFIDENCE: f64 = 0.6;
const LONG_QUERY_CHARS: usize = 30;
const SHORT_QUERY_CHARS: usize = 20;
const MIN_INNER_KEYWORD_CHARS: usize = 4;

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::Norwegian));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "hva", "hvor", "hvem", "hvordan", "hvilke", "hvilken", "hvilket", "hvis", "hvorfor",
        "når", "kan", "jeg", "meg", "min", "mitt", "mine", "deg", "din", "ditt", "dine", "det",
        "den", "der", "som", "med", "for", "til", "fra", "og", "eller", "men", "er", "var",
        "har", "hadde", "blir", "ble", "skal", "vil", "må", "kunne", "skulle", "ville", "på",
        "av", "om", "en", "et", "ei", "at", "så", "seg", "sin", "sitt", "sine", "vi", "oss",
        "dere", "ikke", "også", "noe", "noen", "alle", "hos", "ved", "inn", "ut", "opp",
        "etter", "før", "over", "under", "mellom", "denne", "dette", "disse", "her", "hei",
        "takk", "gjerne", "litt", "få", "finnes", "finne", "asker", "fotball", "fotballs",
        "askerfotball", "dere", "deres", "the",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, strip punctuation and collapse whitespace
///
/// Letters (including æøå) and digits are kept. A `-` survives between two
/// word characters and a `+` survives right after one, so `a-laget` and
/// `akademi+` stay intact.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let mut out = String::with_capacity(lower.len());

    for (i, &c) in chars.iter().enumerate() {
        let prev_word = i > 0 && chars[i - 1].is_alphanumeric();
        let next_word = chars.get(i + 1).map(|n| n.is_alphanumeric()).unwrap_or(false);
        let keep = c.is_alphanumeric()
            || (c == '-' && prev_word && next_word)
            || (c == '+' && prev_word);
        out.push(if keep { c } else { ' ' });
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Words longer than two characters
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Whether a word carries no topical meaning
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Non-stopword tokens, first occurrence order
pub fn significant_terms(tokens: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter(|t| !is_stopword(t))
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Norwegian stem, falling back to the word when the stem gets too short
pub fn stem(word: &str) -> String {
    let stemmed = STEMMER.stem(word);
    if stemmed.chars().count() >= 3 {
        stemmed.into_owned()
    } else {
        word.to_string()
    }
}

fn has_norwegian_letters(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, 'æ' | 'ø' | 'å' | 'Æ' | 'Ø' | 'Å'))
}

fn clause_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    lower
        .split(|c| matches!(c, ',' | ';' | '?' | '.' | '!'))
        .flat_map(|part| part.split(" og "))
        .flat_map(|part| part.split(" eller "))
        .filter(|part| part.split_whitespace().count() >= 2)
        .count()
}

/// Where an analysis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// Rules only
    Local,
    /// Rules merged with a completion-service analysis
    Enriched,
}

/// Structured understanding of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Normalized query text
    pub normalized: String,
    /// Tokens longer than two characters
    pub tokens: Vec<String>,
    /// Non-stopword tokens
    pub significant: Vec<String>,
    /// Detected intent from the topic vocabulary
    pub intent: Option<String>,
    /// Search keywords, ordered and deduplicated
    pub keywords: Vec<String>,
    /// Semantic variants, ordered and deduplicated
    pub variants: Vec<String>,
    /// Chunk boost terms from the winning intent rule
    pub boost_terms: Vec<String>,
    /// Terms contributed by the completion service
    pub enriched_terms: Vec<String>,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Local or enriched
    pub source: AnalysisSource,
}

impl QueryAnalysis {
    /// Normalized query, keywords and variants without duplicates
    pub fn search_terms(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        std::iter::once(&self.normalized)
            .chain(self.keywords.iter())
            .chain(self.variants.iter())
            .filter(|t| t.chars().count() > 2)
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    /// Keywords and variants, without the full query
    pub fn expansion_terms(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keywords
            .iter()
            .chain(self.variants.iter())
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    /// Whether a term came from the completion service
    pub fn is_enriched_term(&self, term: &str) -> bool {
        self.enriched_terms.iter().any(|t| t == term)
    }
}

/// Result of the fast-path classifier
#[derive(Debug, Clone, PartialEq)]
pub struct FastMatch {
    /// Intent of the first matching rule
    pub intent: &'static str,
    /// [`CONFIDENT_MATCH`] or [`WEAK_MATCH`]
    pub confidence: f64,
}

/// Run the ordered intent rules
///
/// A confident match from any rule beats a weak one; among equals the
/// earlier rule wins.
pub fn classify(rules: &RuleSet, normalized: &str) -> Option<FastMatch> {
    let mut weak: Option<FastMatch> = None;
    for rule in &rules.intents {
        match rule_confidence(rule, normalized) {
            Some(confidence) if confidence >= CONFIDENT_MATCH => {
                return Some(FastMatch {
                    intent: rule.intent,
                    confidence,
                });
            }
            Some(confidence) if weak.is_none() => {
                weak = Some(FastMatch {
                    intent: rule.intent,
                    confidence,
                });
            }
            _ => {}
        }
    }
    weak
}

fn rule_confidence(rule: &IntentRule, normalized: &str) -> Option<f64> {
    if rule.patterns.iter().any(|p| p.is_match(normalized)) {
        return Some(CONFIDENT_MATCH);
    }
    let at_word_start = rule.keywords.iter().any(|k| {
        normalized
            .split_whitespace()
            .any(|word| word.starts_with(k))
    });
    if at_word_start {
        return Some(CONFIDENT_MATCH);
    }
    // Short keywords hide inside unrelated compounds ("bil" in "enkeltbillett").
    let inside_word = rule
        .keywords
        .iter()
        .any(|k| k.chars().count() >= MIN_INNER_KEYWORD_CHARS && normalized.contains(k));
    if inside_word {
        return Some(WEAK_MATCH);
    }
    None
}

/// Whether the question should go through completion-service enrichment
pub fn needs_enrichment(query: &str, fast: Option<&FastMatch>) -> bool {
    match fast {
        None => return true,
        Some(m) if m.confidence < LOW_CONFIDENCE => return true,
        _ => {}
    }

    let chars = query.trim().chars().count();
    if chars > LONG_QUERY_CHARS {
        return true;
    }
    if chars <= SHORT_QUERY_CHARS && has_norwegian_letters(query) {
        return true;
    }
    clause_count(query) >= 2
}

/// Cluster siblings of the given words
///
/// Works in both directions: a word that names a concept pulls in its
/// synonyms, and a synonym pulls in the concept word and its siblings.
pub fn expand_synonyms(rules: &RuleSet, words: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cluster in &rules.clusters {
        let touched = words.iter().any(|w| {
            cluster
                .words
                .iter()
                .any(|c| w == c || (c.chars().count() >= 4 && w.starts_with(c)))
        });
        if !touched {
            continue;
        }
        for sibling in &cluster.words {
            let sibling = sibling.to_string();
            if !words.contains(&sibling) && !out.contains(&sibling) {
                out.push(sibling);
            }
        }
    }
    out
}

/// Analysis built from the rule set alone
pub fn analyze_locally(rules: &RuleSet, query: &str) -> QueryAnalysis {
    let normalized = normalize(query);
    let tokens = tokenize(&normalized);
    let significant = significant_terms(&tokens);
    let fast = classify(rules, &normalized);

    let rule = fast.as_ref().and_then(|m| rules.intent_rule(m.intent));
    let mut variants: Vec<String> = Vec::new();
    let rule_synonyms = rule.map(|r| r.synonyms.as_slice()).unwrap_or_default();
    for synonym in rule_synonyms
        .iter()
        .map(|s| s.to_string())
        .chain(expand_synonyms(rules, &significant))
    {
        if !significant.contains(&synonym) && !variants.contains(&synonym) {
            variants.push(synonym);
        }
    }
    let boost_terms = rule
        .map(|r| r.boost_terms.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default();

    QueryAnalysis {
        keywords: significant.clone(),
        normalized,
        tokens,
        significant,
        intent: fast.as_ref().map(|m| m.intent.to_string()),
        variants,
        boost_terms,
        enriched_terms: Vec::new(),
        confidence: fast.as_ref().map(|m| m.confidence).unwrap_or(0.0),
        source: AnalysisSource::Local,
    }
}

/// Analysis fields the completion service is asked to return
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichedAnalysis {
    /// Intent name, expected to be one of the vocabulary
    pub intent: String,
    /// Named things mentioned in the question
    pub entities: Vec<String>,
    /// Search terms
    pub search_terms: Vec<String>,
    /// Paraphrases and synonyms
    pub semantic_variants: Vec<String>,
    /// Self-reported confidence
    pub confidence: f64,
}

/// What came back from an analysis call
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    /// Valid JSON analysis
    Parsed(EnrichedAnalysis),
    /// Anything else; never used as structured data
    RawText(String),
}

/// Interpret analysis-call output
///
/// Tolerates code fences and prose around the JSON object.
pub fn parse_enrichment(text: &str) -> EnrichmentOutcome {
    let trimmed = text.trim();
    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return EnrichmentOutcome::RawText(trimmed.to_string());
    };
    if end <= start {
        return EnrichmentOutcome::RawText(trimmed.to_string());
    }

    match serde_json::from_str::<EnrichedAnalysis>(&trimmed[start..=end]) {
        Ok(mut parsed) => {
            parsed.confidence = if parsed.confidence.is_finite() {
                parsed.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            EnrichmentOutcome::Parsed(parsed)
        }
        Err(e) => {
            debug!("analysis reply is not valid JSON: {}", e);
            EnrichmentOutcome::RawText(trimmed.to_string())
        }
    }
}

fn push_unique(target: &mut Vec<String>, value: String) {
    if value.chars().count() > 2 && !target.contains(&value) {
        target.push(value);
    }
}

/// Fold a parsed enrichment into the local analysis
///
/// An intent outside the vocabulary is ignored; the local intent stays.
pub fn merge_enrichment(
    rules: &RuleSet,
    mut local: QueryAnalysis,
    enriched: EnrichedAnalysis,
) -> QueryAnalysis {
    let intent = normalize(&enriched.intent);
    if rules.knows_intent(&intent) {
        if local.intent.as_deref() != Some(intent.as_str()) {
            if let Some(rule) = rules.intent_rule(&intent) {
                local.boost_terms = rule.boost_terms.iter().map(|s| s.to_string()).collect();
                for s in &rule.synonyms {
                    push_unique(&mut local.variants, s.to_string());
                }
            }
        }
        local.intent = Some(intent);
    }

    for term in enriched.search_terms.iter().chain(enriched.entities.iter()) {
        let term = normalize(term);
        if term.is_empty() || is_stopword(&term) {
            continue;
        }
        push_unique(&mut local.enriched_terms, term.clone());
        push_unique(&mut local.keywords, term);
    }
    for variant in &enriched.semantic_variants {
        let variant = normalize(variant);
        if variant.is_empty() {
            continue;
        }
        push_unique(&mut local.enriched_terms, variant.clone());
        push_unique(&mut local.variants, variant);
    }

    local.confidence = enriched.confidence.max(local.confidence).clamp(0.0, 1.0);
    local.source = AnalysisSource::Enriched;
    local
}

/// System instruction for the analysis call
pub fn analysis_prompt(rules: &RuleSet) -> String {
    format!(
        "Du analyserer norske spørsmål til Asker Fotballs nettside.\n\
         Svar KUN med JSON på formen:\n\
         {{\"intent\": \"...\", \"entities\": [], \"search_terms\": [], \"semantic_variants\": [], \"confidence\": 0.0}}\n\
         intent må være én av: {}.\n\
         Bruk \"generell\" hvis ingen passer. search_terms er søkeord på norsk, \
         semantic_variants er synonymer og omskrivinger, confidence er et tall mellom 0 og 1.",
        rules.vocabulary().join(", ")
    )
}

/// Query understanding with cached, optional enrichment
pub struct QueryAnalyzer {
    rules: Arc<RuleSet>,
    provider: Option<Arc<dyn CompletionProvider>>,
    config: Arc<ChatConfig>,
    cache: TtlCache<QueryAnalysis>,
}

impl QueryAnalyzer {
    /// Create an analyzer; without a provider every analysis is local
    pub fn new(
        rules: Arc<RuleSet>,
        provider: Option<Arc<dyn CompletionProvider>>,
        config: Arc<ChatConfig>,
        cache: TtlCache<QueryAnalysis>,
    ) -> Self {
        Self {
            rules,
            provider,
            config,
            cache,
        }
    }

    /// Analyze a query; never fails
    pub async fn analyze(&self, query: &str, cancel: &CancellationToken) -> QueryAnalysis {
        let local = analyze_locally(&self.rules, query);
        let fast = classify(&self.rules, &local.normalized);

        if !needs_enrichment(query, fast.as_ref()) {
            return local;
        }

        if let Some(hit) = self.cache.get(&local.normalized) {
            debug!(intent = ?hit.intent, "analysis cache hit");
            return hit;
        }

        let Some(provider) = self.provider.as_ref() else {
            return local;
        };

        let request = CompletionRequest {
            purpose: CompletionPurpose::QueryAnalysis,
            model: Some(self.config.model.clone()),
            system: analysis_prompt(&self.rules),
            user: format!("Analyser dette spørsmålet: \"{}\"", query.trim()),
            temperature: self.config.analysis_temperature,
            max_tokens: self.config.analysis_max_tokens,
        };

        let response = with_deadline(
            "query analysis",
            self.config.completion_timeout,
            cancel,
            provider.complete(request),
        )
        .await;

        match response {
            Ok(resp) => match parse_enrichment(&resp.text) {
                EnrichmentOutcome::Parsed(enriched) => {
                    let merged = merge_enrichment(&self.rules, local, enriched);
                    debug!(
                        intent = ?merged.intent,
                        keywords = merged.keywords.len(),
                        "query enriched"
                    );
                    self.cache.insert(merged.normalized.clone(), merged.clone());
                    merged
                }
                EnrichmentOutcome::RawText(raw) => {
                    debug!(reply = %scrub_message(&raw), "analysis reply unusable, keeping local analysis");
                    local
                }
            },
            Err(e) => {
                warn!("query enrichment failed, keeping local analysis: {}", e);
                local
            }
        }
    }

    /// Analysis cache, for health reporting
    pub fn cache(&self) -> &TtlCache<QueryAnalysis> {
        &self.cache
    }
}
