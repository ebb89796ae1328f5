/*!
# Result Merger

Decides what a request is answered from:

```text
EXACT_FAQ ─hit──────────────────────────────────────────▶ canned answer
    │ miss
LEXICON ─top score ≥ good-enough bar─────────────────────▶ top 1 entry
    │ too weak
STATISTICAL ─index (+ weak lexicon) clears ratio bar─────▶ up to 3 snippets
    │ nothing
NO_MATCH ─topic fallback for intent, else generic reply─▶ canned reply
```

The relevance-ratio bar is lower when the analysis was enriched by the
completion service and higher for purely local analysis.
*/

use crate::bm25::IndexStore;
use crate::faq::{FaqEntry, FaqTable};
use crate::lexicon::Lexicon;
use crate::query::{AnalysisSource, QueryAnalysis};
use crate::rules::RuleSet;
use crate::scorer::{self, ScoredCandidate};
use askerbot_core::ChatConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Generic reply when nothing relevant was found
pub const FALLBACK_REPLY: &str = "Uffda, her ble jeg stående uvitende i offside! 🤔\n\n\
Jeg kan hjelpe deg med:\n\
• OBOS Akademi og priser\n\
• Trenere og spillere\n\
• Stadion og kontaktinfo\n\
• Lag og struktur\n\n\
Prøv å stille spørsmålet på en annen måte, eller kontakt klubben direkte på post@askerfotball.no";

/// Which retrieval path produced the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPath {
    /// Curated lexicon alone
    Lexicon,
    /// Statistical index, possibly merged with weak lexicon hits
    Statistical,
}

/// Why a canned reply was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Generic reply; nothing cleared the bar
    NoRelevantSources,
    /// Reply picked from the topic fallbacks for the detected intent
    TopicFallback,
}

/// Outcome of retrieval for a non-FAQ query
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// Snippets to answer from, best first
    Context {
        /// Path that produced them
        path: AnswerPath,
        /// Ranked snippets
        snippets: Vec<ScoredCandidate>,
    },
    /// Nothing relevant; reply without the completion service
    NoMatch {
        /// Canned reply
        reply: String,
        /// Generic or topic fallback
        reason: FallbackReason,
    },
}

/// A retrieval and whether every source it needed was available
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    /// What to answer from
    pub retrieval: Retrieval,
    /// False when the statistical index was needed but could not be loaded
    pub complete: bool,
}

/// Runs the lookup states against the shared knowledge sources
pub struct Retriever {
    config: Arc<ChatConfig>,
    rules: Arc<RuleSet>,
    lexicon: Arc<Lexicon>,
    faq: Arc<FaqTable>,
    index: Arc<IndexStore>,
}

impl Retriever {
    /// Assemble a retriever
    pub fn new(
        config: Arc<ChatConfig>,
        rules: Arc<RuleSet>,
        lexicon: Arc<Lexicon>,
        faq: Arc<FaqTable>,
        index: Arc<IndexStore>,
    ) -> Self {
        Self {
            config,
            rules,
            lexicon,
            faq,
            index,
        }
    }

    /// EXACT_FAQ state
    pub fn faq(&self, normalized: &str) -> Option<&FaqEntry> {
        self.faq.lookup(normalized).map(|(entry, kind)| {
            debug!(key = %entry.key, ?kind, "faq hit");
            entry
        })
    }

    fn min_ratio(&self, analysis: &QueryAnalysis) -> f64 {
        match analysis.source {
            AnalysisSource::Enriched => self.config.enriched_relevance_ratio,
            AnalysisSource::Local => self.config.local_relevance_ratio,
        }
    }

    /// Lexicon candidates above zero and above the ratio bar, best first
    pub fn score_lexicon(&self, analysis: &QueryAnalysis) -> Vec<ScoredCandidate> {
        let scored = self
            .lexicon
            .candidates()
            .iter()
            .map(|c| scorer::score_candidate(analysis, c, &self.rules))
            .collect();
        scorer::rank(scored, self.min_ratio(analysis))
    }

    /// LEXICON, STATISTICAL and NO_MATCH states
    pub async fn retrieve(&self, analysis: &QueryAnalysis) -> RetrievalOutcome {
        let lexicon = self.score_lexicon(analysis);

        if let Some(top) = lexicon.first() {
            if top.score >= self.config.lexicon_good_enough {
                debug!(
                    id = %top.candidate.id,
                    score = top.score,
                    matched = ?top.matched_terms,
                    "answering from lexicon"
                );
                return RetrievalOutcome {
                    retrieval: Retrieval::Context {
                        path: AnswerPath::Lexicon,
                        snippets: vec![top.clone()],
                    },
                    complete: true,
                };
            }
        }

        let statistical = self.index.search(analysis, &self.config).await;
        let complete = statistical.is_some();
        let statistical = scorer::rank(statistical.unwrap_or_default(), self.min_ratio(analysis));

        let mut merged: Vec<ScoredCandidate> = statistical.into_iter().chain(lexicon).collect();
        merged.sort_by(scorer::compare);
        merged.truncate(self.config.max_context_snippets);

        let retrieval = if merged.is_empty() {
            self.no_match(analysis)
        } else {
            debug!(
                snippets = merged.len(),
                top = %merged[0].candidate.id,
                "answering from statistical index"
            );
            Retrieval::Context {
                path: AnswerPath::Statistical,
                snippets: merged,
            }
        };

        RetrievalOutcome {
            retrieval,
            complete,
        }
    }

    fn no_match(&self, analysis: &QueryAnalysis) -> Retrieval {
        let topic = analysis
            .intent
            .as_deref()
            .and_then(|intent| self.rules.topic_fallback(intent));

        match topic {
            Some(fallback) => {
                debug!(intent = ?analysis.intent, "topic fallback");
                Retrieval::NoMatch {
                    reply: fallback.reply.to_string(),
                    reason: FallbackReason::TopicFallback,
                }
            }
            None => {
                debug!("no relevant sources, generic fallback");
                Retrieval::NoMatch {
                    reply: FALLBACK_REPLY.to_string(),
                    reason: FallbackReason::NoRelevantSources,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::analyze_locally;
    use askerbot_core::{SystemClock, TtlCache};
    use std::time::Duration;

    fn retriever(config: ChatConfig) -> Retriever {
        let cache = TtlCache::new("index", Duration::from_secs(60), 1, Arc::new(SystemClock));
        Retriever::new(
            Arc::new(config),
            Arc::new(RuleSet::standard()),
            Arc::new(Lexicon::standard()),
            Arc::new(FaqTable::standard()),
            Arc::new(IndexStore::new("/nonexistent/askerbot-index", cache)),
        )
    }

    #[tokio::test]
    async fn test_strong_lexicon_hit_is_single_snippet() {
        let r = retriever(ChatConfig::default());
        let analysis = analyze_locally(&RuleSet::standard(), "Hvor kan jeg parkere på Føyka?");
        match r.retrieve(&analysis).await.retrieval {
            Retrieval::Context { path, snippets } => {
                assert_eq!(path, AnswerPath::Lexicon);
                assert_eq!(snippets.len(), 1);
                assert_eq!(snippets[0].candidate.id, "parkering");
            }
            other => panic!("expected context, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_weak_lexicon_goes_statistical_without_index() {
        let config = ChatConfig {
            lexicon_good_enough: 10_000.0,
            ..ChatConfig::default()
        };
        let r = retriever(config);
        let analysis = analyze_locally(&RuleSet::standard(), "Hvor kan jeg parkere på Føyka?");
        match r.retrieve(&analysis).await.retrieval {
            Retrieval::Context { path, snippets } => {
                assert_eq!(path, AnswerPath::Statistical);
                assert!(snippets.len() <= 3);
                assert_eq!(snippets[0].candidate.id, "parkering");
            }
            other => panic!("expected context, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gibberish_gets_generic_fallback() {
        let r = retriever(ChatConfig::default());
        let analysis = analyze_locally(&RuleSet::standard(), "asdkjasd qweoiqwe");
        match r.retrieve(&analysis).await.retrieval {
            Retrieval::NoMatch { reply, reason } => {
                assert_eq!(reply, FALLBACK_REPLY);
                assert_eq!(reason, FallbackReason::NoRelevantSources);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_outcome_reports_missing_index() {
        let r = retriever(ChatConfig::default());

        let parking = analyze_locally(&RuleSet::standard(), "Hvor kan jeg parkere på Føyka?");
        assert!(r.retrieve(&parking).await.complete);

        let gibberish = analyze_locally(&RuleSet::standard(), "asdkjasd qweoiqwe");
        assert!(!r.retrieve(&gibberish).await.complete);
    }

    #[test]
    fn test_faq_state() {
        let r = retriever(ChatConfig::default());
        assert_eq!(r.faq("kontakt klubben").unwrap().key, "kontakt klubben");
        assert!(r.faq("hvor kan jeg parkere").is_none());
    }
}
