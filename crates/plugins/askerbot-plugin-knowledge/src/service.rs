/*!
# Chat Service

The request pipeline end to end:

1. validate and normalize the message
2. response cache
3. FAQ
4. query understanding (optionally enriched)
5. retrieval through the search cache
6. canned reply, or one answer call to the completion service
7. cache and return

Only the answer call can fail the request; everything before it degrades.
*/

use crate::bm25::{Bm25Params, IndexStore, StatisticalIndex};
use crate::composer;
use crate::faq::FaqTable;
use crate::lexicon::Lexicon;
use crate::merger::{FallbackReason, Retrieval, RetrievalOutcome, Retriever};
use crate::query::{normalize, QueryAnalysis, QueryAnalyzer};
use crate::rules::RuleSet;
use askerbot_core::{
    with_deadline, AskerError, CacheStats, CancellationToken, ChatConfig, Clock,
    CompletionProvider, Result, Source, SystemClock, TtlCache, Usage,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Longest accepted message, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// What the caller gets back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// Answer text, Norwegian
    pub reply: String,
    /// Citations, best first
    pub sources: Vec<Source>,
    /// Token usage of the answer call
    pub usage: Option<Usage>,
    /// Whether retrieved context was used
    pub rag_used: bool,
    /// Whether the FAQ answered
    pub faq_used: bool,
    /// Whether this came from the response cache
    pub cached: bool,
    /// Set when a canned fallback was returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

/// Cache counters for the health endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheReport {
    /// Cache name
    pub name: &'static str,
    /// Live and stale entries held
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that missed or found an expired entry
    pub misses: u64,
    /// Capacity evictions
    pub evictions: u64,
}

impl CacheReport {
    fn of<V: Clone>(cache: &TtlCache<V>) -> Self {
        let CacheStats {
            hits,
            misses,
            evictions,
            ..
        } = cache.stats();
        Self {
            name: cache.name(),
            entries: cache.len(),
            hits,
            misses,
            evictions,
        }
    }
}

/// Service status; never includes credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Always `ok` when the service answers
    pub status: &'static str,
    /// Deployment environment
    pub environment: String,
    /// Seconds since the service was built
    pub uptime_secs: u64,
    /// Whether a completion provider is configured
    pub completion_configured: bool,
    /// Whether the statistical index is in memory
    pub index_loaded: bool,
    /// BM25 parameters of the loaded index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bm25_params: Option<Bm25Params>,
    /// Curated lexicon size
    pub lexicon_entries: usize,
    /// FAQ size
    pub faq_entries: usize,
    /// Per-cache counters
    pub caches: Vec<CacheReport>,
}

/// Askerbot's chat pipeline
pub struct ChatService {
    config: Arc<ChatConfig>,
    lexicon: Arc<Lexicon>,
    faq: Arc<FaqTable>,
    analyzer: QueryAnalyzer,
    retriever: Retriever,
    index: Arc<IndexStore>,
    provider: Option<Arc<dyn CompletionProvider>>,
    responses: TtlCache<ChatReply>,
    searches: TtlCache<Retrieval>,
    clock: Arc<dyn Clock>,
    started: Instant,
}

impl ChatService {
    /// Service with the built-in knowledge and the system clock
    pub fn new(config: ChatConfig, provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self::with_clock(config, provider, Arc::new(SystemClock))
    }

    /// Service with the built-in knowledge and an injected clock
    pub fn with_clock(
        config: ChatConfig,
        provider: Option<Arc<dyn CompletionProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_knowledge(
            config,
            provider,
            clock,
            Lexicon::standard(),
            FaqTable::standard(),
            RuleSet::standard(),
        )
    }

    /// Fully injected service
    pub fn with_knowledge(
        config: ChatConfig,
        provider: Option<Arc<dyn CompletionProvider>>,
        clock: Arc<dyn Clock>,
        lexicon: Lexicon,
        faq: FaqTable,
        rules: RuleSet,
    ) -> Self {
        let config = Arc::new(config);
        let rules = Arc::new(rules);
        let lexicon = Arc::new(lexicon);
        let faq = Arc::new(faq);

        let index_cache: TtlCache<Arc<StatisticalIndex>> =
            TtlCache::new("index", config.index_cache_ttl, 1, Arc::clone(&clock));
        let index = Arc::new(IndexStore::new(config.index_dir.clone(), index_cache));

        let analyzer = QueryAnalyzer::new(
            Arc::clone(&rules),
            provider.clone(),
            Arc::clone(&config),
            TtlCache::new(
                "analysis",
                config.analysis_cache_ttl,
                config.analysis_cache_max,
                Arc::clone(&clock),
            ),
        );
        let retriever = Retriever::new(
            Arc::clone(&config),
            rules,
            Arc::clone(&lexicon),
            Arc::clone(&faq),
            Arc::clone(&index),
        );

        Self {
            responses: TtlCache::new(
                "responses",
                config.response_cache_ttl,
                config.response_cache_max,
                Arc::clone(&clock),
            ),
            searches: TtlCache::new(
                "searches",
                config.search_cache_ttl,
                config.search_cache_max,
                Arc::clone(&clock),
            ),
            started: clock.now(),
            clock,
            config,
            lexicon,
            faq,
            analyzer,
            retriever,
            index,
            provider,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Answer one user message
    pub async fn answer(&self, message: &str, cancel: &CancellationToken) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AskerError::validation("Message is empty"));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AskerError::validation(format!(
                "Message is longer than {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let key = normalize(message);

        if let Some(mut hit) = self.responses.get(&key) {
            debug!("response cache hit");
            hit.cached = true;
            return Ok(hit);
        }

        if let Some(entry) = self.retriever.faq(&key) {
            let reply = ChatReply {
                reply: entry.answer.clone(),
                sources: entry.citations.clone(),
                usage: None,
                rag_used: false,
                faq_used: true,
                cached: false,
                fallback_reason: None,
            };
            self.responses.insert(key, reply.clone());
            return Ok(reply);
        }

        let analysis = self.analyzer.analyze(message, cancel).await;
        let RetrievalOutcome {
            retrieval,
            complete,
        } = self.retrieve_cached(&key, &analysis).await;

        let reply = match retrieval {
            Retrieval::NoMatch { reply, reason } => ChatReply {
                reply,
                sources: Vec::new(),
                usage: None,
                rag_used: false,
                faq_used: false,
                cached: false,
                fallback_reason: Some(reason),
            },
            Retrieval::Context { path, snippets } => {
                let provider = self
                    .provider
                    .as_ref()
                    .ok_or_else(|| AskerError::config("OPENAI_API_KEY is not configured"))?;

                let now = chrono::Local::now().naive_local();
                let request =
                    composer::answer_request(&self.config, &analysis, &snippets, message, now);
                let response = with_deadline(
                    "answer",
                    self.config.completion_timeout,
                    cancel,
                    provider.complete(request),
                )
                .await?;

                info!(
                    ?path,
                    snippets = snippets.len(),
                    intent = ?analysis.intent,
                    "answer composed"
                );

                ChatReply {
                    reply: composer::finish_answer(&response.text)?,
                    sources: composer::citations(&snippets, self.config.max_citations),
                    usage: response.usage,
                    rag_used: true,
                    faq_used: false,
                    cached: false,
                    fallback_reason: None,
                }
            }
        };

        if complete {
            self.responses.insert(key, reply.clone());
        }
        Ok(reply)
    }

    async fn retrieve_cached(&self, key: &str, analysis: &QueryAnalysis) -> RetrievalOutcome {
        // A local analysis may stand in for a failed enrichment; keep the two apart.
        let search_key = format!("{}|{:?}", key, analysis.source);
        if let Some(hit) = self.searches.get(&search_key) {
            debug!("search cache hit");
            return RetrievalOutcome {
                retrieval: hit,
                complete: true,
            };
        }
        let outcome = self.retriever.retrieve(analysis).await;
        if outcome.complete {
            self.searches.insert(search_key, outcome.retrieval.clone());
        } else {
            debug!("index unavailable, retrieval not cached");
        }
        outcome
    }

    /// Status snapshot for the health endpoint
    pub fn health(&self) -> HealthReport {
        let index = self.index.loaded();
        HealthReport {
            status: "ok",
            environment: self.config.environment.clone(),
            uptime_secs: self.clock.now().duration_since(self.started).as_secs(),
            completion_configured: self.provider.is_some(),
            index_loaded: index.is_some(),
            bm25_params: index.map(|i| i.bm25().params()),
            lexicon_entries: self.lexicon.len(),
            faq_entries: self.faq.len(),
            caches: vec![
                CacheReport::of(&self.responses),
                CacheReport::of(&self.searches),
                CacheReport::of(self.analyzer.cache()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_messages() {
        let service = ChatService::new(ChatConfig::default(), None);
        let cancel = CancellationToken::new();

        assert!(matches!(
            service.answer("   ", &cancel).await,
            Err(AskerError::Validation(_))
        ));
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            service.answer(&long, &cancel).await,
            Err(AskerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_context_without_provider_is_config_error() {
        let service = ChatService::new(ChatConfig::default(), None);
        let cancel = CancellationToken::new();
        let err = service
            .answer("Hvor kan jeg parkere på Føyka?", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AskerError::Config(_)));
    }

    #[tokio::test]
    async fn test_faq_needs_no_provider() {
        let service = ChatService::new(ChatConfig::default(), None);
        let cancel = CancellationToken::new();
        let reply = service.answer("Kontakt klubben", &cancel).await.unwrap();
        assert!(reply.faq_used);
        assert!(!reply.rag_used);
        assert_eq!(reply.sources[0].url, "https://askerfotball.no/kontakt");
    }

    #[test]
    fn test_reply_serializes_camel_case() {
        let reply = ChatReply {
            reply: "Hei".to_string(),
            sources: vec![],
            usage: None,
            rag_used: false,
            faq_used: true,
            cached: false,
            fallback_reason: None,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["faqUsed"], true);
        assert_eq!(json["ragUsed"], false);
        assert!(json.get("fallbackReason").is_none());
    }

    #[test]
    fn test_health_never_mentions_key() {
        let service = ChatService::new(ChatConfig::default(), None);
        let health = service.health();
        assert!(!health.completion_configured);
        assert!(!health.index_loaded);
        assert_eq!(health.caches.len(), 3);
        let json = serde_json::to_string(&health).unwrap();
        assert!(!json.to_lowercase().contains("api_key"));
    }
}
