/*!
# Askerbot Knowledge

Retrieval and relevance scoring for the Asker Fotball assistant:

- **FAQ**: exact and fuzzy lookup of pre-written answers
- **Lexicon**: hand-curated topics scored with keyword, synonym, boost and
  penalty rules
- **Statistical index**: query-time BM25 over the crawled site, loaded lazily
- **Merger**: decides between lexicon, index and canned fallbacks
- **Composer**: builds the answer prompt and citations

## Example Usage

```rust,no_run
use askerbot_core::{CancellationToken, ChatConfig};
use askerbot_plugin_knowledge::ChatService;

# async fn run() -> askerbot_core::Result<()> {
let service = ChatService::new(ChatConfig::default(), None);
let reply = service
    .answer("Kontakt klubben", &CancellationToken::new())
    .await?;
assert!(reply.faq_used);
# Ok(())
# }
```
*/

pub mod bm25;
pub mod composer;
pub mod faq;
pub mod lexicon;
pub mod merger;
pub mod query;
pub mod rules;
pub mod scorer;
pub mod service;

pub use bm25::{Bm25Index, Bm25Params, ChunkMetadata, IndexStore, StatisticalIndex};
pub use composer::NOT_FOUND_SENTENCE;
pub use faq::{FaqEntry, FaqMatchKind, FaqTable};
pub use lexicon::{KnowledgeEntry, Lexicon};
pub use merger::{AnswerPath, FallbackReason, Retrieval, RetrievalOutcome, Retriever, FALLBACK_REPLY};
pub use query::{
    normalize, AnalysisSource, EnrichedAnalysis, EnrichmentOutcome, QueryAnalysis, QueryAnalyzer,
};
pub use rules::{Condition, IntentRule, RuleSet, ScoringRule, SynonymCluster, TopicFallback};
pub use scorer::{Candidate, CandidateOrigin, ScoredCandidate};
pub use service::{CacheReport, ChatReply, ChatService, HealthReport, MAX_MESSAGE_CHARS};
