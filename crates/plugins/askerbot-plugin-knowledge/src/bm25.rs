/*!
# Statistical Index

Query-time side of the BM25 index produced by the ingestion pipeline.

Two files live in the index directory:

- `bm25-index.json`: a wink-bm25-text-search export. The exporter writes the
  export string through `JSON.stringify` once more, so the file is usually a
  JSON string that itself holds the JSON array
  `[config, docs, invertedIdx, ...]`. A plain array is accepted too.
- `chunk-metadata.json`: chunk id to `{title, url, content, priority?, date?}`.

After consolidation wink stores the final per-term BM25 weight in
`docs[id].freq[term]`, so query scoring is a sum of stored weights over the
query tokens. Tokenization mirrors ingestion: lowercase, split on ASCII
non-word characters.

The loaded index is cached under a constant key with a long TTL. A failed
load is logged, reported as "no index" and not cached, so the next request
retries.
*/

use crate::query::QueryAnalysis;
use crate::scorer::{self, Candidate, CandidateOrigin, ScoredCandidate};
use askerbot_core::{AskerError, ChatConfig, Result, TtlCache};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Index document file name
pub const INDEX_FILE: &str = "bm25-index.json";
/// Chunk metadata file name
pub const METADATA_FILE: &str = "chunk-metadata.json";

const INDEX_CACHE_KEY: &str = "bm25";

/// Per-chunk metadata written by ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Page URL
    #[serde(default)]
    pub url: String,
    /// Chunk text
    #[serde(default)]
    pub content: String,
    /// Optional ranking bonus
    #[serde(default)]
    pub priority: Option<f64>,
    /// Optional publication date
    #[serde(default)]
    pub date: Option<String>,
}

/// BM25 parameters recorded in the export
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f64,
    /// Length normalization
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Lowercase and split on ASCII non-word characters
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parsed wink export
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    params: Bm25Params,
    /// chunk id -> term -> stored weight
    weights: HashMap<String, HashMap<String, f64>>,
    /// term -> chunk ids
    postings: HashMap<String, Vec<String>>,
}

impl Bm25Index {
    /// Parse the contents of `bm25-index.json`
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(raw)?;
        if let Value::String(inner) = value {
            value = serde_json::from_str(&inner)?;
        }

        let Value::Array(parts) = value else {
            return Err(AskerError::index("BM25 export is not an array"));
        };
        let (Some(config), Some(docs), Some(inverted)) = (parts.first(), parts.get(1), parts.get(2))
        else {
            return Err(AskerError::index("BM25 export is missing sections"));
        };

        let params = Self::parse_params(config);

        let docs = docs
            .as_object()
            .ok_or_else(|| AskerError::index("BM25 documents section is not an object"))?;
        let mut weights = HashMap::with_capacity(docs.len());
        for (id, doc) in docs {
            let freq = doc
                .get("freq")
                .and_then(Value::as_object)
                .map(|f| {
                    f.iter()
                        .filter_map(|(term, w)| w.as_f64().map(|w| (term.clone(), w)))
                        .collect::<HashMap<_, _>>()
                })
                .unwrap_or_default();
            weights.insert(id.clone(), freq);
        }

        let inverted = inverted
            .as_object()
            .ok_or_else(|| AskerError::index("BM25 inverted index is not an object"))?;
        let postings = inverted
            .iter()
            .map(|(term, ids)| {
                let ids = ids
                    .as_array()
                    .map(|a| {
                        a.iter()
                            .filter_map(|id| match id {
                                Value::String(s) => Some(s.clone()),
                                Value::Number(n) => Some(n.to_string()),
                                _ => None,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (term.clone(), ids)
            })
            .collect();

        Ok(Self {
            params,
            weights,
            postings,
        })
    }

    fn parse_params(config: &Value) -> Bm25Params {
        let defaults = Bm25Params::default();
        let params = config.get("bm25Params");
        let read = |key: &str, fallback: f64| {
            params
                .and_then(|p| p.get(key))
                .and_then(Value::as_f64)
                .unwrap_or(fallback)
        };
        Bm25Params {
            k1: read("k1", defaults.k1),
            b: read("b", defaults.b),
        }
    }

    /// Recorded parameters
    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the index holds no documents
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Summed weights per chunk for all tokens of all terms
    ///
    /// A token shared by several terms is counted once.
    pub fn score_terms<S: AsRef<str>>(&self, terms: &[S]) -> HashMap<String, f64> {
        let mut seen = HashSet::new();
        let mut scores: HashMap<String, f64> = HashMap::new();

        for token in terms.iter().flat_map(|t| tokenize(t.as_ref())) {
            if !seen.insert(token.clone()) {
                continue;
            }
            let Some(ids) = self.postings.get(&token) else {
                continue;
            };
            for id in ids {
                let weight = self
                    .weights
                    .get(id)
                    .and_then(|freq| freq.get(&token))
                    .copied()
                    .unwrap_or(0.0);
                *scores.entry(id.clone()).or_insert(0.0) += weight;
            }
        }

        scores
    }
}

/// Index plus chunk metadata, ready for search
#[derive(Debug)]
pub struct StatisticalIndex {
    index: Bm25Index,
    chunks: HashMap<String, Arc<Candidate>>,
}

impl StatisticalIndex {
    /// Build from parsed parts
    pub fn new(index: Bm25Index, metadata: HashMap<String, ChunkMetadata>) -> Self {
        let chunks = metadata
            .into_iter()
            .map(|(id, meta)| {
                let candidate = Candidate::new(&id, &meta.title, &meta.url, &meta.content)
                    .with_priority(meta.priority.unwrap_or(0.0))
                    .with_date(meta.date);
                (id, Arc::new(candidate))
            })
            .collect();
        Self { index, chunks }
    }

    /// Read both files from `dir`
    pub async fn load(dir: &Path) -> Result<Self> {
        let index_raw = tokio::fs::read_to_string(dir.join(INDEX_FILE)).await?;
        let metadata_raw = tokio::fs::read_to_string(dir.join(METADATA_FILE)).await?;

        let index = Bm25Index::from_json(&index_raw)?;
        let metadata: HashMap<String, ChunkMetadata> = serde_json::from_str(&metadata_raw)?;

        Ok(Self::new(index, metadata))
    }

    /// Number of chunks with metadata
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The parsed BM25 export
    pub fn bm25(&self) -> &Bm25Index {
        &self.index
    }

    /// Search with the analysis' expansion terms
    ///
    /// Combined score: BM25 + `heuristic_weight` × heuristic relevance +
    /// chunk priority. Chunks without a positive BM25 score, or without
    /// metadata, are skipped. Every remaining chunk is returned, best first;
    /// the caller filters on relevance ratio before cutting to size.
    pub fn search(&self, analysis: &QueryAnalysis, config: &ChatConfig) -> Vec<ScoredCandidate> {
        let mut terms = analysis.search_terms();
        terms.extend(analysis.boost_terms.iter().cloned());

        let mut results: Vec<ScoredCandidate> = self
            .index
            .score_terms(&terms)
            .into_iter()
            .filter(|(_, bm25)| *bm25 > 0.0)
            .filter_map(|(id, bm25)| {
                let candidate = self.chunks.get(&id)?;
                let heuristic = scorer::heuristic_relevance(analysis, candidate);
                let combined =
                    bm25 + config.heuristic_weight * heuristic + candidate.priority.max(0.0);
                Some(ScoredCandidate {
                    candidate: Arc::clone(candidate),
                    score: combined,
                    relevance_ratio: scorer::relevance_ratio(analysis, candidate),
                    matched_terms: Vec::new(),
                    origin: CandidateOrigin::Index,
                })
            })
            .collect();

        results.sort_by(scorer::compare);
        results
    }
}

/// Lazily loaded, cached statistical index
pub struct IndexStore {
    dir: PathBuf,
    cache: TtlCache<Arc<StatisticalIndex>>,
    load_lock: Mutex<()>,
}

impl IndexStore {
    /// Index files are read from `dir` on first use
    pub fn new(dir: impl Into<PathBuf>, cache: TtlCache<Arc<StatisticalIndex>>) -> Self {
        Self {
            dir: dir.into(),
            cache,
            load_lock: Mutex::new(()),
        }
    }

    /// The index, loading it when absent or expired; `None` when unavailable
    pub async fn get(&self) -> Option<Arc<StatisticalIndex>> {
        if let Some(index) = self.cache.get(INDEX_CACHE_KEY) {
            return Some(index);
        }

        let _guard = self.load_lock.lock().await;
        // Another request may have finished loading while we waited.
        if let Some(index) = self.cache.get(INDEX_CACHE_KEY) {
            return Some(index);
        }

        match StatisticalIndex::load(&self.dir).await {
            Ok(index) => {
                info!(
                    dir = %self.dir.display(),
                    chunks = index.chunk_count(),
                    documents = index.bm25().len(),
                    "statistical index loaded"
                );
                let index = Arc::new(index);
                self.cache.insert(INDEX_CACHE_KEY, Arc::clone(&index));
                Some(index)
            }
            Err(e) => {
                warn!(dir = %self.dir.display(), "statistical index unavailable: {}", e);
                None
            }
        }
    }

    /// The index if it is already in memory; never triggers a load
    pub fn loaded(&self) -> Option<Arc<StatisticalIndex>> {
        let loaded = self.cache.get(INDEX_CACHE_KEY);
        debug!(loaded = loaded.is_some(), "index status checked");
        loaded
    }

    /// Search the index; `None` when it cannot be loaded
    pub async fn search(
        &self,
        analysis: &QueryAnalysis,
        config: &ChatConfig,
    ) -> Option<Vec<ScoredCandidate>> {
        self.get().await.map(|index| index.search(analysis, config))
    }
}
