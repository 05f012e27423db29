//! Explicitly constructed service object holding the dataset and artifact
//! handles. One-time initialization replaces import-time globals; every
//! optional collaborator becomes a capability flag resolved here, once.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use sdgchat_cache::{ArtifactCache, ArtifactKind, CacheInfo};
use sdgchat_core::config::{expand_path, Config};
use sdgchat_core::loader::load_dataset_or_empty;
use sdgchat_core::types::{Dataset, EmbeddingTable, Language, MatchResult};
use sdgchat_embed::{default_embedder, Embedder};
use sdgchat_text::{build_documents, LexicalIndex, LexicalRetriever, DEFAULT_TOP_K};

use crate::formatter::{build_prompt, format_match, rephrase_error_line, rephrase_heading};
use crate::rephrase::{RephraseConfig, Rephraser};

// Replies at or under this length are degenerate and discarded.
const MIN_REPHRASE_LEN: usize = 10;

/// Optional collaborators, resolved once at construction time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub lexical: bool,
    pub embedding: bool,
    pub rephrase: bool,
}

/// Pre-built collaborators for direct assembly (tests, embedders without
/// a cache). `ChatService::initialize` is the production path.
#[derive(Default)]
pub struct ServiceParts {
    pub retriever: Option<LexicalRetriever>,
    pub embedder: Option<Box<dyn Embedder>>,
    pub embedding_table: Option<EmbeddingTable>,
    pub rephraser: Option<Rephraser>,
}

/// Probe persisted alongside the other artifacts; model weights load from
/// their own files, this records which embedder produced the vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelManifest {
    embedder_id: String,
    dim: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RetrieverParams {
    top_k: usize,
}

pub struct ChatService {
    dataset: Dataset,
    dataset_hash: String,
    topic_rows: HashMap<u32, usize>,
    id_pattern: Regex,
    cache: Option<ArtifactCache>,
    retriever: Option<LexicalRetriever>,
    embedder: Option<Box<dyn Embedder>>,
    embedding_table: Option<EmbeddingTable>,
    rephraser: Option<Rephraser>,
    capabilities: Capabilities,
}

impl ChatService {
    /// Production constructor: load the dataset, then consult or populate
    /// the artifact cache for the index, retriever, and embeddings.
    pub fn initialize(config: &Config) -> Result<ChatService> {
        let dataset_path =
            expand_path(config.get_or::<String>("data.dataset_path", "data/sdg_dataset.json".into()));
        let dataset = load_dataset_or_empty(&dataset_path);
        let dataset_hash = dataset.content_hash();

        let cache_dir = expand_path(config.get_or::<String>("cache.dir", ".sdgchat_cache".into()));
        let cache = ArtifactCache::open(cache_dir)?;

        let mut parts = ServiceParts::default();
        if !dataset.is_empty() {
            parts.embedder = Self::init_embedder(config, &cache, &dataset_hash);
            parts.retriever = Self::init_retriever(config, &cache, &dataset_hash, &dataset);
            if let Some(embedder) = parts.embedder.as_deref() {
                parts.embedding_table = Self::init_embedding_table(&cache, &dataset_hash, &dataset, embedder);
            }
        }
        if config.get_or("rephrase.enabled", false) {
            parts.rephraser = Self::init_rephraser(config);
        }

        Ok(Self::assemble(dataset, dataset_hash, Some(cache), parts))
    }

    /// Assemble a service from pre-built parts; any capability subset goes.
    pub fn with_parts(dataset: Dataset, parts: ServiceParts) -> ChatService {
        let hash = dataset.content_hash();
        Self::assemble(dataset, hash, None, parts)
    }

    fn assemble(
        dataset: Dataset,
        dataset_hash: String,
        cache: Option<ArtifactCache>,
        parts: ServiceParts,
    ) -> ChatService {
        let capabilities = Capabilities {
            lexical: parts.retriever.is_some(),
            embedding: parts.embedder.is_some() && parts.embedding_table.is_some(),
            rephrase: parts.rephraser.is_some(),
        };
        tracing::info!(
            topics = dataset.topics.len(),
            faq = dataset.faq.len(),
            lexical = capabilities.lexical,
            embedding = capabilities.embedding,
            rephrase = capabilities.rephrase,
            "chat service ready"
        );
        let topic_rows = dataset.topics.iter().enumerate().map(|(row, t)| (t.id, row)).collect();
        ChatService {
            dataset,
            dataset_hash,
            topic_rows,
            id_pattern: Regex::new(r"(?i)\b(?:sdg|odd|goal|objectif)\s*#?\s*(\d+)\b")
                .expect("id pattern is a checked literal"),
            cache,
            retriever: parts.retriever,
            embedder: parts.embedder,
            embedding_table: parts.embedding_table,
            rephraser: parts.rephraser,
            capabilities,
        }
    }

    fn init_embedder(config: &Config, cache: &ArtifactCache, hash: &str) -> Option<Box<dyn Embedder>> {
        let model_dir =
            expand_path(config.get_or::<String>("embed.model_dir", "models/multilingual-minilm".into()));
        match default_embedder(&model_dir) {
            Ok(embedder) => {
                let manifest = cache.get_or_build(ArtifactKind::EmbeddingModel, hash, || {
                    Ok(ModelManifest { embedder_id: embedder.id(), dim: embedder.dim() })
                });
                match manifest {
                    Ok(m) if m.embedder_id != embedder.id() => {
                        tracing::warn!(
                            "cached embeddings came from '{}', current embedder is '{}'",
                            m.embedder_id,
                            embedder.id()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("model manifest unavailable: {}", e),
                }
                Some(embedder)
            }
            Err(e) => {
                tracing::warn!("embedding capability disabled: {}", e);
                None
            }
        }
    }

    fn init_retriever(
        config: &Config,
        cache: &ArtifactCache,
        hash: &str,
        dataset: &Dataset,
    ) -> Option<LexicalRetriever> {
        let configured_top_k = config.get_or("retrieval.top_k", DEFAULT_TOP_K);
        let params = cache
            .get_or_build(ArtifactKind::LexicalRetriever, hash, || {
                Ok(RetrieverParams { top_k: configured_top_k })
            })
            .unwrap_or(RetrieverParams { top_k: configured_top_k });

        let index_dir = cache.index_dir(ArtifactKind::LexicalIndex, hash);
        let index = if index_dir.exists() {
            LexicalIndex::open(&index_dir).or_else(|e| {
                tracing::warn!("stale lexical index ({}); rebuilding", e);
                LexicalIndex::create(&index_dir, &build_documents(dataset))
            })
        } else {
            LexicalIndex::create(&index_dir, &build_documents(dataset))
        };
        match index {
            Ok(index) => Some(LexicalRetriever::new(index, params.top_k)),
            Err(e) => {
                tracing::warn!("lexical capability disabled: {}", e);
                None
            }
        }
    }

    fn init_embedding_table(
        cache: &ArtifactCache,
        hash: &str,
        dataset: &Dataset,
        embedder: &dyn Embedder,
    ) -> Option<EmbeddingTable> {
        let built = cache.get_or_build(ArtifactKind::EmbeddingTable, hash, || {
            build_embedding_table(dataset, embedder)
        });
        match built {
            Ok(table) if table.is_consistent() && table.len() == dataset.topics.len() => Some(table),
            Ok(_) => {
                tracing::warn!("embedding table inconsistent with dataset; stage disabled");
                None
            }
            Err(e) => {
                tracing::warn!("embedding table unavailable: {}", e);
                None
            }
        }
    }

    fn init_rephraser(config: &Config) -> Option<Rephraser> {
        let defaults = RephraseConfig::default();
        let rephrase_config = RephraseConfig {
            endpoint: config.get_or("rephrase.endpoint", defaults.endpoint),
            model: config.get_or("rephrase.model", defaults.model),
            max_tokens: config.get_or("rephrase.max_tokens", defaults.max_tokens),
            temperature: config.get_or("rephrase.temperature", defaults.temperature),
            timeout: Duration::from_secs(config.get_or("rephrase.timeout_secs", 30)),
        };
        match Rephraser::new(rephrase_config) {
            Ok(rephraser) => Some(rephraser),
            Err(e) => {
                tracing::warn!("rephrase capability disabled: {}", e);
                None
            }
        }
    }

    /// Format the best match for `question`, rephrasing when that
    /// capability is on. The base text is always delivered; a failed
    /// generation appends its error line instead of replacing the answer.
    pub async fn answer(&self, question: &str, lang: Language) -> String {
        let result = self.match_question(question, lang);
        let base = format_match(&result, lang);
        if matches!(result, MatchResult::NoData | MatchResult::NoMatch) {
            return base;
        }
        let Some(rephraser) = &self.rephraser else {
            return base;
        };
        let prompt = build_prompt(&base, question, lang);
        match rephraser.generate(&prompt).await {
            Ok(text) if text.trim().len() > MIN_REPHRASE_LEN => {
                format!("{}\n\n{}\n{}", base, rephrase_heading(lang), text.trim())
            }
            Ok(_) => {
                tracing::warn!("rephraser returned degenerate output; keeping base text");
                base
            }
            Err(e) => {
                tracing::warn!("rephrase failed: {}", e);
                format!("{}\n\n{}", base, rephrase_error_line(lang, &e.to_string()))
            }
        }
    }

    pub fn clear_cache(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.clear(),
            None => anyhow::bail!("no artifact cache configured"),
        }
    }

    pub fn cache_info(&self) -> Result<CacheInfo> {
        match &self.cache {
            Some(cache) => cache.info(),
            None => anyhow::bail!("no artifact cache configured"),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn dataset_hash(&self) -> &str {
        &self.dataset_hash
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub(crate) fn id_pattern(&self) -> &Regex {
        &self.id_pattern
    }

    pub(crate) fn retriever(&self) -> Option<&LexicalRetriever> {
        self.retriever.as_ref()
    }

    pub(crate) fn embedder(&self) -> Option<&dyn Embedder> {
        self.embedder.as_deref()
    }

    pub(crate) fn embedding_table(&self) -> Option<&EmbeddingTable> {
        self.embedding_table.as_ref()
    }

    pub(crate) fn topic_row(&self, id: u32) -> Option<usize> {
        self.topic_rows.get(&id).copied()
    }
}

/// One row per topic entry, both languages flattened into the text that
/// gets embedded.
pub fn build_embedding_table(dataset: &Dataset, embedder: &dyn Embedder) -> Result<EmbeddingTable> {
    let documents: Vec<String> = dataset
        .topics
        .iter()
        .map(|t| {
            format!(
                "SDG {}: {} - {} - {}",
                t.id,
                t.title.flatten(),
                t.description.flatten(),
                t.keywords.flatten().join(", ")
            )
        })
        .collect();
    let vectors = embedder.embed_batch(&documents)?;
    Ok(EmbeddingTable { documents, vectors })
}
