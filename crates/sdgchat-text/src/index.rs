use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument};

use sdgchat_core::types::{DocRef, LexicalDocument};

use crate::tantivy_utils::{build_schema, register_tokenizer};

pub const DEFAULT_TOP_K: usize = 3;

/// The on-disk BM25 index over flattened knowledge-base documents.
pub struct LexicalIndex {
    index: Index,
    kind_field: tantivy::schema::Field,
    key_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
}

impl LexicalIndex {
    /// Build a fresh index at `index_dir` from the given documents,
    /// replacing anything already there.
    pub fn create(index_dir: &Path, documents: &[LexicalDocument]) -> Result<Self> {
        let schema = build_schema();
        if index_dir.exists() {
            std::fs::remove_dir_all(index_dir)?;
        }
        std::fs::create_dir_all(index_dir)?;
        let index = Index::create_in_dir(index_dir, schema)?;
        register_tokenizer(&index);

        let lexical = Self::from_index(index)?;
        let mut writer = lexical.index.writer(15_000_000)?;
        for document in documents {
            let (kind, key) = encode_ref(document.doc_ref);
            writer.add_document(doc!(
                lexical.kind_field => kind,
                lexical.key_field => key,
                lexical.text_field => document.text.clone(),
            ))?;
        }
        writer.commit()?;
        tracing::info!("lexical index built with {} documents at {}", documents.len(), index_dir.display());
        Ok(lexical)
    }

    /// Reopen a previously built index (the cache-hit path). Fails when
    /// the directory is absent or unreadable; callers treat that as a miss.
    pub fn open(index_dir: &Path) -> Result<Self> {
        let index = Index::open_in_dir(index_dir)?;
        register_tokenizer(&index);
        Self::from_index(index)
    }

    fn from_index(index: Index) -> Result<Self> {
        let schema = index.schema();
        let kind_field = schema.get_field("kind")?;
        let key_field = schema.get_field("key")?;
        let text_field = schema.get_field("text")?;
        Ok(Self { index, kind_field, key_field, text_field })
    }
}

/// Bag-of-words ranking over the lexical index. Any non-empty result is
/// trusted unconditionally by the pipeline; there is no score threshold.
pub struct LexicalRetriever {
    index: LexicalIndex,
    top_k: usize,
}

impl LexicalRetriever {
    pub fn new(index: LexicalIndex, top_k: usize) -> Self {
        Self { index, top_k: top_k.max(1) }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top `top_k` candidates by BM25 score, best first.
    pub fn retrieve(&self, question: &str) -> Result<Vec<(DocRef, f32)>> {
        let reader = self.index.index.reader()?;
        let searcher = reader.searcher();
        let parser = QueryParser::for_index(&self.index.index, vec![self.index.text_field]);
        // Lenient parse: hostile punctuation degrades to the terms it can
        // salvage instead of failing the stage.
        let (query, _errors) = parser.parse_query_lenient(question);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(self.top_k))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let kind = doc.get_first(self.index.kind_field).and_then(|v| v.as_str()).unwrap_or("");
            let key = doc.get_first(self.index.key_field).and_then(|v| v.as_str()).unwrap_or("");
            if let Some(doc_ref) = decode_ref(kind, key) {
                hits.push((doc_ref, score));
            }
        }
        Ok(hits)
    }
}

fn encode_ref(doc_ref: DocRef) -> (String, String) {
    match doc_ref {
        DocRef::Topic(id) => ("topic".to_string(), id.to_string()),
        DocRef::Faq(index) => ("faq".to_string(), index.to_string()),
    }
}

fn decode_ref(kind: &str, key: &str) -> Option<DocRef> {
    match kind {
        "topic" => key.parse().ok().map(DocRef::Topic),
        "faq" => key.parse().ok().map(DocRef::Faq),
        _ => None,
    }
}
