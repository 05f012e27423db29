//! sdgchat-text
//!
//! Tantivy-backed lexical retrieval over the flattened knowledge base.
//! `documents` turns topic/FAQ entries into searchable text, `index` builds
//! and queries the BM25 index.

pub mod documents;
pub mod index;
pub mod tantivy_utils;

pub use documents::build_documents;
pub use index::{LexicalIndex, LexicalRetriever, DEFAULT_TOP_K};
