//! The ordered cascade of match strategies.
//!
//! Stage order is fixed: numeric id, lexical retrieval, keyword scan,
//! dense-embedding similarity. A stage runs only when every prior stage
//! produced nothing; a stage failure is logged and treated as empty.

use sdgchat_core::types::{DocRef, Language, MatchResult};
use sdgchat_embed::best_match;

use crate::service::ChatService;

/// What a single stage reported. Making this explicit keeps the cascade's
/// decision observable and testable instead of burying it in catch-alls.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Matched(MatchResult),
    Empty,
    Unavailable,
    Failed(String),
}

impl StageOutcome {
    fn into_match(self, stage: &str) -> Option<MatchResult> {
        match self {
            StageOutcome::Matched(result) => {
                tracing::info!(stage, "stage matched");
                Some(result)
            }
            StageOutcome::Empty => None,
            StageOutcome::Unavailable => {
                tracing::debug!(stage, "stage unavailable; skipped");
                None
            }
            StageOutcome::Failed(reason) => {
                tracing::warn!(stage, "stage failed ({}); cascade continues", reason);
                None
            }
        }
    }
}

impl ChatService {
    /// Match `question` to the single best knowledge-base entry.
    /// Read-only: neither the dataset nor persisted artifacts are touched.
    pub fn match_question(&self, question: &str, lang: Language) -> MatchResult {
        if self.dataset().is_empty() {
            return MatchResult::NoData;
        }
        if let Some(result) = self.numeric_id_stage(question).into_match("numeric_id") {
            return result;
        }
        if let Some(result) = self.lexical_stage(question).into_match("lexical") {
            return result;
        }
        if let Some(result) = self.keyword_stage(question, lang).into_match("keyword") {
            return result;
        }
        if let Some(result) = self.embedding_stage(question).into_match("embedding") {
            return result;
        }
        MatchResult::NoMatch
    }

    /// Stage 1: "SDG 3" / "ODD 3" style directives, or a bare integer.
    /// Highest confidence; bypasses every other stage.
    pub(crate) fn numeric_id_stage(&self, question: &str) -> StageOutcome {
        let number = self
            .id_pattern()
            .captures(question)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .or_else(|| question.trim().parse::<u32>().ok());
        let topic = number
            .and_then(|n| self.topic_row(n))
            .and_then(|row| self.dataset().topics.get(row));
        match topic {
            Some(topic) => StageOutcome::Matched(MatchResult::Topic(topic.clone())),
            None => StageOutcome::Empty,
        }
    }

    /// Stage 2: BM25 retrieval; the top candidate is trusted
    /// unconditionally when the index is available.
    pub(crate) fn lexical_stage(&self, question: &str) -> StageOutcome {
        let Some(retriever) = self.retriever() else {
            return StageOutcome::Unavailable;
        };
        let hits = match retriever.retrieve(question) {
            Ok(hits) => hits,
            Err(e) => return StageOutcome::Failed(e.to_string()),
        };
        let Some((doc_ref, _score)) = hits.first() else {
            return StageOutcome::Empty;
        };
        match self.resolve_ref(*doc_ref) {
            Some(result) => StageOutcome::Matched(result),
            // stale index entry pointing at nothing; treat as no result
            None => StageOutcome::Empty,
        }
    }

    /// Stage 3: case-insensitive keyword substring scan, topics first in
    /// dataset order, then FAQ entries. First match wins.
    pub(crate) fn keyword_stage(&self, question: &str, lang: Language) -> StageOutcome {
        let question_lower = question.to_lowercase();
        for topic in &self.dataset().topics {
            for keyword in topic.keywords.for_lang(lang) {
                if question_lower.contains(&keyword.to_lowercase()) {
                    return StageOutcome::Matched(MatchResult::Topic(topic.clone()));
                }
            }
        }
        for faq in &self.dataset().faq {
            for keyword in faq.keywords.for_lang(lang) {
                if question_lower.contains(&keyword.to_lowercase()) {
                    return StageOutcome::Matched(MatchResult::Faq(faq.clone()));
                }
            }
        }
        StageOutcome::Empty
    }

    /// Stage 4: cosine arg-max over the precomputed table. Last resort;
    /// the arg-max is accepted even when similarity is low.
    pub(crate) fn embedding_stage(&self, question: &str) -> StageOutcome {
        let (Some(embedder), Some(table)) = (self.embedder(), self.embedding_table()) else {
            return StageOutcome::Unavailable;
        };
        let query = match embedder.embed(question) {
            Ok(v) => v,
            Err(e) => return StageOutcome::Failed(e.to_string()),
        };
        match best_match(table, &query).and_then(|i| self.dataset().topics.get(i)) {
            Some(topic) => StageOutcome::Matched(MatchResult::Topic(topic.clone())),
            None => StageOutcome::Empty,
        }
    }

    fn resolve_ref(&self, doc_ref: DocRef) -> Option<MatchResult> {
        match doc_ref {
            DocRef::Topic(id) => self.dataset().topic_by_id(id).cloned().map(MatchResult::Topic),
            DocRef::Faq(index) => self.dataset().faq.get(index).cloned().map(MatchResult::Faq),
        }
    }
}
