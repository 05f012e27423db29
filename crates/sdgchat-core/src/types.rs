//! Domain types for the bilingual SDG knowledge base.

use serde::{Deserialize, Serialize};

/// The two languages the knowledge base carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    French,
}

impl Language {
    /// Dataset key for this language ("en" / "fr").
    pub fn key(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }

    pub fn other(self) -> Language {
        match self {
            Language::English => Language::French,
            Language::French => Language::English,
        }
    }

    /// Accepts "en", "fr", "english", "français"/"francais" (any case).
    pub fn parse(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Some(Language::English),
            "fr" | "french" | "français" | "francais" => Some(Language::French),
            _ => None,
        }
    }
}

/// A text field available in up to two languages.
///
/// Resolution order is: requested language, then the other language.
/// This replaces the "string or dict" shape-sniffing of ad-hoc JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BilingualText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
}

impl BilingualText {
    pub fn new(en: impl Into<String>, fr: impl Into<String>) -> Self {
        Self { en: Some(en.into()), fr: Some(fr.into()) }
    }

    fn get(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::English => self.en.as_deref(),
            Language::French => self.fr.as_deref(),
        }
    }

    /// Requested language first, the other language as fallback.
    pub fn resolve(&self, lang: Language) -> Option<&str> {
        self.get(lang).or_else(|| self.get(lang.other()))
    }

    /// All available variants joined, for indexing and embedding.
    pub fn flatten(&self) -> String {
        let mut parts = Vec::new();
        if let Some(en) = self.en.as_deref() { parts.push(en); }
        if let Some(fr) = self.fr.as_deref() { parts.push(fr); }
        parts.join(" / ")
    }

    pub fn is_empty(&self) -> bool {
        self.en.is_none() && self.fr.is_none()
    }
}

/// Per-language word lists (keywords, actions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BilingualList {
    #[serde(default)]
    pub en: Vec<String>,
    #[serde(default)]
    pub fr: Vec<String>,
}

impl BilingualList {
    pub fn for_lang(&self, lang: Language) -> &[String] {
        match lang {
            Language::English => &self.en,
            Language::French => &self.fr,
        }
    }

    pub fn flatten(&self) -> Vec<&str> {
        self.en.iter().chain(self.fr.iter()).map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.en.is_empty() && self.fr.is_empty()
    }
}

/// One target (sub-goal) of a topic entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub code: String,
    #[serde(default)]
    pub description: BilingualText,
}

/// One Sustainable Development Goal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub id: u32,
    pub title: BilingualText,
    #[serde(default)]
    pub description: BilingualText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<BilingualText>,
    #[serde(default)]
    pub keywords: BilingualList,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub actions: BilingualList,
    #[serde(default)]
    pub related: Vec<u32>,
}

fn default_category() -> String {
    "general".to_string()
}

/// One bilingual question/answer record, independent of any topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: BilingualText,
    pub answer: BilingualText,
    #[serde(default)]
    pub keywords: BilingualList,
    #[serde(default = "default_category")]
    pub category: String,
}

/// The loaded knowledge base. Immutable after load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub topics: Vec<TopicEntry>,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.faq.is_empty()
    }

    pub fn topic_by_id(&self, id: u32) -> Option<&TopicEntry> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Deterministic fingerprint used to version every derived artifact.
    ///
    /// Struct field order is fixed by serde, so the serialization (and the
    /// hash) is stable across runs for equal data.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

/// Pointer from a derived document back to its originating entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocRef {
    Topic(u32),
    Faq(usize),
}

/// Flattened searchable text plus its origin, one per indexed entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalDocument {
    pub doc_ref: DocRef,
    pub text: String,
}

/// Precomputed dense vectors, one row per topic entry, parallel-indexed
/// with `documents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingTable {
    pub documents: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

impl EmbeddingTable {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn is_consistent(&self) -> bool {
        self.documents.len() == self.vectors.len()
    }
}

/// Outcome of a lookup: one entry, or an explicit no-data / no-match marker.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Topic(TopicEntry),
    Faq(FaqEntry),
    NoData,
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parse_accepts_both_forms() {
        assert_eq!(Language::parse("English"), Some(Language::English));
        assert_eq!(Language::parse("Français"), Some(Language::French));
        assert_eq!(Language::parse("fr"), Some(Language::French));
        assert_eq!(Language::parse("de"), None);
    }

    #[test]
    fn bilingual_resolve_falls_back_to_other_language() {
        let t = BilingualText { en: None, fr: Some("Pas de pauvreté".into()) };
        assert_eq!(t.resolve(Language::English), Some("Pas de pauvreté"));
        assert_eq!(t.resolve(Language::French), Some("Pas de pauvreté"));

        let both = BilingualText::new("No Poverty", "Pas de pauvreté");
        assert_eq!(both.resolve(Language::English), Some("No Poverty"));
        assert_eq!(both.resolve(Language::French), Some("Pas de pauvreté"));
    }

    #[test]
    fn content_hash_is_stable_and_sensitive() {
        let mut a = Dataset::default();
        a.topics.push(TopicEntry {
            id: 1,
            title: BilingualText::new("No Poverty", "Pas de pauvreté"),
            description: BilingualText::default(),
            statistics: None,
            keywords: BilingualList::default(),
            targets: vec![],
            actions: BilingualList::default(),
            related: vec![],
        });
        let b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        a.topics[0].id = 2;
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
