//! Flattening of knowledge-base entries into searchable documents.

use sdgchat_core::types::{Dataset, DocRef, FaqEntry, LexicalDocument, TopicEntry};

/// One document per topic and per FAQ entry, both languages concatenated
/// so a single index serves English and French questions.
pub fn build_documents(dataset: &Dataset) -> Vec<LexicalDocument> {
    let mut docs = Vec::with_capacity(dataset.topics.len() + dataset.faq.len());
    for topic in &dataset.topics {
        docs.push(LexicalDocument {
            doc_ref: DocRef::Topic(topic.id),
            text: topic_text(topic),
        });
    }
    for (i, faq) in dataset.faq.iter().enumerate() {
        docs.push(LexicalDocument {
            doc_ref: DocRef::Faq(i),
            text: faq_text(faq),
        });
    }
    docs
}

fn topic_text(topic: &TopicEntry) -> String {
    let mut text = format!("SDG {}: {}. {}.", topic.id, topic.title.flatten(), topic.description.flatten());
    if let Some(stats) = &topic.statistics {
        text.push_str(&format!(" Statistics: {}.", stats.flatten()));
    }
    if !topic.keywords.is_empty() {
        text.push_str(&format!(" Keywords: {}.", topic.keywords.flatten().join(", ")));
    }
    if !topic.targets.is_empty() {
        let targets: Vec<String> = topic
            .targets
            .iter()
            .map(|t| format!("{}: {}", t.code, t.description.flatten()))
            .collect();
        text.push_str(&format!(" Targets: {}.", targets.join("; ")));
    }
    if !topic.actions.is_empty() {
        text.push_str(&format!(" Actions: {}.", topic.actions.flatten().join("; ")));
    }
    text
}

fn faq_text(faq: &FaqEntry) -> String {
    let mut text = format!("{} {}", faq.question.flatten(), faq.answer.flatten());
    if !faq.keywords.is_empty() {
        text.push_str(&format!(" Keywords: {}", faq.keywords.flatten().join(", ")));
    }
    text
}
