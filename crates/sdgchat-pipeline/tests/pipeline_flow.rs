use std::time::Duration;

use tempfile::TempDir;

use sdgchat_core::types::{
    BilingualList, BilingualText, Dataset, DocRef, FaqEntry, Language, LexicalDocument,
    MatchResult, TopicEntry,
};
use sdgchat_embed::HashEmbedder;
use sdgchat_pipeline::service::build_embedding_table;
use sdgchat_pipeline::{format_match, ChatService, RephraseConfig, Rephraser, ServiceParts};
use sdgchat_text::{LexicalIndex, LexicalRetriever, DEFAULT_TOP_K};

fn topic(id: u32, en: &str, fr: &str, keywords_en: &[&str], keywords_fr: &[&str]) -> TopicEntry {
    TopicEntry {
        id,
        title: BilingualText::new(en, fr),
        description: BilingualText::new(format!("Description of {}.", en), format!("Description de {}.", fr)),
        statistics: None,
        keywords: BilingualList {
            en: keywords_en.iter().map(|s| s.to_string()).collect(),
            fr: keywords_fr.iter().map(|s| s.to_string()).collect(),
        },
        targets: vec![],
        actions: BilingualList::default(),
        related: vec![],
    }
}

fn fixture_dataset() -> Dataset {
    Dataset {
        topics: vec![
            topic(1, "No Poverty", "Pas de pauvreté", &["poverty", "poor"], &["pauvreté"]),
            topic(4, "Quality Education", "Éducation de qualité", &["education", "school"], &["éducation"]),
            topic(13, "Climate Action", "Lutte contre le changement climatique", &["climate"], &["climat"]),
        ],
        faq: vec![FaqEntry {
            question: BilingualText::new("How is funding allocated?", "Comment le financement est-il réparti ?"),
            answer: BilingualText::new("Funding comes from member states.", "Le financement provient des États membres."),
            keywords: BilingualList {
                en: vec!["funding".into(), "budget".into()],
                fr: vec!["financement".into()],
            },
            category: "general".into(),
        }],
    }
}

fn bare_service() -> ChatService {
    ChatService::with_parts(fixture_dataset(), ServiceParts::default())
}

#[test]
fn numeric_id_matches_regardless_of_other_stages() {
    let service = bare_service();
    for question in ["What is SDG 13?", "Tell me about goal 13", "ODD 13 ?", "13"] {
        match service.match_question(question, Language::English) {
            MatchResult::Topic(t) => assert_eq!(t.id, 13, "question: {}", question),
            other => panic!("expected topic for {:?}, got {:?}", question, other),
        }
    }
}

#[test]
fn unknown_numeric_id_falls_through() {
    let service = bare_service();
    assert_eq!(service.match_question("What is SDG 99?", Language::English), MatchResult::NoMatch);
}

#[test]
fn overlong_numeric_id_is_not_truncated() {
    // "SDG 1000" must not capture a "100" prefix and hit topic 100
    let mut dataset = fixture_dataset();
    dataset.topics.push(topic(100, "Test Goal", "Objectif test", &[], &[]));
    let service = ChatService::with_parts(dataset, ServiceParts::default());
    assert_eq!(
        service.match_question("What is SDG 1000?", Language::English),
        MatchResult::NoMatch
    );
}

#[test]
fn keyword_scan_prefers_topics_then_faq() {
    let service = bare_service();

    match service.match_question("How can we stop climate change?", Language::English) {
        MatchResult::Topic(t) => assert_eq!(t.id, 13),
        other => panic!("expected climate topic, got {:?}", other),
    }

    // no topic keyword matches; the FAQ keyword "funding" does
    match service.match_question("How is funding allocated?", Language::English) {
        MatchResult::Faq(f) => assert_eq!(f.keywords.en[0], "funding"),
        other => panic!("expected FAQ, got {:?}", other),
    }
}

#[test]
fn keyword_scan_uses_requested_language() {
    let service = bare_service();
    match service.match_question("Comment réduire la pauvreté ?", Language::French) {
        MatchResult::Topic(t) => assert_eq!(t.id, 1),
        other => panic!("expected poverty topic, got {:?}", other),
    }
    // French keywords are not consulted for an English lookup
    assert_eq!(
        service.match_question("Comment réduire la pauvreté ?", Language::English),
        MatchResult::NoMatch
    );
}

#[test]
fn lexical_stage_runs_before_keyword_scan() {
    // Index where only the FAQ document carries the question's vocabulary;
    // the keyword scan alone would settle on topic 13 instead.
    let tmp = TempDir::new().expect("tmp");
    let docs = vec![
        LexicalDocument { doc_ref: DocRef::Topic(1), text: "poverty income inequality".into() },
        LexicalDocument { doc_ref: DocRef::Faq(0), text: "climate emissions warming budget".into() },
    ];
    let index = LexicalIndex::create(tmp.path(), &docs).expect("index");
    let retriever = LexicalRetriever::new(index, DEFAULT_TOP_K);

    let with_retriever = ChatService::with_parts(
        fixture_dataset(),
        ServiceParts { retriever: Some(retriever), ..ServiceParts::default() },
    );
    match with_retriever.match_question("climate emissions", Language::English) {
        MatchResult::Faq(_) => {}
        other => panic!("lexical stage should win, got {:?}", other),
    }

    // same question without the index falls to the keyword scan
    match bare_service().match_question("climate emissions", Language::English) {
        MatchResult::Topic(t) => assert_eq!(t.id, 13),
        other => panic!("keyword stage should win, got {:?}", other),
    }
}

#[test]
fn embedding_stage_is_the_last_resort() {
    // keyword-less dataset so the scan yields nothing and the cascade
    // reaches the embedding stage
    let embedder = HashEmbedder::new(128);
    let mut dataset = fixture_dataset();
    for t in &mut dataset.topics {
        t.keywords = BilingualList::default();
    }
    let table = build_embedding_table(&dataset, &embedder).expect("table");
    assert_eq!(table.len(), dataset.topics.len());

    let service = ChatService::with_parts(
        dataset,
        ServiceParts {
            embedder: Some(Box::new(HashEmbedder::new(128))),
            embedding_table: Some(table),
            ..ServiceParts::default()
        },
    );
    assert!(service.capabilities().embedding);

    match service.match_question("quality education in every classroom", Language::English) {
        MatchResult::Topic(t) => assert_eq!(t.id, 4),
        other => panic!("expected embedding fallback, got {:?}", other),
    }
}

#[test]
fn keyword_hits_take_precedence_over_embedding() {
    let embedder = HashEmbedder::new(128);
    let dataset = fixture_dataset();
    let table = build_embedding_table(&dataset, &embedder).expect("table");
    let service = ChatService::with_parts(
        dataset,
        ServiceParts {
            embedder: Some(Box::new(HashEmbedder::new(128))),
            embedding_table: Some(table),
            ..ServiceParts::default()
        },
    );

    match service.match_question("climate is changing", Language::English) {
        MatchResult::Topic(t) => assert_eq!(t.id, 13),
        other => panic!("expected keyword match, got {:?}", other),
    }
}

#[test]
fn empty_dataset_always_answers_no_data() {
    let service = ChatService::with_parts(Dataset::default(), ServiceParts::default());
    for question in ["What is SDG 1?", "funding", ""] {
        assert_eq!(service.match_question(question, Language::English), MatchResult::NoData);
    }
    assert_eq!(
        format_match(&MatchResult::NoData, Language::French),
        "[ERREUR] Aucune donnée ODD disponible."
    );
}

#[test]
fn no_stage_available_yields_no_match() {
    let service = bare_service();
    let result = service.match_question("completely unrelated query xyz", Language::English);
    assert_eq!(result, MatchResult::NoMatch);
    assert_eq!(
        format_match(&result, Language::English),
        "[ERROR] No matching question found."
    );
}

#[tokio::test]
async fn answer_without_rephraser_returns_base_text() {
    let service = bare_service();
    let text = service.answer("What is SDG 1?", Language::English).await;
    assert!(text.starts_with("SDG 1: No Poverty"));
    assert!(!text.contains("reformulation"));
}

#[tokio::test]
async fn rephrase_failure_appends_error_to_base_text() {
    let rephraser = Rephraser::new(RephraseConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        timeout: Duration::from_millis(200),
        ..RephraseConfig::default()
    })
    .expect("client");
    let service = ChatService::with_parts(
        fixture_dataset(),
        ServiceParts { rephraser: Some(rephraser), ..ServiceParts::default() },
    );

    let en = service.answer("What is SDG 1?", Language::English).await;
    assert!(en.starts_with("SDG 1: No Poverty"));
    assert!(en.contains("[LLM ERROR]"));

    let fr = service.answer("ODD 1 ?", Language::French).await;
    assert!(fr.starts_with("ODD 1 : Pas de pauvreté"));
    assert!(fr.contains("[ERREUR LLM]"));
}
