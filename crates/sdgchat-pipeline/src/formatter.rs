//! Rendering of a match result into bilingual display text.

use sdgchat_core::types::{FaqEntry, Language, MatchResult, TopicEntry};

/// Render `result` for the requested language. Pure; rephrasing is layered
/// on top by `ChatService::answer`.
pub fn format_match(result: &MatchResult, lang: Language) -> String {
    match result {
        MatchResult::NoData => match lang {
            Language::English => "[ERROR] No SDG data available.".to_string(),
            Language::French => "[ERREUR] Aucune donnée ODD disponible.".to_string(),
        },
        MatchResult::NoMatch => match lang {
            Language::English => "[ERROR] No matching question found.".to_string(),
            Language::French => "[ERREUR] Aucune question correspondante trouvée.".to_string(),
        },
        MatchResult::Faq(faq) => format_faq(faq, lang),
        MatchResult::Topic(topic) => format_topic(topic, lang),
    }
}

fn format_faq(faq: &FaqEntry, lang: Language) -> String {
    let question = faq.question.resolve(lang).unwrap_or_default();
    let answer = faq.answer.resolve(lang).unwrap_or_default();
    match lang {
        Language::English => format!("FAQ: {}\nAnswer: {}", question, answer),
        Language::French => format!("FAQ : {}\nRéponse : {}", question, answer),
    }
}

fn format_topic(topic: &TopicEntry, lang: Language) -> String {
    let title = topic.title.resolve(lang).unwrap_or_default();
    let mut text = match lang {
        Language::English => format!("SDG {}: {}", topic.id, title),
        Language::French => format!("ODD {} : {}", topic.id, title),
    };
    if let Some(description) = topic.description.resolve(lang) {
        text.push('\n');
        text.push_str(description);
    }
    if let Some(stats) = topic.statistics.as_ref().and_then(|s| s.resolve(lang)) {
        let label = match lang {
            Language::English => "Statistics",
            Language::French => "Statistiques",
        };
        text.push_str(&format!("\n{} : {}", label, stats));
    }
    if !topic.targets.is_empty() {
        let label = match lang {
            Language::English => "Targets",
            Language::French => "Cibles",
        };
        let targets: Vec<String> = topic
            .targets
            .iter()
            .map(|t| format!("{}: {}", t.code, t.description.resolve(lang).unwrap_or_default()))
            .collect();
        text.push_str(&format!("\n{} : {}", label, targets.join(", ")));
    }
    let actions = topic.actions.for_lang(lang);
    let actions = if actions.is_empty() { topic.actions.for_lang(lang.other()) } else { actions };
    if !actions.is_empty() {
        text.push_str(&format!("\nActions : {}", actions.join(", ")));
    }
    text
}

/// Prompt handed to the rephraser: the formatted answer plus the original
/// question, with a per-language instruction.
pub fn build_prompt(base: &str, question: &str, lang: Language) -> String {
    match lang {
        Language::English => format!(
            "Here is information about an SDG or FAQ:\n{}\n\nUser question: {}\n\nWrite a clear and concise answer for a human in English.",
            base, question
        ),
        Language::French => format!(
            "Voici des informations sur un ODD ou une FAQ :\n{}\n\nQuestion utilisateur : {}\n\nFais une réponse claire et synthétique pour un humain en français.",
            base, question
        ),
    }
}

pub fn rephrase_heading(lang: Language) -> &'static str {
    match lang {
        Language::English => "🤖 AI reformulation:",
        Language::French => "🤖 Reformulation IA :",
    }
}

/// Error line appended to the base text when a requested rephrase fails.
/// The answer itself is never sacrificed to a generation error.
pub fn rephrase_error_line(lang: Language, detail: &str) -> String {
    match lang {
        Language::English => format!("[LLM ERROR] {}", detail),
        Language::French => format!("[ERREUR LLM] {}", detail),
    }
}
