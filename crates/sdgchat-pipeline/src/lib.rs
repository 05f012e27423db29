//! sdgchat-pipeline
//!
//! The cascading match-and-rank pipeline, the response formatter, and the
//! optional generative rephraser, wired together by `ChatService`.

pub mod formatter;
pub mod matcher;
pub mod rephrase;
pub mod service;

pub use formatter::format_match;
pub use matcher::StageOutcome;
pub use rephrase::{RephraseConfig, Rephraser};
pub use service::{Capabilities, ChatService, ServiceParts};
