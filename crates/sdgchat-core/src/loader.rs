//! Dataset loading and validation.
//!
//! The dataset is a single JSON document with two named collections,
//! `topics` and `faq`. It is read once at startup; callers that want the
//! degrade-to-empty behavior use [`load_dataset_or_empty`].

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Dataset;

/// Load and validate the dataset file.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::DataUnavailable(format!("{}: {}", path.display(), e)))?;
    let dataset: Dataset = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidDataset(format!("{}: {}", path.display(), e)))?;
    validate(&dataset)?;
    Ok(dataset)
}

/// Loader variant used at service startup: a missing or malformed file
/// degrades to empty collections, so the pipeline answers "no data"
/// instead of failing the host.
pub fn load_dataset_or_empty(path: &Path) -> Dataset {
    match load_dataset(path) {
        Ok(dataset) => {
            tracing::info!(
                topics = dataset.topics.len(),
                faq = dataset.faq.len(),
                "loaded dataset from {}",
                path.display()
            );
            dataset
        }
        Err(e) => {
            tracing::warn!("dataset unavailable ({}); starting with empty collections", e);
            Dataset::default()
        }
    }
}

fn validate(dataset: &Dataset) -> Result<()> {
    let mut seen = HashSet::new();
    for topic in &dataset.topics {
        if !seen.insert(topic.id) {
            return Err(Error::InvalidDataset(format!("duplicate topic id {}", topic.id)));
        }
        if topic.title.is_empty() {
            return Err(Error::InvalidDataset(format!("topic {} has no title", topic.id)));
        }
    }
    for (i, faq) in dataset.faq.iter().enumerate() {
        if faq.question.is_empty() || faq.answer.is_empty() {
            return Err(Error::InvalidDataset(format!("faq entry {} missing question or answer", i)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("tmp file");
        f.write_all(contents.as_bytes()).expect("write");
        f
    }

    #[test]
    fn loads_minimal_dataset() {
        let f = write_tmp(
            r#"{
                "topics": [
                    {"id": 1, "title": {"en": "No Poverty", "fr": "Pas de pauvreté"}}
                ],
                "faq": [
                    {"question": {"en": "What is an SDG?"}, "answer": {"en": "A goal."}}
                ]
            }"#,
        );
        let dataset = load_dataset(f.path()).expect("load");
        assert_eq!(dataset.topics.len(), 1);
        assert_eq!(dataset.faq.len(), 1);
        assert_eq!(dataset.faq[0].category, "general");
    }

    #[test]
    fn rejects_duplicate_topic_ids() {
        let f = write_tmp(
            r#"{"topics": [
                {"id": 3, "title": {"en": "A"}},
                {"id": 3, "title": {"en": "B"}}
            ], "faq": []}"#,
        );
        assert!(matches!(load_dataset(f.path()), Err(Error::InvalidDataset(_))));
    }

    #[test]
    fn missing_file_is_reported_as_data_unavailable() {
        let err = load_dataset(Path::new("/nonexistent/sdg.json")).expect_err("must fail");
        assert!(matches!(err, Error::DataUnavailable(_)));
    }

    #[test]
    fn missing_or_malformed_file_degrades_to_empty() {
        let missing = load_dataset_or_empty(Path::new("/nonexistent/sdg.json"));
        assert!(missing.is_empty());

        let f = write_tmp("not json at all");
        let malformed = load_dataset_or_empty(f.path());
        assert!(malformed.is_empty());
    }
}
