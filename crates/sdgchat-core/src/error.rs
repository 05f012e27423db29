use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No SDG data available: {0}")]
    DataUnavailable(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Rephrase failed: {0}")]
    Rephrase(String),
}

pub type Result<T> = std::result::Result<T, Error>;
