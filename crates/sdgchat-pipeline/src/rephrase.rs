//! Optional single-shot text generation against an Ollama-style endpoint.
//!
//! Treated as an unreliable external collaborator: every transport, status,
//! decode, or timeout problem surfaces as `Error::Rephrase`, and the
//! formatter keeps working with this collaborator entirely absent.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sdgchat_core::error::Error;

#[derive(Debug, Clone)]
pub struct RephraseConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for RephraseConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:1.5b-instruct".to_string(),
            max_tokens: 64,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct Rephraser {
    client: reqwest::Client,
    config: RephraseConfig,
}

impl Rephraser {
    pub fn new(config: RephraseConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Rephrase(format!("client setup: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// One bounded generation call. Stochastic sampling, no retries.
    pub async fn generate(&self, prompt: &str) -> Result<String, Error> {
        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Rephrase(format!("request: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::Rephrase(format!("status {}", response.status())));
        }
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Rephrase(format!("decode: {}", e)))?;
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            options: GenerateOptions { num_predict: 64, temperature: 0.7 },
        };
        let json = serde_json::to_value(&body).expect("json");
        assert_eq!(json["model"], "m");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 64);
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_rephrase_error() {
        let rephraser = Rephraser::new(RephraseConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_millis(200),
            ..RephraseConfig::default()
        })
        .expect("client");
        let err = rephraser.generate("hello").await.expect_err("must fail");
        assert!(matches!(err, Error::Rephrase(_)));
    }
}
