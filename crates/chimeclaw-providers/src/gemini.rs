//! Gemini provider — digest text generation via the generativelanguage
//! REST API. The API key travels as a query parameter, per Google's
//! curl examples.

use async_trait::async_trait;
use chimeclaw_core::config::ChimeClawConfig;
use chimeclaw_core::error::{ChimeClawError, Result};
use chimeclaw_core::traits::Provider;
use serde_json::{Value, json};

/// Google Gemini text generation provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &ChimeClawConfig) -> Self {
        Self {
            api_key: config.digest.api_key.clone(),
            model: config.digest.model.clone(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(ChimeClawError::ApiKeyMissing("gemini".into()));
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| ChimeClawError::Generation(format!("gemini connection failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChimeClawError::Generation(format!(
                "gemini API error {status}: {text}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ChimeClawError::Generation(format!("Invalid gemini response: {e}")))?;

        extract_text(&json)
    }
}

/// Pull the generated text out of a generateContent response.
/// Joins all parts of the first candidate.
pub fn extract_text(body: &Value) -> Result<String> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| ChimeClawError::Generation("No candidates in response".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(ChimeClawError::Generation("Empty generation response".into()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "Hello" }, { "text": " world" }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(extract_text(&body).unwrap(), "Hello world");
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let body = json!({ "candidates": [] });
        let err = extract_text(&body).unwrap_err();
        assert!(matches!(err, ChimeClawError::Generation(_)));
    }

    #[test]
    fn test_extract_text_empty_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [] } }]
        });
        let err = extract_text(&body).unwrap_err();
        assert!(matches!(err, ChimeClawError::Generation(_)));
    }

    #[tokio::test]
    async fn test_generate_requires_api_key() {
        let config = ChimeClawConfig::default();
        let provider = GeminiProvider::new(&config);
        let err = provider.generate("hello").await.unwrap_err();
        assert!(matches!(err, ChimeClawError::ApiKeyMissing(_)));
    }
}
