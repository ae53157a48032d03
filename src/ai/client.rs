//! # AI Provider Client
//!
//! HTTP client for the external OpenAI-compatible provider. Two calls are
//! used: multipart `POST {base}/audio/transcriptions` for speech-to-text and
//! JSON `POST {base}/chat/completions` for text generation. Any provider that
//! speaks this wire format works (OpenAI, Groq, LM Studio, vLLM, …); nothing
//! is hardcoded beyond the paths.

use crate::config::ProviderConfig;
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Client handle for the configured AI provider.
///
/// Constructed once at startup (only when a usable API key is present) and
/// shared read-only by every connection and request handler.
pub struct ProviderClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl ProviderClient {
    /// Build a client from provider configuration.
    ///
    /// The underlying HTTP client carries the per-request timeout from
    /// `config.timeout_secs` and is reused across all calls.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build provider HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Transcribe a WAV payload, returning the trimmed transcript text.
    ///
    /// An empty string is a valid result (silence, noise); the caller decides
    /// whether to forward it. Network and API failures come back as errors
    /// and are expected to be logged and dropped by the caller.
    pub async fn transcribe(&self, wav_bytes: Vec<u8>) -> Result<String> {
        let payload_len = wav_bytes.len();

        // The file part needs a name and mime type for the provider to
        // detect the container format.
        let file = Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .context("invalid mime type for audio part")?;

        let form = Form::new()
            .part("file", file)
            .text("model", self.config.transcription_model.clone())
            .text("language", "en");

        debug!(
            model = %self.config.transcription_model,
            payload_bytes = payload_len,
            "Sending transcription request"
        );

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .context("transcription request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("transcription API returned {}: {}", status, body);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("failed to parse transcription response")?;

        let text = body["text"].as_str().unwrap_or_default().trim().to_string();
        Ok(text)
    }

    /// Run a single-message chat completion and return the reply text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.generation_model,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        debug!(model = %self.config.generation_model, "Sending generation request");

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("generation request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("generation API returned {}: {}", status, body);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("failed to parse generation response")?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            anyhow::bail!("generation API returned an empty response");
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            api_key: "sk-test-1234".to_string(),
            base_url: "https://api.example.com/v1".to_string(),
            transcription_model: "whisper-1".to_string(),
            generation_model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = ProviderClient::new(test_config()).unwrap();
        assert_eq!(
            client.endpoint("audio/transcriptions"),
            "https://api.example.com/v1/audio/transcriptions"
        );
    }

    #[test]
    fn test_endpoint_handles_trailing_slash() {
        let mut config = test_config();
        config.base_url = "https://api.example.com/v1/".to_string();
        let client = ProviderClient::new(config).unwrap();
        assert_eq!(
            client.endpoint("chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }
}
