use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::config::LanguageModelConfig;

#[derive(Error, Debug)]
pub enum GenAiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Language model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed language model response: {0}")]
    MalformedResponse(String),
    #[error("Could not parse generated text: {0}")]
    Unparseable(String),
}

/// A text-completion backend. Implemented by the Generative Language
/// client; tests substitute canned responses.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenAiError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pulls `candidates[0].content.parts[0].text` out of a `generateContent` body.
pub fn extract_generated_text(body: &str) -> Result<String, GenAiError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| GenAiError::MalformedResponse(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| GenAiError::MalformedResponse("No generated text in response".to_string()))
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    config: LanguageModelConfig,
}

impl GeminiClient {
    pub fn new(api_key: String, config: LanguageModelConfig) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            config,
        }
    }

    fn endpoint(&self) -> Result<Url, GenAiError> {
        let mut url = Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        ))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let generation = &self.config.generation;
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": generation.temperature,
                "topK": generation.top_k,
                "topP": generation.top_p,
                "maxOutputTokens": generation.max_output_tokens,
            }
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenAiError> {
        log::debug!("Requesting completion from model {}", self.config.model);

        let response = self
            .http_client
            .post(self.endpoint()?)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        extract_generated_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}},{"content":{"parts":[{"text":"other"}]}}]}"#;
        assert_eq!(extract_generated_text(body).unwrap(), "hello");
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let result = extract_generated_text(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(matches!(result, Err(GenAiError::MalformedResponse(_))));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let result = extract_generated_text("<html>502</html>");
        assert!(matches!(result, Err(GenAiError::MalformedResponse(_))));
    }

    #[test]
    fn request_carries_generation_parameters() {
        let client = GeminiClient::new("k".into(), LanguageModelConfig::default());
        let body = client.request_body("prompt text");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt text");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn endpoint_embeds_model_and_key() {
        let client = GeminiClient::new("secret".into(), LanguageModelConfig::default());
        let url = client.endpoint().unwrap();
        assert!(url.path().ends_with("/models/gemini-1.5-flash:generateContent"));
        assert_eq!(url.query(), Some("key=secret"));
    }
}
