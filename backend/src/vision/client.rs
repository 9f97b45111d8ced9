use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::config::VisionConfig;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Vision API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed vision response: {0}")]
    MalformedResponse(String),
    #[error("Vision API error {code}: {message}")]
    Api { code: i32, message: String },
}

/// Text and labels detected in one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionAnnotations {
    /// Full detected text (the first text annotation), if any.
    pub text: Option<String>,
    pub labels: Vec<String>,
}

#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    async fn annotate(&self, image_base64: &str) -> Result<VisionAnnotations, VisionError>;
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    label_annotations: Vec<EntityAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

pub fn parse_annotate_response(body: &str) -> Result<VisionAnnotations, VisionError> {
    let response: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| VisionError::MalformedResponse(e.to_string()))?;

    let image = response
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| VisionError::MalformedResponse("Empty responses array".to_string()))?;

    if let Some(status) = image.error {
        return Err(VisionError::Api {
            code: status.code,
            message: status.message,
        });
    }

    let text = image
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description);

    let labels = image
        .label_annotations
        .into_iter()
        .map(|annotation| annotation.description)
        .filter(|label| !label.is_empty())
        .collect();

    Ok(VisionAnnotations { text, labels })
}

#[derive(Clone)]
pub struct CloudVisionClient {
    http_client: HttpClient,
    api_key: String,
    config: VisionConfig,
}

impl CloudVisionClient {
    pub fn new(api_key: String, config: VisionConfig) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            config,
        }
    }

    fn endpoint(&self) -> Result<Url, VisionError> {
        let mut url = Url::parse(&format!(
            "{}/v1/images:annotate",
            self.config.base_url.trim_end_matches('/')
        ))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    fn request_body(&self, image_base64: &str) -> serde_json::Value {
        json!({
            "requests": [{
                "image": { "content": image_base64 },
                "features": [
                    { "type": "TEXT_DETECTION", "maxResults": self.config.max_results },
                    { "type": "LABEL_DETECTION", "maxResults": self.config.max_results },
                ]
            }]
        })
    }
}

#[async_trait]
impl ImageAnnotator for CloudVisionClient {
    async fn annotate(&self, image_base64: &str) -> Result<VisionAnnotations, VisionError> {
        log::debug!("Sending {} base64 bytes to the vision API", image_base64.len());

        let response = self
            .http_client
            .post(self.endpoint()?)
            .json(&self.request_body(image_base64))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_annotate_response(&body)
    }
}
