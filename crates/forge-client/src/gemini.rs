//! Gemini `generateContent` over HTTPS.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::BackendError;
use crate::generation::GenerativeBackend;
use crate::image::ImagePayload;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl GenerateResponse {
    fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// All text parts of the first candidate, concatenated.
    pub fn text(&self) -> String {
        self.parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    pub fn inline_image(&self) -> Option<&InlineData> {
        self.parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}

pub fn text_request(prompt: &str, schema: &Value) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema
        }
    })
}

pub fn image_request(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseModalities": ["IMAGE"] }
    })
}

/// `STATUS: message` from a Google API error body, or the raw body.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let error = &value["error"];
    match (error["status"].as_str(), error["message"].as_str()) {
        (Some(status), Some(message)) => format!("{status}: {message}"),
        (None, Some(message)) => message.to_string(),
        _ => body.trim().to_string(),
    }
}

#[derive(Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl GeminiBackend {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.endpoint)
    }

    async fn call(&self, model: &str, body: &Value) -> Result<GenerateResponse, BackendError> {
        tracing::debug!(model, "calling generateContent");
        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::new(Some(status.as_u16()), error_message(&text)));
        }
        serde_json::from_str(&text).map_err(|e| {
            BackendError::new(Some(status.as_u16()), format!("unexpected response body: {e}"))
        })
    }
}

impl GenerativeBackend for GeminiBackend {
    async fn generate_text(&self, prompt: &str, schema: &Value) -> Result<String, BackendError> {
        let response = self.call(&self.text_model, &text_request(prompt, schema)).await?;
        Ok(response.text())
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<ImagePayload>, BackendError> {
        let response = self.call(&self.image_model, &image_request(prompt)).await?;
        let Some(inline) = response.inline_image() else {
            return Ok(None);
        };
        ImagePayload::from_inline(&inline.mime_type, &inline.data)
            .map(Some)
            .map_err(|e| BackendError::new(None, e.to_string()))
    }
}
