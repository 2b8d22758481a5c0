//! One generation or refinement cycle: a text call, validation, then an
//! optional best-effort image call.

use std::future::Future;

use forge_core::{InventionOutput, parse_response, response_schema};
use serde_json::Value;

use crate::error::{BackendError, GenerationError};
use crate::image::ImagePayload;
use crate::prompt::build_prompt;

/// Seam between the orchestrator and a hosted model.
pub trait GenerativeBackend: Send + Sync {
    /// Text completion in JSON mode constrained by `schema`.
    fn generate_text(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// `Ok(None)` when the model answered without an image.
    fn generate_image(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Option<ImagePayload>, BackendError>> + Send;
}

pub struct Orchestrator<B> {
    backend: B,
    generate_images: bool,
}

impl<B: GenerativeBackend> Orchestrator<B> {
    pub fn new(backend: B, generate_images: bool) -> Self {
        Self {
            backend,
            generate_images,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fresh invention from `user_prompt`, or a full rewrite of `previous`.
    pub async fn generate(
        &self,
        user_prompt: &str,
        previous: Option<&InventionOutput>,
    ) -> Result<InventionOutput, GenerationError> {
        let prompt = build_prompt(user_prompt, previous.map(|p| p.text.as_str()));
        tracing::info!(
            refine = previous.is_some(),
            prompt_len = prompt.len(),
            "requesting invention"
        );

        let raw = self
            .backend
            .generate_text(&prompt, &response_schema())
            .await
            .map_err(|e| {
                tracing::error!("text generation failed: {e}");
                GenerationError::from(e)
            })?;

        let parsed = parse_response(&raw).map_err(|e| {
            tracing::error!("invalid response from text model: {e}");
            GenerationError::from(e)
        })?;

        let image_url = if self.generate_images && !parsed.image_prompt.trim().is_empty() {
            self.image(&parsed.image_prompt).await
        } else {
            None
        };

        Ok(parsed.into_output(image_url))
    }

    /// Failures here are logged and never surfaced.
    async fn image(&self, prompt: &str) -> Option<String> {
        match self.backend.generate_image(prompt).await {
            Ok(Some(payload)) => Some(payload.to_data_url()),
            Ok(None) => {
                tracing::warn!("no image data found in image model response");
                None
            }
            Err(e) => {
                tracing::warn!("image generation failed: {e}");
                None
            }
        }
    }
}
