//! services/api/src/adapters/vision_llm.rs
//!
//! This module contains the adapter for the image-describing and advice LLM calls.
//! It implements the `EnrichmentService` port from `incident_core`.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ImageDetail, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use incident_core::ports::{EnrichmentService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `EnrichmentService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiEnrichmentAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEnrichmentAdapter {
    /// Creates a new `OpenAiEnrichmentAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    async fn complete(&self, messages: Vec<ChatCompletionRequestMessage>) -> PortResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        first_text(response)
    }
}

/// Encodes an image as a `data:` URL the vision model can read inline.
pub fn image_data_url(image: &[u8], image_name: &str) -> String {
    let mime = mime_guess::from_path(image_name)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());
    format!("data:{};base64,{}", mime, STANDARD.encode(image))
}

/// Extracts the trimmed text of the first choice; blank output counts as a failure.
fn first_text(response: CreateChatCompletionResponse) -> PortResult<String> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        PortError::Unexpected("LLM returned no choices in its response.".to_string())
    })?;
    match choice.message.content.map(|c| c.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(PortError::Unexpected(
            "LLM response contained no text content.".to_string(),
        )),
    }
}

//=========================================================================================
// `EnrichmentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EnrichmentService for OpenAiEnrichmentAdapter {
    /// Sends the prompt together with the photo to a vision-capable model.
    async fn describe(&self, image: &[u8], image_name: &str, prompt: &str) -> PortResult<String> {
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(image_data_url(image, image_name))
                    .detail(ImageDetail::Auto)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            )
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(vec![
                ChatCompletionRequestUserMessageContentPart::Text(text_part),
                ChatCompletionRequestUserMessageContentPart::ImageUrl(image_part),
            ])
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.complete(vec![message.into()]).await
    }

    async fn advise(&self, prompt: &str) -> PortResult<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.complete(vec![message.into()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_uses_image_mime_type() {
        assert_eq!(image_data_url(b"abc", "x.png"), "data:image/png;base64,YWJj");
        assert!(image_data_url(b"abc", "x.JPG").starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn unknown_types_fall_back_to_jpeg() {
        assert!(image_data_url(b"abc", "x").starts_with("data:image/jpeg;"));
        assert!(image_data_url(b"abc", "x.txt").starts_with("data:image/jpeg;"));
    }
}
