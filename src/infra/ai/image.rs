use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, info, warn};

use super::wire::{GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use super::{endpoint, AiError};
use crate::infra::records::Recipe;

pub const IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// 1x1 PNG handed out when no image can be generated.
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn placeholder() -> Self {
        GeneratedImage {
            content_type: "image/png".to_string(),
            bytes: STANDARD.decode(PLACEHOLDER_PNG).unwrap_or_default(),
        }
    }

    /// File extension matching the content type, for naming stored objects.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

pub struct ImageGenerator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ImageGenerator {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        ImageGenerator {
            client,
            url: endpoint(base_url, &format!("models/{IMAGE_MODEL}:generateContent")),
            api_key,
        }
    }

    pub async fn generate_image(&self, recipe: &Recipe) -> GeneratedImage {
        let Some(key) = self.api_key.as_deref() else {
            debug!(title = %recipe.title, "image generator has no key, answering with placeholder");
            return GeneratedImage::placeholder();
        };
        match self.call(key, recipe).await {
            Ok(image) => {
                info!(title = %recipe.title, size = image.bytes.len(), "generated recipe image");
                image
            }
            Err(e) => {
                warn!(
                    title = %recipe.title,
                    error = %e,
                    "image generation failed, answering with placeholder"
                );
                GeneratedImage::placeholder()
            }
        }
    }

    async fn call(&self, key: &str, recipe: &Recipe) -> Result<GeneratedImage, AiError> {
        let request = GenerateContentRequest::prompt(
            build_prompt(recipe),
            GenerationConfig {
                temperature: 0.8,
                max_output_tokens: None,
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        );
        let reply: GenerateContentResponse = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let inline = reply.first_inline_data().ok_or(AiError::Incomplete("image data"))?;
        let bytes = STANDARD.decode(inline.data.trim())?;
        if bytes.is_empty() {
            return Err(AiError::EmptyReply);
        }
        Ok(GeneratedImage {
            content_type: inline.mime_type,
            bytes,
        })
    }
}

fn build_prompt(recipe: &Recipe) -> String {
    let description = if recipe.description.trim().is_empty() {
        "A delicious recipe"
    } else {
        recipe.description.as_str()
    };
    format!(
        "Generate a high-quality, professional food photography image of {title}.

Description: {description}

Style requirements:
- Well-lit, appetizing presentation with clean, modern plating
- Warm, inviting colors and sharp focus on the food
- Minimal, elegant background

The image should make the dish look delicious and appealing, suitable for a recipe app.",
        title = recipe.title,
    )
}
