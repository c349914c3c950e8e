use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::wire::{ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl};
use super::{endpoint, extract_json, AiError};

pub const VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

const PROMPT: &str = r#"Analyze this image of a fridge or pantry and identify all visible food ingredients.
For each ingredient, provide:
1. Name of the ingredient
2. Estimated quantity (e.g., "2 apples", "1 bottle", "half container")
3. Estimated expiration date (relative to today, e.g., "3 days", "1 week", "2 weeks")
4. Confidence score (0.0 to 1.0)

Return the results as a JSON array with this exact structure:
[
    {
        "name": "ingredient_name",
        "quantity": "estimated_quantity",
        "estimatedExpiration": "relative_time",
        "confidence": 0.85
    }
]

Only include ingredients you can clearly identify. If you're unsure about an item, either exclude it or give it a lower confidence score."#;

/// One item the vision model believes it saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedIngredient {
    pub name: String,
    /// Free text such as "2 apples" or "half container".
    pub quantity: String,
    /// Relative shelf life such as "3 days".
    #[serde(alias = "estimatedExpiration")]
    pub estimated_expiration: String,
    pub confidence: f64,
}

pub struct VisionRecognizer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl VisionRecognizer {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        VisionRecognizer {
            client,
            url: endpoint(base_url, "chat/completions"),
            api_key,
        }
    }

    pub async fn recognize(&self, image: &[u8]) -> Vec<ScannedIngredient> {
        let Some(key) = self.api_key.as_deref() else {
            debug!("vision recognizer has no key, answering with mock items");
            return mock_scan();
        };
        match self.call(key, image).await {
            Ok(items) => {
                info!(count = items.len(), "recognized ingredients");
                items
            }
            Err(e) => {
                warn!(error = %e, "ingredient recognition failed, answering with mock items");
                mock_scan()
            }
        }
    }

    async fn call(&self, key: &str, image: &[u8]) -> Result<Vec<ScannedIngredient>, AiError> {
        let request = ChatRequest {
            model: VISION_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{}", STANDARD.encode(image)),
                        },
                    },
                ],
            }],
            max_tokens: 1000,
            temperature: 0.1,
        };
        let reply: ChatResponse = self
            .client
            .post(&self.url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let text = reply.into_text().ok_or(AiError::EmptyReply)?;
        parse_items(&text)
    }
}

/// Items missing a field or carrying a blank name are dropped rather than
/// failing the whole reply.
fn parse_items(text: &str) -> Result<Vec<ScannedIngredient>, AiError> {
    let array = extract_json(text, '[', ']').ok_or(AiError::NoJson("array"))?;
    let values: Vec<Value> = serde_json::from_str(array)?;
    Ok(values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ScannedIngredient>(value).ok())
        .filter_map(|mut item| {
            item.name = item.name.trim().to_string();
            (!item.name.is_empty()).then_some(item)
        })
        .collect())
}

fn mock_scan() -> Vec<ScannedIngredient> {
    [
        ("Apples", "3 pieces", "1 week", 0.9),
        ("Milk", "1 carton", "3 days", 0.85),
        ("Eggs", "6 pieces", "1 week", 0.95),
        ("Bread", "1 loaf", "2 days", 0.8),
        ("Cheese", "1 block", "2 weeks", 0.75),
    ]
    .into_iter()
    .map(|(name, quantity, expiration, confidence)| ScannedIngredient {
        name: name.to_string(),
        quantity: quantity.to_string(),
        estimated_expiration: expiration.to_string(),
        confidence,
    })
    .collect()
}
