//! Adapters for the hosted inference services.
//!
//! Each adapter makes at most one upstream call per operation. Whenever the
//! adapter has no key, or the call or the parsing of its reply fails, it logs
//! a warning and answers with a fixed mock value of the same shape instead.

mod image;
mod recipe;
mod vision;
mod wire;

use thiserror::Error;

pub use image::ImageGenerator;
pub use recipe::RecipeGenerator;
pub use vision::VisionRecognizer;

use super::config::Settings;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reply carried no content")]
    EmptyReply,
    #[error("no JSON {0} found in reply")]
    NoJson(&'static str),
    #[error("could not parse reply: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("could not decode inline data: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("reply is missing {0}")]
    Incomplete(&'static str),
}

/// The three adapters, managed together as Rocket state.
pub struct AiServices {
    pub vision: VisionRecognizer,
    pub recipes: RecipeGenerator,
    pub images: ImageGenerator,
}

impl AiServices {
    pub fn from_settings(settings: &Settings) -> Self {
        let client = reqwest::Client::new();
        AiServices {
            vision: VisionRecognizer::new(
                client.clone(),
                &settings.groq_base_url,
                settings.vision_key(),
            ),
            recipes: RecipeGenerator::new(
                client.clone(),
                &settings.gemini_base_url,
                settings.gemini_key(),
            ),
            images: ImageGenerator::new(client, &settings.gemini_base_url, settings.gemini_key()),
        }
    }

    /// Adapters that never leave the process.
    #[cfg(test)]
    pub fn mock() -> Self {
        let client = reqwest::Client::new();
        AiServices {
            vision: VisionRecognizer::new(client.clone(), "http://127.0.0.1:9", None),
            recipes: RecipeGenerator::new(client.clone(), "http://127.0.0.1:9", None),
            images: ImageGenerator::new(client, "http://127.0.0.1:9", None),
        }
    }
}

/// Slice of `text` from the first `open` to the last `close`, inclusive.
fn extract_json(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_prose() {
        let reply = "Sure! Here is the list:\n```json\n[{\"a\": [1]}]\n```\nEnjoy.";
        assert_eq!(extract_json(reply, '[', ']'), Some("[{\"a\": [1]}]"));
        assert_eq!(extract_json("no json", '{', '}'), None);
        assert_eq!(extract_json("} backwards {", '{', '}'), None);
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://api.groq.com/openai/v1/", "/chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }
}
