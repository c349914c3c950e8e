use std::env;

use tracing::{info, warn};

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub api_prefix: String,
    pub debug: bool,
    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub storage_bucket: String,
    /// Live AI calls are only made when this is on and the matching key is set.
    pub ai_live: bool,
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub groq_base_url: String,
    pub gemini_base_url: String,
}

impl Settings {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Self {
        if let Err(e) = dotenv::dotenv() {
            info!("no .env file loaded: {e}");
        }
        Settings::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let flag = |key: &str, default: bool| match lookup(key) {
            Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => default,
        };
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend = match string("STORE_BACKEND", "mongo").to_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "mongo" | "mongodb" => StoreBackend::Mongo,
            other => {
                warn!("unknown STORE_BACKEND {other}, using mongo");
                StoreBackend::Mongo
            }
        };

        let mut api_prefix = string("API_PREFIX", "/api/v1");
        if !api_prefix.starts_with('/') {
            api_prefix.insert(0, '/');
        }
        while api_prefix.len() > 1 && api_prefix.ends_with('/') {
            api_prefix.pop();
        }

        Settings {
            app_name: string("APP_NAME", "SmartRecipeApp"),
            api_prefix,
            debug: flag("DEBUG", true),
            store_backend,
            mongodb_uri: string("MONGODB_URI", DEFAULT_MONGODB_URI),
            mongodb_database: string("MONGODB_DATABASE", "smart_recipe"),
            storage_bucket: string("STORAGE_BUCKET", "images"),
            ai_live: flag("AI_LIVE", false),
            groq_api_key: secret("GROQ_API_KEY"),
            gemini_api_key: secret("GEMINI_API_KEY"),
            groq_base_url: string("GROQ_BASE_URL", GROQ_BASE_URL),
            gemini_base_url: string("GEMINI_BASE_URL", GEMINI_BASE_URL),
        }
    }

    /// Key handed to the vision adapter; `None` routes it to the mock.
    pub fn vision_key(&self) -> Option<String> {
        self.groq_api_key.clone().filter(|_| self.ai_live)
    }

    /// Key handed to both Gemini adapters; `None` routes them to the mock.
    pub fn gemini_key(&self) -> Option<String> {
        self.gemini_api_key.clone().filter(|_| self.ai_live)
    }

    /// Public path under which a stored image can be fetched back.
    pub fn image_url(&self, object_id: &str) -> String {
        format!("{}/images/{}", self.api_prefix, object_id)
    }

    pub fn route(&self, resource: &str) -> String {
        if self.api_prefix == "/" {
            format!("/{resource}")
        } else {
            format!("{}/{resource}", self.api_prefix)
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug,hyper=info,mongodb=info,rustls=info"
        } else {
            "info"
        }
    }
}
