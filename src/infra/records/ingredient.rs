use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Quantity;

/// Storage category of a pantry item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientCategory {
    Produce,
    Dairy,
    Protein,
    Grains,
    Spices,
    Other,
}

impl Default for IngredientCategory {
    fn default() -> Self {
        IngredientCategory::Other
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub category: IngredientCategory,
    pub quantity: Quantity,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /ingredients` and one element of the batch update.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct IngredientCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub category: IngredientCategory,
    #[validate(nested)]
    pub quantity: Quantity,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IngredientCreate {
    pub fn into_ingredient(self, id: String, now: DateTime<Utc>) -> Ingredient {
        Ingredient {
            id,
            name: self.name,
            category: self.category,
            quantity: self.quantity,
            purchase_date: self.purchase_date,
            expiration_date: self.expiration_date,
            location: self.location,
            notes: self.notes,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields are left untouched in the stored document.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct IngredientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<IngredientCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub quantity: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BatchUpdateRequest {
    #[validate(nested)]
    pub ingredients: Vec<IngredientCreate>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanRequest {
    /// Base64 image, optionally prefixed with a `data:image/...;base64,` header.
    pub image: String,
}

/// One recognized item as reported back by `POST /ingredients/scan`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScanResult {
    pub id: String,
    pub name: String,
    pub quantity: String,
    pub estimated_expiration: String,
    pub confidence: f64,
}
