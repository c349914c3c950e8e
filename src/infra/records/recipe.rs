use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Quantity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl Difficulty {
    /// Lenient parse for free text coming back from the text model.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct RecipeIngredient {
    #[validate(length(min = 1, message = "ingredient name must not be empty"))]
    pub name: String,
    #[validate(nested)]
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub prep_time_minutes: Option<u32>,
    #[serde(default)]
    pub cook_time_minutes: Option<u32>,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub nutrition: BTreeMap<String, String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub cook_count: u32,
    #[serde(default)]
    pub last_cooked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rating: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_servings() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RecipeCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "a recipe needs at least one ingredient"), nested)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub prep_time_minutes: Option<u32>,
    #[serde(default)]
    pub cook_time_minutes: Option<u32>,
    #[serde(default = "default_servings")]
    #[validate(range(min = 1, message = "servings must be at least 1"))]
    pub servings: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub nutrition: BTreeMap<String, String>,
}

impl RecipeCreate {
    pub fn into_recipe(self, id: String, now: DateTime<Utc>) -> Recipe {
        Recipe {
            id,
            title: self.title,
            description: self.description,
            ingredients: self.ingredients,
            instructions: self.instructions,
            prep_time_minutes: self.prep_time_minutes,
            cook_time_minutes: self.cook_time_minutes,
            servings: self.servings,
            difficulty: self.difficulty,
            cuisine: self.cuisine,
            tags: self.tags,
            tips: self.tips,
            nutrition: self.nutrition,
            image_url: None,
            match_score: None,
            cook_count: 0,
            last_cooked: None,
            rating: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct RecipeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "a recipe needs at least one ingredient"), nested)]
    pub ingredients: Option<Vec<RecipeIngredient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "servings must be at least 1"))]
    pub servings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1.0, max = 5.0, message = "rating must be between 1 and 5"))]
    pub rating: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerateRecipesRequest {
    #[serde(default, alias = "mustUseIngredients")]
    pub must_use_ingredients: Vec<String>,
    #[serde(default, alias = "preferenceOverrides")]
    pub preference_overrides: Option<super::PreferencesPatch>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CookRequest {
    #[validate(range(min = 1.0, max = 5.0, message = "rating must be between 1 and 5"))]
    pub rating: Option<f32>,
    pub notes: Option<String>,
}

/// Amount removed from one inventory item when a recipe is cooked.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InventoryDeduction {
    pub name: String,
    pub previous_amount: f64,
    pub new_amount: f64,
    pub used: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CookingLog {
    pub id: String,
    pub recipe_id: String,
    pub recipe_title: String,
    #[serde(default)]
    pub cuisine: Option<String>,
    pub cooked_at: DateTime<Utc>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub ingredients_used: Vec<InventoryDeduction>,
}
