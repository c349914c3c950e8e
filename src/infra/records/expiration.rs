use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{IngredientCategory, Quantity};

pub const DEFAULT_WARNING_DAYS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    ExpiringSoon,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteReason {
    Expired,
    Spoiled,
    Surplus,
    Other,
}

impl Default for WasteReason {
    fn default() -> Self {
        WasteReason::Expired
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct ExpirationSettings {
    #[serde(default = "default_warning_days")]
    #[validate(range(max = 365, message = "warning_days must be at most 365"))]
    pub warning_days: u32,
    /// Per-category overrides of `warning_days`.
    #[serde(default)]
    pub category_thresholds: BTreeMap<IngredientCategory, u32>,
    #[serde(default = "enabled")]
    pub enable_notifications: bool,
    #[serde(default = "enabled")]
    pub auto_suggest_recipes: bool,
}

fn default_warning_days() -> u32 {
    DEFAULT_WARNING_DAYS
}

fn enabled() -> bool {
    true
}

impl Default for ExpirationSettings {
    fn default() -> Self {
        ExpirationSettings {
            warning_days: DEFAULT_WARNING_DAYS,
            category_thresholds: BTreeMap::new(),
            enable_notifications: true,
            auto_suggest_recipes: true,
        }
    }
}

impl ExpirationSettings {
    pub fn threshold_for(&self, category: IngredientCategory) -> i64 {
        i64::from(
            self.category_thresholds
                .get(&category)
                .copied()
                .unwrap_or(self.warning_days),
        )
    }
}

/// An ingredient that is expired or within its alert threshold.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExpirationAlert {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub category: IngredientCategory,
    pub expiration_date: NaiveDate,
    pub days_until_expiration: i64,
    pub status: Freshness,
    pub quantity: Quantity,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExpirationSummary {
    pub total_ingredients: usize,
    pub fresh_count: usize,
    pub expiring_soon_count: usize,
    pub expired_count: usize,
    pub unknown_count: usize,
    pub alerts: Vec<ExpirationAlert>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExpiringIngredient {
    pub id: String,
    pub name: String,
    pub expiration_date: DateTime<Utc>,
    pub days_until_expiration: i64,
    /// Classified against the default three-day threshold.
    pub status: Freshness,
    pub recommended_recipes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecipeRecommendation {
    pub recipe_id: String,
    pub recipe_title: String,
    pub expiring_ingredients_used: Vec<String>,
    pub urgency_score: f64,
    pub prep_time_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WasteLogEntry {
    pub id: String,
    pub ingredient_name: String,
    pub category: IngredientCategory,
    pub quantity: Quantity,
    #[serde(default)]
    pub reason: WasteReason,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct WasteLogCreate {
    #[validate(length(min = 1, message = "ingredient_name must not be empty"))]
    pub ingredient_name: String,
    #[serde(default)]
    pub category: Option<IngredientCategory>,
    #[validate(nested)]
    pub quantity: Quantity,
    #[serde(default)]
    pub reason: WasteReason,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "estimated_cost must not be negative"))]
    pub estimated_cost: Option<f64>,
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonthlyWaste {
    pub month: String,
    pub entries: usize,
    pub quantity: f64,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WasteStatistics {
    pub window: DateWindow,
    pub total_entries: usize,
    pub total_quantity: f64,
    pub by_category: BTreeMap<IngredientCategory, f64>,
    pub by_reason: BTreeMap<WasteReason, usize>,
    pub total_estimated_cost: f64,
    pub most_wasted_ingredient: Option<String>,
    pub monthly: Vec<MonthlyWaste>,
}
