use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Every record belongs to this account; the deployment is single-tenant.
pub const DEFAULT_USER_ID: &str = "default_user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookingTime {
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "under30")]
    Under30,
    #[serde(rename = "30to60")]
    From30To60,
    #[serde(rename = "over60")]
    Over60,
}

impl CookingTime {
    /// Difficulty hint handed to the text model.
    pub fn difficulty_hint(self) -> &'static str {
        match self {
            CookingTime::Under30 => "easy",
            CookingTime::Over60 => "hard",
            CookingTime::Any | CookingTime::From30To60 => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserPreferences {
    pub dietary_restrictions: BTreeSet<String>,
    pub allergens: BTreeSet<String>,
    pub cuisine_preferences: Vec<String>,
    pub cooking_time: CookingTime,
    pub skill_level: SkillLevel,
}

impl Default for UserPreferences {
    fn default() -> Self {
        UserPreferences {
            dietary_restrictions: BTreeSet::new(),
            allergens: BTreeSet::new(),
            cuisine_preferences: vec![
                "italian".to_string(),
                "american".to_string(),
                "mexican".to_string(),
            ],
            cooking_time: CookingTime::Any,
            skill_level: SkillLevel::Beginner,
        }
    }
}

impl UserPreferences {
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(v) = patch.dietary_restrictions {
            self.dietary_restrictions = v;
        }
        if let Some(v) = patch.allergens {
            self.allergens = v;
        }
        if let Some(v) = patch.cuisine_preferences {
            self.cuisine_preferences = v;
        }
        if let Some(v) = patch.cooking_time {
            self.cooking_time = v;
        }
        if let Some(v) = patch.skill_level {
            self.skill_level = v;
        }
    }
}

/// Partial preferences, as posted by clients and as stored; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "dietaryRestrictions")]
    pub dietary_restrictions: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergens: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "cuisinePreferences")]
    pub cuisine_preferences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "cookingTime")]
    pub cooking_time: Option<CookingTime>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "skillLevel")]
    pub skill_level: Option<SkillLevel>,
}

impl From<UserPreferences> for PreferencesPatch {
    fn from(p: UserPreferences) -> Self {
        PreferencesPatch {
            dietary_restrictions: Some(p.dietary_restrictions),
            allergens: Some(p.allergens),
            cuisine_preferences: Some(p.cuisine_preferences),
            cooking_time: Some(p.cooking_time),
            skill_level: Some(p.skill_level),
        }
    }
}

/// Document stored under `users/default_user`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserDocument {
    pub user_id: String,
    #[serde(default)]
    pub preferences: PreferencesPatch,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PreferencesResponse {
    pub success: bool,
    pub preferences: UserPreferences,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UserStats {
    pub total_recipes_cooked: usize,
    pub average_rating: Option<f64>,
    pub favorite_cuisine: Option<String>,
    pub last_cooked_date: Option<chrono::DateTime<chrono::Utc>>,
    pub cooking_streak_days: u32,
}
