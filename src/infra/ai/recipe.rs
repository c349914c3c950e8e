use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::wire::{GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use super::{endpoint, extract_json, AiError};
use crate::infra::expiration::names_match;
use crate::infra::parsing::{leading_number, parse_minutes};
use crate::infra::records::{Difficulty, Quantity, Recipe, RecipeIngredient, UserPreferences};

pub const TEXT_MODEL: &str = "gemini-2.0-flash";

const FALLBACK_CUISINE: &str = "International";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedIngredient {
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default = "one", deserialize_with = "lenient_string")]
    pub amount: String,
    #[serde(default = "piece", deserialize_with = "lenient_string")]
    pub unit: String,
}

/// Recipe as described by the text model, before it becomes a stored [`Recipe`].
/// Missing fields are filled with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecipe {
    #[serde(default = "untitled")]
    pub name: String,
    #[serde(default = "tasty")]
    pub description: String,
    #[serde(default = "fifteen_minutes", deserialize_with = "lenient_string")]
    pub prep_time: String,
    #[serde(default = "thirty_minutes", deserialize_with = "lenient_string")]
    pub cook_time: String,
    #[serde(default = "four", deserialize_with = "lenient_count")]
    pub servings: u32,
    #[serde(default = "medium")]
    pub difficulty: String,
    #[serde(default = "international")]
    pub cuisine: String,
    #[serde(default)]
    pub ingredients: Vec<GeneratedIngredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub nutritional_info: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}
fn one() -> String {
    "1".to_string()
}
fn piece() -> String {
    "piece".to_string()
}
fn untitled() -> String {
    "Untitled Recipe".to_string()
}
fn tasty() -> String {
    "A delicious recipe".to_string()
}
fn fifteen_minutes() -> String {
    "15 minutes".to_string()
}
fn thirty_minutes() -> String {
    "30 minutes".to_string()
}
fn four() -> u32 {
    4
}
fn medium() -> String {
    "medium".to_string()
}
fn international() -> String {
    FALLBACK_CUISINE.to_string()
}

/// Accepts `"2"`, `2` or `2.5` alike.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let text = lenient_string(deserializer)?;
    Ok(leading_number(&text, 4.0).max(1.0) as u32)
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => "0".to_string(),
        other => other.to_string(),
    }
}

impl GeneratedRecipe {
    pub fn into_recipe(self, id: String, now: DateTime<Utc>, available: &[String]) -> Recipe {
        let ingredients: Vec<RecipeIngredient> = self
            .ingredients
            .into_iter()
            .map(|item| RecipeIngredient {
                quantity: Quantity::new(leading_number(&item.amount, 1.0), item.unit),
                name: item.name,
            })
            .collect();
        let score = match_score(&ingredients, available);
        Recipe {
            id,
            title: self.name,
            description: self.description,
            instructions: self.instructions,
            prep_time_minutes: Some(parse_minutes(&self.prep_time)),
            cook_time_minutes: Some(parse_minutes(&self.cook_time)),
            servings: self.servings.max(1),
            difficulty: Difficulty::from_label(&self.difficulty),
            cuisine: Some(self.cuisine),
            tags: self.tags,
            tips: self.tips,
            nutrition: self
                .nutritional_info
                .into_iter()
                .map(|(key, value)| (key, value_text(value)))
                .collect(),
            image_url: None,
            match_score: Some(score),
            cook_count: 0,
            last_cooked: None,
            rating: None,
            ingredients,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Share of the recipe's ingredients found among `available`.
pub fn match_score(ingredients: &[RecipeIngredient], available: &[String]) -> f64 {
    if ingredients.is_empty() {
        return 0.0;
    }
    let matched = ingredients
        .iter()
        .filter(|item| available.iter().any(|name| names_match(&item.name, name)))
        .count();
    matched as f64 / ingredients.len() as f64
}

pub struct RecipeGenerator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl RecipeGenerator {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        RecipeGenerator {
            client,
            url: endpoint(base_url, &format!("models/{TEXT_MODEL}:generateContent")),
            api_key,
        }
    }

    /// Generates one recipe in `cuisine`, or in the first preferred cuisine
    /// when none is given.
    pub async fn generate_recipe(
        &self,
        ingredients: &[String],
        preferences: &UserPreferences,
        cuisine: Option<&str>,
    ) -> GeneratedRecipe {
        let cuisine =
            cuisine.or_else(|| preferences.cuisine_preferences.first().map(String::as_str));
        let Some(key) = self.api_key.as_deref() else {
            debug!("recipe generator has no key, answering with mock recipe");
            return mock_recipe(ingredients, cuisine);
        };
        let prompt = build_prompt(ingredients, preferences, cuisine);
        match self.call(key, prompt).await {
            Ok(recipe) => {
                info!(title = %recipe.name, "generated recipe");
                recipe
            }
            Err(e) => {
                warn!(error = %e, "recipe generation failed, answering with mock recipe");
                mock_recipe(ingredients, cuisine)
            }
        }
    }

    async fn call(&self, key: &str, prompt: String) -> Result<GeneratedRecipe, AiError> {
        let request = GenerateContentRequest::prompt(
            prompt,
            GenerationConfig {
                temperature: 0.7,
                max_output_tokens: Some(2000),
                response_modalities: Vec::new(),
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
        parse_recipe(&reply.text())
    }
}

fn parse_recipe(text: &str) -> Result<GeneratedRecipe, AiError> {
    if text.trim().is_empty() {
        return Err(AiError::EmptyReply);
    }
    let object = extract_json(text, '{', '}').ok_or(AiError::NoJson("object"))?;
    let recipe: GeneratedRecipe = serde_json::from_str(object)?;
    if recipe.ingredients.is_empty() {
        return Err(AiError::Incomplete("ingredients"));
    }
    if recipe.instructions.is_empty() {
        return Err(AiError::Incomplete("instructions"));
    }
    Ok(recipe)
}

fn build_prompt(
    ingredients: &[String],
    preferences: &UserPreferences,
    cuisine: Option<&str>,
) -> String {
    let mut requirements = vec![
        "- Use as many of the provided ingredients as possible".to_string(),
        format!("- Difficulty level: {}", preferences.cooking_time.difficulty_hint()),
        format!("- Cook skill level: {}", preferences.skill_level.as_str()),
    ];
    if !preferences.dietary_restrictions.is_empty() {
        let restrictions: Vec<&str> = preferences
            .dietary_restrictions
            .iter()
            .map(String::as_str)
            .collect();
        requirements.push(format!("- Dietary restrictions: {}", restrictions.join(", ")));
    }
    if !preferences.allergens.is_empty() {
        let allergens: Vec<&str> = preferences.allergens.iter().map(String::as_str).collect();
        requirements.push(format!("- Must not contain: {}", allergens.join(", ")));
    }
    if let Some(cuisine) = cuisine {
        requirements.push(format!("- Cuisine preference: {cuisine}"));
    }

    format!(
        r#"Create a detailed recipe using the following available ingredients: {ingredients}

Requirements:
{requirements}

Return the recipe as a JSON object with this exact structure:
{{
    "name": "Recipe Name",
    "description": "Brief description of the dish",
    "prepTime": "15 minutes",
    "cookTime": "30 minutes",
    "servings": 4,
    "difficulty": "medium",
    "cuisine": "cuisine_type",
    "ingredients": [
        {{"name": "ingredient_name", "amount": "quantity", "unit": "unit_of_measurement"}}
    ],
    "instructions": ["Step 1: Detailed instruction", "Step 2: Detailed instruction"],
    "nutritionalInfo": {{"calories": 350, "protein": "25g", "carbs": "30g", "fat": "15g", "fiber": "5g"}},
    "tags": ["tag1", "tag2"],
    "tips": ["Helpful tip 1", "Helpful tip 2"]
}}

Make sure the recipe is practical, delicious, and uses the ingredients efficiently."#,
        ingredients = ingredients.join(", "),
        requirements = requirements.join("\n"),
    )
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn mock_recipe(ingredients: &[String], cuisine: Option<&str>) -> GeneratedRecipe {
    let primary = ingredients
        .first()
        .map(String::as_str)
        .unwrap_or("mixed ingredients");
    let cuisine = cuisine.unwrap_or(FALLBACK_CUISINE);
    let used: Vec<&str> = if ingredients.is_empty() {
        vec![primary]
    } else {
        ingredients.iter().take(5).map(String::as_str).collect()
    };

    GeneratedRecipe {
        name: format!("Delicious {} Recipe", title_case(primary)),
        description: format!("A wonderful dish featuring {primary} and other fresh ingredients"),
        prep_time: "15 minutes".to_string(),
        cook_time: "25 minutes".to_string(),
        servings: 4,
        difficulty: "medium".to_string(),
        cuisine: cuisine.to_string(),
        ingredients: used
            .into_iter()
            .map(|name| GeneratedIngredient {
                name: name.to_string(),
                amount: "1".to_string(),
                unit: "piece".to_string(),
            })
            .collect(),
        instructions: vec![
            "Prepare all ingredients by washing and chopping as needed.".to_string(),
            format!("Heat a large pan over medium heat and add the {primary}."),
            "Cook for 5-7 minutes until tender.".to_string(),
            "Add remaining ingredients and seasonings.".to_string(),
            "Cook for an additional 15-20 minutes until everything is well combined.".to_string(),
            "Taste and adjust seasoning as needed.".to_string(),
            "Serve hot and enjoy!".to_string(),
        ],
        nutritional_info: [
            ("calories", Value::from(320)),
            ("protein", Value::from("18g")),
            ("carbs", Value::from("35g")),
            ("fat", Value::from("12g")),
            ("fiber", Value::from("6g")),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect(),
        tags: vec![
            "healthy".to_string(),
            "easy".to_string(),
            "quick".to_string(),
            cuisine.to_lowercase(),
        ],
        tips: vec![
            "Make sure to taste and adjust seasoning throughout cooking.".to_string(),
            "This recipe can be easily doubled for larger servings.".to_string(),
            "Store leftovers in the refrigerator for up to 3 days.".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[rocket::async_test]
    async fn test_without_key_answers_with_mock_recipe() {
        let generator = RecipeGenerator::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        let recipe = generator
            .generate_recipe(&names(&["egg", "flour"]), &UserPreferences::default(), None)
            .await;
        assert_eq!(recipe.name, "Delicious Egg Recipe");
        assert!(!recipe.instructions.is_empty());
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.cuisine, "italian");
    }

    #[rocket::async_test]
    async fn test_unreachable_endpoint_answers_with_mock_recipe() {
        let generator = RecipeGenerator::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Some("key".to_string()),
        );
        let preferences = UserPreferences {
            cuisine_preferences: Vec::new(),
            ..Default::default()
        };
        let recipe = generator
            .generate_recipe(&names(&["rice"]), &preferences, None)
            .await;
        assert_eq!(recipe, mock_recipe(&names(&["rice"]), None));
        assert_eq!(recipe.cuisine, "International");
    }

    #[rocket::async_test]
    async fn test_explicit_cuisine_wins_over_preferences() {
        let generator = RecipeGenerator::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        let recipe = generator
            .generate_recipe(&names(&["tofu"]), &UserPreferences::default(), Some("Thai"))
            .await;
        assert_eq!(recipe.cuisine, "Thai");
    }

    #[test]
    fn test_mock_with_no_ingredients_still_has_one() {
        let recipe = mock_recipe(&[], Some("Thai"));
        assert_eq!(recipe.name, "Delicious Mixed Ingredients Recipe");
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.tags.last().map(String::as_str), Some("thai"));
    }

    #[test]
    fn test_parse_recipe_fills_defaults() {
        let reply = r#"```json
        {"name": "Shakshuka", "servings": "2 people",
         "ingredients": [{"name": "egg", "amount": 4}, {"name": "tomato", "amount": "3", "unit": "pieces"}],
         "instructions": ["Simmer", "Crack eggs"],
         "nutritionalInfo": {"calories": 280, "protein": null}}
        ```"#;
        let recipe = parse_recipe(reply).unwrap();
        assert_eq!(recipe.servings, 2);
        assert_eq!(recipe.prep_time, "15 minutes");
        assert_eq!(recipe.cuisine, "International");
        assert_eq!(recipe.ingredients[0].amount, "4");
        assert_eq!(recipe.ingredients[0].unit, "piece");

        let stored = recipe.into_recipe("r1".to_string(), Utc::now(), &names(&["Eggs"]));
        assert_eq!(stored.ingredients[0].quantity, Quantity::new(4.0, "piece"));
        assert_eq!(stored.cook_time_minutes, Some(30));
        assert_eq!(stored.nutrition.get("calories").map(String::as_str), Some("280"));
        assert_eq!(stored.nutrition.get("protein").map(String::as_str), Some("0"));
        assert_eq!(stored.match_score, Some(0.5));
    }

    #[test]
    fn test_parse_recipe_rejects_empty_ingredients() {
        let reply = r#"{"name": "Air", "ingredients": [], "instructions": ["breathe"]}"#;
        assert!(matches!(parse_recipe(reply), Err(AiError::Incomplete("ingredients"))));
    }

    #[test]
    fn test_prompt_mentions_preferences() {
        let mut prefs = UserPreferences::default();
        prefs.allergens.insert("peanuts".to_string());
        prefs.cooking_time = crate::infra::records::CookingTime::Under30;
        let prompt = build_prompt(&names(&["egg"]), &prefs, Some("Mexican"));
        assert!(prompt.contains("available ingredients: egg"));
        assert!(prompt.contains("Difficulty level: easy"));
        assert!(prompt.contains("Must not contain: peanuts"));
        assert!(prompt.contains("Cuisine preference: Mexican"));
    }
}
