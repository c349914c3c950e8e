use chrono::{Duration, NaiveDate};

use crate::infra::records::{ExpiringIngredient, Ingredient, Recipe, RecipeRecommendation};

use super::{classify_freshness, days_until};

pub const MAX_RECIPES_PER_ALERT: usize = 5;

/// Longest look-ahead accepted by the expiring/alerts queries.
pub const MAX_HORIZON_DAYS: i64 = 3650;

/// Case-insensitive substring match in either direction.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Looser match for the alerts view: any word of the ingredient name longer
/// than two letters that appears in the recipe ingredient also counts.
fn loosely_matches(ingredient: &str, recipe_ingredient: &str) -> bool {
    if names_match(ingredient, recipe_ingredient) {
        return true;
    }
    let haystack = recipe_ingredient.to_lowercase();
    ingredient
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() > 2)
        .any(|word| haystack.contains(word))
}

fn uses(recipe: &Recipe, ingredient_name: &str, matcher: fn(&str, &str) -> bool) -> bool {
    recipe
        .ingredients
        .iter()
        .any(|item| matcher(ingredient_name, &item.name))
}

pub fn recommend_recipes_for_expiring(
    expiring: &[Ingredient],
    recipes: &[Recipe],
) -> Vec<RecipeRecommendation> {
    if expiring.is_empty() {
        return Vec::new();
    }

    let mut recommendations: Vec<RecipeRecommendation> = recipes
        .iter()
        .filter_map(|recipe| {
            let used: Vec<String> = expiring
                .iter()
                .filter(|ingredient| uses(recipe, &ingredient.name, names_match))
                .map(|ingredient| ingredient.name.clone())
                .collect();
            if used.is_empty() {
                return None;
            }
            Some(RecipeRecommendation {
                recipe_id: recipe.id.clone(),
                recipe_title: recipe.title.clone(),
                urgency_score: used.len() as f64 / expiring.len() as f64,
                expiring_ingredients_used: used,
                prep_time_minutes: recipe.prep_time_minutes,
                created_at: recipe.created_at,
            })
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.expiring_ingredients_used
            .len()
            .cmp(&a.expiring_ingredients_used.len())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    recommendations
}

/// Ingredients expiring on or before `today + horizon_days` (already expired
/// ones included), most urgent first, each with the recipes that use it.
pub fn expiring_within(
    ingredients: &[Ingredient],
    recipes: &[Recipe],
    today: NaiveDate,
    horizon_days: i64,
) -> Vec<ExpiringIngredient> {
    let horizon = Duration::try_days(horizon_days)
        .and_then(|span| today.checked_add_signed(span))
        .unwrap_or(NaiveDate::MAX);
    let mut expiring: Vec<ExpiringIngredient> = ingredients
        .iter()
        .filter_map(|ingredient| {
            let expiration = ingredient.expiration_date?;
            if expiration.date_naive() > horizon {
                return None;
            }
            let recommended_recipes = recipes
                .iter()
                .filter(|recipe| uses(recipe, &ingredient.name, loosely_matches))
                .map(|recipe| recipe.id.clone())
                .take(MAX_RECIPES_PER_ALERT)
                .collect();
            Some(ExpiringIngredient {
                id: ingredient.id.clone(),
                name: ingredient.name.clone(),
                expiration_date: expiration,
                days_until_expiration: days_until(expiration, today),
                status: classify_freshness(expiration.date_naive(), today),
                recommended_recipes,
            })
        })
        .collect();

    expiring.sort_by(|a, b| {
        a.days_until_expiration
            .cmp(&b.days_until_expiration)
            .then_with(|| a.name.cmp(&b.name))
    });
    expiring
}
