use chrono::{Duration, NaiveDate, Utc};
use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, post, put, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::infra::error::{validated, ApiError, ApiResult, NotFoundAs};
use crate::infra::expiration::{
    default_window, expiring_within, ingredients_expiring_soon, recommend_recipes_for_expiring,
    record_waste, summarize_expiration, waste_statistics, DEFAULT_WINDOW_DAYS,
};
use crate::infra::records::{
    collections, DateWindow, ExpirationSettings, ExpirationSummary, ExpiringIngredient, Ingredient,
    Message, Recipe, RecipeRecommendation, WasteLogCreate, WasteLogEntry, WasteStatistics,
    SETTINGS_ID,
};
use crate::infra::store::Gateway;

use super::horizon_days;

pub const MAX_RECOMMENDATIONS: usize = 10;
const DEFAULT_ALERT_DAYS: i64 = 7;
const DEFAULT_LOG_LIMIT: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpirationAlerts {
    pub expiring_ingredients: Vec<ExpiringIngredient>,
}

async fn load_settings(db: &Gateway) -> ApiResult<ExpirationSettings> {
    Ok(db
        .find(collections::EXPIRATION_SETTINGS, SETTINGS_ID)
        .await?
        .unwrap_or_default())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[get("/summary")]
pub async fn summary(db: &State<Gateway>) -> ApiResult<Json<ExpirationSummary>> {
    let settings = load_settings(db).await?;
    let ingredients: Vec<Ingredient> = db.list(collections::INGREDIENTS).await?;
    Ok(Json(summarize_expiration(&ingredients, today(), &settings)))
}

#[get("/alerts?<days>")]
pub async fn alerts(db: &State<Gateway>, days: Option<i64>) -> ApiResult<Json<ExpirationAlerts>> {
    let days = horizon_days(days, DEFAULT_ALERT_DAYS)?;
    let ingredients: Vec<Ingredient> = db.list(collections::INGREDIENTS).await?;
    let recipes: Vec<Recipe> = db.list(collections::RECIPES).await?;
    Ok(Json(ExpirationAlerts {
        expiring_ingredients: expiring_within(&ingredients, &recipes, today(), days),
    }))
}

#[get("/settings")]
pub async fn get_settings(db: &State<Gateway>) -> ApiResult<Json<ExpirationSettings>> {
    Ok(Json(load_settings(db).await?))
}

#[put("/settings", data = "<body>")]
pub async fn put_settings(
    db: &State<Gateway>,
    body: Result<Json<ExpirationSettings>, json::Error<'_>>,
) -> ApiResult<Json<ExpirationSettings>> {
    let settings = validated(body)?;
    db.put(collections::EXPIRATION_SETTINGS, SETTINGS_ID, &settings)
        .await?;
    info!(warning_days = settings.warning_days, "expiration settings saved");
    Ok(Json(settings))
}

#[post("/waste-log", data = "<body>")]
pub async fn log_waste(
    db: &State<Gateway>,
    body: Result<Json<WasteLogCreate>, json::Error<'_>>,
) -> ApiResult<(Status, Json<WasteLogEntry>)> {
    let request = validated(body)?;
    let entry = record_waste(request, Utc::now());
    db.put(collections::WASTE_LOGS, &entry.id, &entry).await?;
    info!(id = %entry.id, ingredient = %entry.ingredient_name, "waste logged");
    Ok((Status::Created, Json(entry)))
}

/// Most recent first.
#[get("/waste-logs?<limit>")]
pub async fn waste_logs(
    db: &State<Gateway>,
    limit: Option<usize>,
) -> ApiResult<Json<Vec<WasteLogEntry>>> {
    let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit must be at least 1".to_string()));
    }
    let mut logs: Vec<WasteLogEntry> = db.list(collections::WASTE_LOGS).await?;
    logs.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
    logs.truncate(limit);
    Ok(Json(logs))
}

#[delete("/waste-log/<id>")]
pub async fn delete_waste_log(db: &State<Gateway>, id: &str) -> ApiResult<Json<Message>> {
    db.delete(collections::WASTE_LOGS, id)
        .await
        .or_not_found("waste log")?;
    Ok(Json(Message::new("Waste log deleted successfully")))
}

fn parse_day(name: &str, value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{name} must be a YYYY-MM-DD date")))
}

/// Missing bounds default to the thirty days ending today (or ending `to`).
fn window_from(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> ApiResult<DateWindow> {
    if from.is_none() && to.is_none() {
        return Ok(default_window(today));
    }
    let end = to.map(|v| parse_day("to", v)).transpose()?.unwrap_or(today);
    let start = from
        .map(|v| parse_day("from", v))
        .transpose()?
        .unwrap_or(end - Duration::days(DEFAULT_WINDOW_DAYS));
    if start > end {
        return Err(ApiError::BadRequest("from must not be after to".to_string()));
    }
    Ok(DateWindow { start, end })
}

#[get("/waste-stats?<from>&<to>")]
pub async fn waste_stats(
    db: &State<Gateway>,
    from: Option<&str>,
    to: Option<&str>,
) -> ApiResult<Json<WasteStatistics>> {
    let window = window_from(from, to, today())?;
    let logs: Vec<WasteLogEntry> = db.list(collections::WASTE_LOGS).await?;
    Ok(Json(waste_statistics(&logs, window)))
}

#[get("/recipe-recommendations")]
pub async fn recipe_recommendations(
    db: &State<Gateway>,
) -> ApiResult<Json<Vec<RecipeRecommendation>>> {
    let settings = load_settings(db).await?;
    let ingredients: Vec<Ingredient> = db.list(collections::INGREDIENTS).await?;
    let expiring = ingredients_expiring_soon(&ingredients, today(), &settings);
    if expiring.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let recipes: Vec<Recipe> = db.list(collections::RECIPES).await?;
    let mut recommendations = recommend_recipes_for_expiring(&expiring, &recipes);
    recommendations.truncate(MAX_RECOMMENDATIONS);
    Ok(Json(recommendations))
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;
    use serde_json::{json, Value};
    use uuid::Uuid;

    use super::*;
    use crate::infra::records::{
        Freshness, IngredientCategory, IngredientCreate, Quantity, RecipeCreate, RecipeIngredient,
        WasteReason,
    };
    use crate::infra::routes::harness::client;

    const BASE: &str = "/api/v1/expiration";

    async fn stock(db: &Gateway, name: &str, expires_in: Option<i64>) {
        let now = Utc::now();
        let ingredient = IngredientCreate {
            name: name.to_string(),
            category: IngredientCategory::Produce,
            quantity: Quantity::new(1.0, "pieces"),
            purchase_date: None,
            expiration_date: expires_in.map(|d| now + Duration::days(d)),
            location: Some("fridge".to_string()),
            notes: None,
        }
        .into_ingredient(Uuid::new_v4().to_string(), now);
        db.put(collections::INGREDIENTS, &ingredient.id, &ingredient)
            .await
            .unwrap();
    }

    async fn save_recipe(db: &Gateway, title: &str, ingredients: &[&str]) -> Recipe {
        let recipe = RecipeCreate {
            title: title.to_string(),
            description: String::new(),
            ingredients: ingredients
                .iter()
                .map(|name| RecipeIngredient {
                    name: name.to_string(),
                    quantity: Quantity::new(1.0, "pieces"),
                })
                .collect(),
            instructions: vec!["cook".to_string()],
            prep_time_minutes: Some(5),
            cook_time_minutes: None,
            servings: 1,
            difficulty: Default::default(),
            cuisine: None,
            tags: Vec::new(),
            tips: Vec::new(),
            nutrition: Default::default(),
        }
        .into_recipe(Uuid::new_v4().to_string(), Utc::now());
        db.put(collections::RECIPES, &recipe.id, &recipe).await.unwrap();
        recipe
    }

    #[rocket::async_test]
    async fn test_expired_item_appears_in_summary() {
        let (client, db) = client().await;
        stock(&db, "bread", Some(-1)).await;
        stock(&db, "rice", Some(90)).await;
        stock(&db, "salt", None).await;

        let summary: ExpirationSummary = client
            .get(format!("{BASE}/summary"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(summary.total_ingredients, 3);
        assert_eq!(summary.expired_count, 1);
        assert_eq!(summary.fresh_count, 1);
        assert_eq!(summary.unknown_count, 1);
        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(summary.alerts[0].ingredient_name, "bread");
        assert_eq!(summary.alerts[0].status, Freshness::Expired);
    }

    #[rocket::async_test]
    async fn test_settings_round_trip_and_affect_summary() {
        let (client, db) = client().await;
        stock(&db, "spinach", Some(5)).await;

        let defaults: ExpirationSettings = client
            .get(format!("{BASE}/settings"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(defaults, ExpirationSettings::default());

        let response = client
            .put(format!("{BASE}/settings"))
            .json(&json!({"warning_days": 6}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let summary: ExpirationSummary = client
            .get(format!("{BASE}/summary"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(summary.expiring_soon_count, 1);

        let response = client
            .put(format!("{BASE}/settings"))
            .json(&json!({"warning_days": 1000}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    #[rocket::async_test]
    async fn test_waste_log_lifecycle() {
        let (client, _) = client().await;
        let response = client
            .post(format!("{BASE}/waste-log"))
            .json(&json!({
                "ingredient_name": "Cheddar cheese",
                "quantity": {"amount": 0.5, "unit": "blocks"},
                "reason": "spoiled",
                "estimated_cost": 3.2
            }))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let entry: WasteLogEntry = response.into_json().await.unwrap();
        assert_eq!(entry.category, IngredientCategory::Dairy);
        assert_eq!(entry.reason, WasteReason::Spoiled);

        let logs: Vec<WasteLogEntry> = client
            .get(format!("{BASE}/waste-logs?limit=5"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(logs, vec![entry.clone()]);

        let stats: WasteStatistics = client
            .get(format!("{BASE}/waste-stats"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_quantity, 0.5);
        assert_eq!(stats.most_wasted_ingredient.as_deref(), Some("Cheddar cheese"));

        let response = client
            .delete(format!("{BASE}/waste-log/{}", entry.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn test_deleting_unknown_waste_log_is_404() {
        let (client, _) = client().await;
        let response = client
            .delete(format!("{BASE}/waste-log/does-not-exist"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "waste log not found");
    }

    #[rocket::async_test]
    async fn test_waste_log_requires_a_name() {
        let (client, _) = client().await;
        let response = client
            .post(format!("{BASE}/waste-log"))
            .json(&json!({"ingredient_name": "", "quantity": {"amount": 1.0, "unit": "kg"}}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    #[rocket::async_test]
    async fn test_waste_stats_rejects_bad_dates() {
        let (client, _) = client().await;
        let response = client
            .get(format!("{BASE}/waste-stats?from=yesterday"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let response = client
            .get(format!("{BASE}/waste-stats?from=2024-05-01&to=2024-04-01"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_alert_horizon_out_of_range_is_400() {
        let (client, db) = client().await;
        stock(&db, "rice", Some(400)).await;
        for days in ["-1", "3651", "200000000", "9223372036854775807"] {
            let response = client
                .get(format!("{BASE}/alerts?days={days}"))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest);
        }
        let alerts: ExpirationAlerts = client
            .get(format!("{BASE}/alerts?days=3650"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(alerts.expiring_ingredients.len(), 1);
        assert_eq!(alerts.expiring_ingredients[0].status, Freshness::Fresh);
    }

    #[test]
    fn test_window_defaults() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let window = window_from(None, None, today).unwrap();
        assert_eq!(window, default_window(today));

        let window = window_from(None, Some("2024-01-31"), today).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let window = window_from(Some("2024-03-01"), None, today).unwrap();
        assert_eq!(window.end, today);
    }

    #[rocket::async_test]
    async fn test_alerts_and_recommendations() {
        let (client, db) = client().await;
        stock(&db, "spinach", Some(1)).await;
        stock(&db, "milk", Some(2)).await;
        stock(&db, "rice", Some(60)).await;
        let both = save_recipe(&db, "Creamed spinach", &["baby spinach", "whole milk"]).await;
        let one = save_recipe(&db, "Spinach salad", &["spinach"]).await;
        save_recipe(&db, "Plain rice", &["rice"]).await;

        let alerts: ExpirationAlerts = client
            .get(format!("{BASE}/alerts"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(alerts.expiring_ingredients.len(), 2);
        assert_eq!(alerts.expiring_ingredients[0].name, "spinach");
        assert_eq!(alerts.expiring_ingredients[0].recommended_recipes.len(), 2);

        let recommendations: Vec<RecipeRecommendation> = client
            .get(format!("{BASE}/recipe-recommendations"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        let ids: Vec<&str> = recommendations.iter().map(|r| r.recipe_id.as_str()).collect();
        assert_eq!(ids, vec![both.id.as_str(), one.id.as_str()]);
        assert_eq!(recommendations[0].urgency_score, 1.0);
    }
}
