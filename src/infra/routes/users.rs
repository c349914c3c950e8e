use chrono::Utc;
use rocket::serde::json::{self, Json};
use rocket::{get, post, put, State};
use tracing::info;

use crate::infra::error::ApiResult;
use crate::infra::expiration::cooking_statistics;
use crate::infra::records::{
    collections, CookingLog, PreferencesPatch, PreferencesResponse, UserDocument, UserPreferences,
    UserStats, DEFAULT_USER_ID,
};
use crate::infra::store::Gateway;

async fn load_document(db: &Gateway) -> ApiResult<UserDocument> {
    let document = db
        .find::<UserDocument>(collections::USERS, DEFAULT_USER_ID)
        .await?
        .unwrap_or_else(|| UserDocument {
            user_id: DEFAULT_USER_ID.to_string(),
            preferences: PreferencesPatch::default(),
        });
    Ok(document)
}

/// Defaults overlaid with whatever the user has stored so far.
pub async fn load_preferences(db: &Gateway) -> ApiResult<UserPreferences> {
    let document = load_document(db).await?;
    let mut preferences = UserPreferences::default();
    preferences.apply(document.preferences);
    Ok(preferences)
}

#[get("/preferences")]
pub async fn get_preferences(db: &State<Gateway>) -> ApiResult<Json<PreferencesResponse>> {
    Ok(Json(PreferencesResponse {
        success: true,
        preferences: load_preferences(db).await?,
    }))
}

async fn save_preferences(db: &Gateway, patch: PreferencesPatch) -> ApiResult<PreferencesResponse> {
    let mut document = load_document(db).await?;
    let mut stored = UserPreferences::default();
    stored.apply(document.preferences);
    stored.apply(patch);
    document.preferences = PreferencesPatch::from(stored.clone());
    db.put(collections::USERS, DEFAULT_USER_ID, &document).await?;
    info!(user = DEFAULT_USER_ID, "preferences saved");
    Ok(PreferencesResponse {
        success: true,
        preferences: stored,
    })
}

#[post("/preferences", data = "<body>")]
pub async fn post_preferences(
    db: &State<Gateway>,
    body: Result<Json<PreferencesPatch>, json::Error<'_>>,
) -> ApiResult<Json<PreferencesResponse>> {
    Ok(Json(save_preferences(db, body?.into_inner()).await?))
}

#[put("/preferences", data = "<body>")]
pub async fn put_preferences(
    db: &State<Gateway>,
    body: Result<Json<PreferencesPatch>, json::Error<'_>>,
) -> ApiResult<Json<PreferencesResponse>> {
    Ok(Json(save_preferences(db, body?.into_inner()).await?))
}

#[get("/stats")]
pub async fn get_stats(db: &State<Gateway>) -> ApiResult<Json<UserStats>> {
    let logs: Vec<CookingLog> = db.list(collections::COOKING_LOGS).await?;
    Ok(Json(cooking_statistics(&logs, Utc::now().date_naive())))
}
