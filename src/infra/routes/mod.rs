pub mod expiration;
pub mod images;
pub mod ingredients;
pub mod recipes;
pub mod users;

use rocket::serde::json::{json, Json, Value};
use rocket::{get, State};
use serde::{Deserialize, Serialize};

use super::config::Settings;
use super::error::{ApiError, ApiResult};
use super::expiration::MAX_HORIZON_DAYS;

/// Reference to a stored image, as handed back after an upload.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageReference {
    pub image_url: String,
}

/// Checks a `days` look-ahead query parameter, filling in `default`.
pub(crate) fn horizon_days(days: Option<i64>, default: i64) -> ApiResult<i64> {
    let days = days.unwrap_or(default);
    if !(0..=MAX_HORIZON_DAYS).contains(&days) {
        return Err(ApiError::BadRequest(format!(
            "days must be between 0 and {MAX_HORIZON_DAYS}"
        )));
    }
    Ok(days)
}

#[get("/")]
pub fn index(settings: &State<Settings>) -> Json<Value> {
    Json(json!({
        "message": format!("Welcome to {} API", settings.app_name),
        "api_prefix": settings.api_prefix,
    }))
}

#[get("/health")]
pub fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[cfg(test)]
pub(crate) mod harness {
    use std::sync::Arc;

    use rocket::local::asynchronous::Client;

    use crate::infra::ai::AiServices;
    use crate::infra::config::Settings;
    use crate::infra::store::{Gateway, MemoryImages};

    pub fn settings() -> Settings {
        Settings::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            "APP_NAME" => Some("SmartRecipeTest".to_string()),
            _ => None,
        })
    }

    /// Client over in-memory backends and mock AI adapters, plus the store
    /// handle so tests can seed and inspect records directly.
    pub async fn client() -> (Client, Gateway) {
        let gateway = Gateway::in_memory();
        let rocket = crate::infra::build(
            settings(),
            gateway.clone(),
            Arc::new(MemoryImages::default()),
            AiServices::mock(),
        );
        let client = Client::tracked(rocket).await.expect("valid rocket instance");
        (client, gateway)
    }
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use super::harness::client;

    #[rocket::async_test]
    async fn test_root_and_health() {
        let (client, _) = client().await;

        let response = client.get("/").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["message"], "Welcome to SmartRecipeTest API");

        let response = client.get("/health").dispatch().await;
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[rocket::async_test]
    async fn test_unknown_route_is_json_404() {
        let (client, _) = client().await;
        let response = client.get("/api/v1/nothing-here").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "not_found");
    }

    #[rocket::async_test]
    async fn test_cors_headers_and_preflight() {
        let (client, _) = client().await;
        let response = client.options("/api/v1/ingredients").dispatch().await;
        assert_eq!(response.status(), Status::NoContent);
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("*")
        );
    }
}
