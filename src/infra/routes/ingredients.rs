use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Duration, Utc};
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::tokio::io::AsyncReadExt;
use rocket::{delete, get, post, put, FromForm, State};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{horizon_days, ImageReference};
use crate::infra::ai::AiServices;
use crate::infra::config::Settings;
use crate::infra::error::{validated, ApiError, ApiResult, NotFoundAs};
use crate::infra::expiration::SOON_THRESHOLD_DAYS;
use crate::infra::parsing::{guess_category, parse_quantity, parse_shelf_life_days};
use crate::infra::records::{
    collections, BatchUpdateRequest, Ingredient, IngredientCreate, IngredientUpdate, Message,
    Quantity, ScanRequest, ScanResult, Stamped,
};
use crate::infra::store::{Gateway, ImageBucket};

#[derive(Debug, Serialize, Deserialize)]
pub struct IngredientList {
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub ingredients: Vec<ScanResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchUpdateResponse {
    pub success: bool,
    pub updated_ingredient_ids: Vec<String>,
    pub message: String,
}

#[derive(FromForm)]
pub struct ImageUpload<'r> {
    pub file: TempFile<'r>,
}

#[derive(Serialize)]
struct QuantityPatch<'a> {
    quantity: &'a Quantity,
}

#[derive(Serialize)]
struct ImagePatch<'a> {
    image_url: &'a str,
}

#[get("/")]
pub async fn list_ingredients(db: &State<Gateway>) -> ApiResult<Json<IngredientList>> {
    let mut ingredients: Vec<Ingredient> = db.list(collections::INGREDIENTS).await?;
    ingredients.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(Json(IngredientList { ingredients }))
}

#[post("/", data = "<body>")]
pub async fn create_ingredient(
    db: &State<Gateway>,
    body: Result<Json<IngredientCreate>, json::Error<'_>>,
) -> ApiResult<(Status, Json<Ingredient>)> {
    let create = validated(body)?;
    let ingredient = create.into_ingredient(Uuid::new_v4().to_string(), Utc::now());
    db.put(collections::INGREDIENTS, &ingredient.id, &ingredient)
        .await?;
    info!(id = %ingredient.id, name = %ingredient.name, "created ingredient");
    Ok((Status::Created, Json(ingredient)))
}

#[get("/<id>")]
pub async fn get_ingredient(db: &State<Gateway>, id: &str) -> ApiResult<Json<Ingredient>> {
    let ingredient = db
        .get(collections::INGREDIENTS, id)
        .await
        .or_not_found("ingredient")?;
    Ok(Json(ingredient))
}

#[put("/<id>", data = "<body>")]
pub async fn update_ingredient(
    db: &State<Gateway>,
    id: &str,
    body: Result<Json<IngredientUpdate>, json::Error<'_>>,
) -> ApiResult<Json<Ingredient>> {
    let patch = validated(body)?;
    db.update(collections::INGREDIENTS, id, &Stamped::new(&patch, Utc::now()))
        .await
        .or_not_found("ingredient")?;
    let ingredient = db
        .get(collections::INGREDIENTS, id)
        .await
        .or_not_found("ingredient")?;
    Ok(Json(ingredient))
}

#[delete("/<id>")]
pub async fn delete_ingredient(db: &State<Gateway>, id: &str) -> ApiResult<Json<Message>> {
    db.delete(collections::INGREDIENTS, id)
        .await
        .or_not_found("ingredient")?;
    Ok(Json(Message::new("Ingredient deleted successfully")))
}

/// Accepts raw base64 or a `data:image/...;base64,` URL.
fn decode_image(payload: &str) -> ApiResult<Vec<u8>> {
    let encoded = match payload.split_once(";base64,") {
        Some((_, data)) => data,
        None => payload,
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::BadRequest(format!("image is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("image is empty".to_string()));
    }
    Ok(bytes)
}

#[post("/scan", data = "<body>")]
pub async fn scan_ingredients(
    db: &State<Gateway>,
    ai: &State<AiServices>,
    body: Result<Json<ScanRequest>, json::Error<'_>>,
) -> ApiResult<Json<ScanResponse>> {
    let image = decode_image(&body?.image)?;
    let recognized = ai.vision.recognize(&image).await;
    let now = Utc::now();

    let mut results = Vec::with_capacity(recognized.len());
    for item in recognized {
        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            category: guess_category(&item.name),
            quantity: parse_quantity(&item.quantity),
            purchase_date: Some(now),
            expiration_date: Some(
                now + Duration::days(parse_shelf_life_days(&item.estimated_expiration)),
            ),
            location: None,
            notes: Some(format!("Scanned with {:.0}% confidence", item.confidence * 100.0)),
            image_url: None,
            created_at: now,
            updated_at: now,
            name: item.name.clone(),
        };
        db.put(collections::INGREDIENTS, &ingredient.id, &ingredient)
            .await?;
        results.push(ScanResult {
            id: ingredient.id,
            name: item.name,
            quantity: item.quantity,
            estimated_expiration: item.estimated_expiration,
            confidence: item.confidence,
        });
    }
    info!(count = results.len(), "stored scanned ingredients");
    Ok(Json(ScanResponse { ingredients: results }))
}

/// Upserts by exact name. Matching items get the new fields and the posted
/// amount added to what is already stored.
#[post("/update", data = "<body>")]
pub async fn batch_update_ingredients(
    db: &State<Gateway>,
    body: Result<Json<BatchUpdateRequest>, json::Error<'_>>,
) -> ApiResult<Json<BatchUpdateResponse>> {
    let request = validated(body)?;
    let now = Utc::now();
    let mut updated_ingredient_ids = Vec::with_capacity(request.ingredients.len());

    for item in request.ingredients {
        let existing: Vec<Ingredient> = db
            .query(collections::INGREDIENTS, "name", item.name.as_str())
            .await?;
        let ingredient = match existing.into_iter().next() {
            Some(current) => {
                let mut merged = item.into_ingredient(current.id.clone(), current.created_at);
                merged.quantity.amount += current.quantity.amount;
                merged.purchase_date = merged.purchase_date.or(current.purchase_date);
                merged.expiration_date = merged.expiration_date.or(current.expiration_date);
                merged.location = merged.location.or(current.location);
                merged.notes = merged.notes.or(current.notes);
                merged.image_url = current.image_url;
                merged.updated_at = now;
                merged
            }
            None => item.into_ingredient(Uuid::new_v4().to_string(), now),
        };
        db.put(collections::INGREDIENTS, &ingredient.id, &ingredient)
            .await?;
        updated_ingredient_ids.push(ingredient.id);
    }

    Ok(Json(BatchUpdateResponse {
        success: true,
        message: format!(
            "Successfully processed {} ingredients",
            updated_ingredient_ids.len()
        ),
        updated_ingredient_ids,
    }))
}

/// Reads an uploaded file fully and checks that it is an image.
pub(crate) async fn read_image_upload(file: &TempFile<'_>) -> ApiResult<(Vec<u8>, String, String)> {
    let content_type = file
        .content_type()
        .map(|ct| ct.to_string())
        .or_else(|| {
            file.raw_name()
                .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str())
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(ApiError::BadRequest("file must be an image".to_string()));
    }
    let extension = content_type
        .trim_start_matches("image/")
        .split(';')
        .next()
        .unwrap_or("img")
        .to_string();

    let mut bytes = Vec::with_capacity(file.len() as usize);
    let mut reader = Box::pin(
        file.open()
            .await
            .map_err(|e| ApiError::BadRequest(format!("could not read upload: {e}")))?,
    );
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| ApiError::BadRequest(format!("could not read upload: {e}")))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("file is empty".to_string()));
    }
    Ok((bytes, content_type, extension))
}

#[post("/<id>/image", data = "<upload>")]
pub async fn upload_ingredient_image(
    db: &State<Gateway>,
    images: &State<Arc<dyn ImageBucket>>,
    settings: &State<Settings>,
    id: &str,
    upload: Form<ImageUpload<'_>>,
) -> ApiResult<Json<ImageReference>> {
    db.get::<Ingredient>(collections::INGREDIENTS, id)
        .await
        .or_not_found("ingredient")?;
    let (bytes, content_type, extension) = read_image_upload(&upload.file).await?;
    let object_id = images
        .upload(
            &format!("ingredients/{id}"),
            &format!("{}.{extension}", Uuid::new_v4()),
            &content_type,
            bytes,
        )
        .await?;
    let image_url = settings.image_url(&object_id);
    db.update(
        collections::INGREDIENTS,
        id,
        &Stamped::new(&ImagePatch { image_url: &image_url }, Utc::now()),
    )
    .await
    .or_not_found("ingredient")?;
    Ok(Json(ImageReference { image_url }))
}

/// Ingredients whose expiration day is no later than `days` from today,
/// already expired ones included, soonest first.
#[get("/expiring?<days>")]
pub async fn expiring_ingredients(
    db: &State<Gateway>,
    days: Option<i64>,
) -> ApiResult<Json<IngredientList>> {
    let days = horizon_days(days, SOON_THRESHOLD_DAYS)?;
    let cutoff = Utc::now().date_naive() + Duration::days(days);
    let mut ingredients: Vec<Ingredient> = db
        .list::<Ingredient>(collections::INGREDIENTS)
        .await?
        .into_iter()
        .filter(|i| i.expiration_date.is_some_and(|exp| exp.date_naive() <= cutoff))
        .collect();
    ingredients.sort_by_key(|i| i.expiration_date);
    Ok(Json(IngredientList { ingredients }))
}

/// Writes the amount left after cooking back to one inventory item.
pub(crate) async fn store_quantity(db: &Gateway, ingredient: &Ingredient) -> ApiResult<()> {
    db.update(
        collections::INGREDIENTS,
        &ingredient.id,
        &Stamped::new(
            &QuantityPatch {
                quantity: &ingredient.quantity,
            },
            Utc::now(),
        ),
    )
    .await
    .or_not_found("ingredient")
}

#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    use super::*;
    use crate::infra::records::IngredientCategory;
    use crate::infra::routes::harness::client;

    const BASE: &str = "/api/v1/ingredients";

    fn milk() -> Value {
        json!({
            "name": "Milk",
            "category": "dairy",
            "quantity": {"amount": 1.0, "unit": "cartons"},
            "expiration_date": "2030-01-05T00:00:00Z",
            "location": "fridge"
        })
    }

    #[rocket::async_test]
    async fn test_create_then_fetch_round_trips() {
        let (client, _) = client().await;
        let response = client.post(BASE).json(&milk()).dispatch().await;
        assert_eq!(response.status(), Status::Created);
        let created: Ingredient = response.into_json().await.unwrap();
        assert_eq!(created.category, IngredientCategory::Dairy);

        let response = client.get(format!("{BASE}/{}", created.id)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let fetched: Ingredient = response.into_json().await.unwrap();
        assert_eq!(fetched, created);

        let list: IngredientList = client.get(BASE).dispatch().await.into_json().await.unwrap();
        assert_eq!(list.ingredients.len(), 1);
    }

    #[rocket::async_test]
    async fn test_create_rejects_bad_bodies() {
        let (client, _) = client().await;

        let mut body = milk();
        body["category"] = json!("fruit");
        let response = client.post(BASE).json(&body).dispatch().await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error["error"], "malformed_body");

        let mut body = milk();
        body["quantity"]["amount"] = json!(-2.0);
        let response = client.post(BASE).json(&body).dispatch().await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error["error"], "validation_failed");
        assert!(error["details"].get("quantity").is_some());
    }

    #[rocket::async_test]
    async fn test_partial_update_and_delete() {
        let (client, _) = client().await;
        let created: Ingredient = client
            .post(BASE)
            .json(&milk())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();

        let response = client
            .put(format!("{BASE}/{}", created.id))
            .json(&json!({"notes": "half left"}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let updated: Ingredient = response.into_json().await.unwrap();
        assert_eq!(updated.notes.as_deref(), Some("half left"));
        assert_eq!(updated.location.as_deref(), Some("fridge"));
        assert!(updated.updated_at >= created.updated_at);

        let response = client.put(format!("{BASE}/missing")).json(&json!({})).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client.delete(format!("{BASE}/{}", created.id)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let response = client.delete(format!("{BASE}/{}", created.id)).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error["message"], "ingredient not found");
    }

    #[rocket::async_test]
    async fn test_scan_stores_mock_items() {
        let (client, db) = client().await;
        let response = client
            .post(format!("{BASE}/scan"))
            .json(&json!({"image": format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpeg"))}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let scan: ScanResponse = response.into_json().await.unwrap();
        assert_eq!(scan.ingredients.len(), 5);

        let stored: Vec<Ingredient> = db.list(collections::INGREDIENTS).await.unwrap();
        assert_eq!(stored.len(), 5);
        let milk = stored.iter().find(|i| i.name == "Milk").unwrap();
        assert_eq!(milk.category, IngredientCategory::Dairy);
        assert_eq!(milk.quantity, Quantity::new(1.0, "cartons"));
        let days = (milk.expiration_date.unwrap() - milk.created_at).num_days();
        assert_eq!(days, 3);
    }

    #[rocket::async_test]
    async fn test_scan_rejects_bad_base64() {
        let (client, _) = client().await;
        let response = client
            .post(format!("{BASE}/scan"))
            .json(&json!({"image": "%%% not base64 %%%"}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_batch_update_adds_to_existing_quantity() {
        let (client, db) = client().await;
        let created: Ingredient = client
            .post(BASE)
            .json(&milk())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();

        let response = client
            .post(format!("{BASE}/update"))
            .json(&json!({"ingredients": [
                {"name": "Milk", "category": "dairy", "quantity": {"amount": 2.0, "unit": "cartons"}},
                {"name": "Rice", "category": "grains", "quantity": {"amount": 1.0, "unit": "kg"}}
            ]}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let result: BatchUpdateResponse = response.into_json().await.unwrap();
        assert_eq!(result.updated_ingredient_ids.len(), 2);
        assert_eq!(result.updated_ingredient_ids[0], created.id);

        let milk: Ingredient = db.get(collections::INGREDIENTS, &created.id).await.unwrap();
        assert_eq!(milk.quantity.amount, 3.0);
        assert_eq!(milk.location.as_deref(), Some("fridge"));
        assert_eq!(milk.expiration_date, created.expiration_date);
    }

    #[rocket::async_test]
    async fn test_expiring_filter() {
        let (client, _) = client().await;
        let soon = (Utc::now() + Duration::days(1)).to_rfc3339();
        let later = (Utc::now() + Duration::days(20)).to_rfc3339();
        for (name, exp) in [("Spinach", soon), ("Rice", later)] {
            let body = json!({
                "name": name,
                "category": "produce",
                "quantity": {"amount": 1.0, "unit": "pieces"},
                "expiration_date": exp,
            });
            client.post(BASE).json(&body).dispatch().await;
        }

        let list: IngredientList = client
            .get(format!("{BASE}/expiring?days=3"))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(list.ingredients.len(), 1);
        assert_eq!(list.ingredients[0].name, "Spinach");

        let response = client.get(format!("{BASE}/expiring?days=-1")).dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_huge_expiring_horizon_is_rejected() {
        let (client, _) = client().await;
        for days in ["3651", "200000000", "9223372036854775807"] {
            let response = client
                .get(format!("{BASE}/expiring?days={days}"))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest);
            let body: Value = response.into_json().await.unwrap();
            assert_eq!(body["error"], "bad_request");
        }
        let response = client.get(format!("{BASE}/expiring?days=3650")).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn test_image_upload_sets_reference() {
        let (client, db) = client().await;
        let created: Ingredient = client
            .post(BASE)
            .json(&milk())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();

        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"milk.png\"\r\n\
             Content-Type: image/png\r\n\r\nPNGDATA\r\n--{boundary}--\r\n"
        );
        let response = client
            .post(format!("{BASE}/{}/image", created.id))
            .header(ContentType::new("multipart", "form-data").with_params(("boundary", boundary)))
            .body(body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let reference: ImageReference = response.into_json().await.unwrap();
        assert!(reference.image_url.starts_with("/api/v1/images/"));

        let stored: Ingredient = db.get(collections::INGREDIENTS, &created.id).await.unwrap();
        assert_eq!(stored.image_url, Some(reference.image_url.clone()));

        let response = client.get(reference.image_url).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::PNG));
        let disposition = response.headers().get_one("Content-Disposition").unwrap();
        assert!(disposition.starts_with("inline; filename=\""));
        assert!(disposition.ends_with(".png\""));
        assert_eq!(response.into_bytes().await.unwrap(), b"PNGDATA".to_vec());
    }
}
