use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, post, put, State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::ingredients::store_quantity;
use super::users::load_preferences;
use super::ImageReference;
use crate::infra::ai::AiServices;
use crate::infra::config::Settings;
use crate::infra::error::{validated, ApiError, ApiResult, NotFoundAs};
use crate::infra::records::{
    collections, CookRequest, CookingLog, GenerateRecipesRequest, Ingredient, InventoryDeduction,
    Message, Recipe, RecipeCreate, RecipeUpdate, Stamped,
};
use crate::infra::store::{Gateway, ImageBucket};

/// Recipes produced per generate call, one per preferred cuisine.
pub const MAX_GENERATED: usize = 3;

const FALLBACK_CUISINES: [&str; 3] = ["International", "Italian", "American"];

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeList {
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CookResponse {
    pub success: bool,
    pub message: String,
    pub updated_ingredients: Vec<InventoryDeduction>,
    pub cook_count: u32,
}

#[derive(Serialize)]
struct CookedPatch {
    cook_count: u32,
    last_cooked: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f32>,
}

#[derive(Serialize)]
struct ImagePatch<'a> {
    image_url: &'a str,
}

#[get("/?<status>&<sort>")]
pub async fn list_recipes(
    db: &State<Gateway>,
    status: Option<&str>,
    sort: Option<&str>,
) -> ApiResult<Json<RecipeList>> {
    let keep: fn(&Recipe) -> bool = match status.unwrap_or("all") {
        "all" => |_| true,
        "cooked" => |r| r.cook_count > 0,
        "saved" => |r| r.cook_count == 0,
        other => return Err(ApiError::BadRequest(format!("unknown status filter {other}"))),
    };
    let mut recipes: Vec<Recipe> = db
        .list::<Recipe>(collections::RECIPES)
        .await?
        .into_iter()
        .filter(keep)
        .collect();

    match sort.unwrap_or("recent") {
        "recent" => recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        "rating" => recipes.sort_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .total_cmp(&a.rating.unwrap_or(0.0))
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        other => return Err(ApiError::BadRequest(format!("unknown sort order {other}"))),
    }
    Ok(Json(RecipeList { recipes }))
}

#[post("/", data = "<body>")]
pub async fn create_recipe(
    db: &State<Gateway>,
    body: Result<Json<RecipeCreate>, json::Error<'_>>,
) -> ApiResult<(Status, Json<Recipe>)> {
    let create = validated(body)?;
    let recipe = create.into_recipe(Uuid::new_v4().to_string(), Utc::now());
    db.put(collections::RECIPES, &recipe.id, &recipe).await?;
    info!(id = %recipe.id, title = %recipe.title, "created recipe");
    Ok((Status::Created, Json(recipe)))
}

#[get("/<id>")]
pub async fn get_recipe(db: &State<Gateway>, id: &str) -> ApiResult<Json<Recipe>> {
    let recipe = db.get(collections::RECIPES, id).await.or_not_found("recipe")?;
    Ok(Json(recipe))
}

#[put("/<id>", data = "<body>")]
pub async fn update_recipe(
    db: &State<Gateway>,
    id: &str,
    body: Result<Json<RecipeUpdate>, json::Error<'_>>,
) -> ApiResult<Json<Recipe>> {
    let patch = validated(body)?;
    db.update(collections::RECIPES, id, &Stamped::new(&patch, Utc::now()))
        .await
        .or_not_found("recipe")?;
    let recipe = db.get(collections::RECIPES, id).await.or_not_found("recipe")?;
    Ok(Json(recipe))
}

#[delete("/<id>")]
pub async fn delete_recipe(db: &State<Gateway>, id: &str) -> ApiResult<Json<Message>> {
    db.delete(collections::RECIPES, id)
        .await
        .or_not_found("recipe")?;
    Ok(Json(Message::new("Recipe deleted successfully")))
}

/// Generates an image for `recipe` and stores it; storage failures leave the
/// recipe without an image.
async fn attach_image(
    ai: &AiServices,
    images: &dyn ImageBucket,
    settings: &Settings,
    recipe: &Recipe,
) -> Option<String> {
    let image = ai.images.generate_image(recipe).await;
    let filename = format!("{}.{}", recipe.id, image.extension());
    match images
        .upload("recipe_images", &filename, &image.content_type, image.bytes)
        .await
    {
        Ok(object_id) => Some(settings.image_url(&object_id)),
        Err(e) => {
            warn!(recipe = %recipe.id, error = %e, "could not store recipe image");
            None
        }
    }
}

#[post("/generate", data = "<body>")]
pub async fn generate_recipes(
    db: &State<Gateway>,
    ai: &State<AiServices>,
    images: &State<Arc<dyn ImageBucket>>,
    settings: &State<Settings>,
    body: Result<Json<GenerateRecipesRequest>, json::Error<'_>>,
) -> ApiResult<Json<RecipeList>> {
    let request = body?.into_inner();
    let mut preferences = load_preferences(db).await?;
    if let Some(overrides) = request.preference_overrides {
        preferences.apply(overrides);
    }

    let inventory: Vec<Ingredient> = db.list(collections::INGREDIENTS).await?;
    let mut available: Vec<String> = inventory
        .into_iter()
        .filter(|i| i.quantity.amount > 0.0)
        .map(|i| i.name)
        .collect();
    for name in request.must_use_ingredients {
        if !available.iter().any(|a| a.eq_ignore_ascii_case(&name)) {
            available.push(name);
        }
    }
    info!(available = available.len(), "generating recipes");

    let cuisines: Vec<String> = if preferences.cuisine_preferences.is_empty() {
        FALLBACK_CUISINES.iter().map(|c| c.to_string()).collect()
    } else {
        preferences.cuisine_preferences.clone()
    };

    let mut recipes = Vec::with_capacity(MAX_GENERATED);
    for cuisine in cuisines.iter().take(MAX_GENERATED) {
        let generated = ai
            .recipes
            .generate_recipe(&available, &preferences, Some(cuisine.as_str()))
            .await;
        let mut recipe = generated.into_recipe(Uuid::new_v4().to_string(), Utc::now(), &available);
        recipe.image_url = attach_image(ai, images.inner().as_ref(), settings, &recipe).await;
        db.put(collections::RECIPES, &recipe.id, &recipe).await?;
        info!(
            id = %recipe.id,
            title = %recipe.title,
            cuisine = %cuisine,
            "stored generated recipe"
        );
        recipes.push(recipe);
    }
    Ok(Json(RecipeList { recipes }))
}

#[post("/<id>/image")]
pub async fn regenerate_image(
    db: &State<Gateway>,
    ai: &State<AiServices>,
    images: &State<Arc<dyn ImageBucket>>,
    settings: &State<Settings>,
    id: &str,
) -> ApiResult<Json<ImageReference>> {
    let recipe: Recipe = db.get(collections::RECIPES, id).await.or_not_found("recipe")?;
    let image = ai.images.generate_image(&recipe).await;
    let object_id = images
        .upload(
            "recipe_images",
            &format!("{}.{}", recipe.id, image.extension()),
            &image.content_type,
            image.bytes,
        )
        .await?;
    let image_url = settings.image_url(&object_id);
    db.update(
        collections::RECIPES,
        id,
        &Stamped::new(&ImagePatch { image_url: &image_url }, Utc::now()),
    )
    .await
    .or_not_found("recipe")?;
    Ok(Json(ImageReference { image_url }))
}

/// Takes each recipe ingredient out of the inventory item with the same name,
/// never going below zero.
fn deduct(inventory: &mut [Ingredient], recipe: &Recipe) -> Vec<(usize, InventoryDeduction)> {
    let mut deductions = Vec::new();
    for item in &recipe.ingredients {
        let Some(index) = inventory
            .iter()
            .position(|i| i.name.trim().eq_ignore_ascii_case(item.name.trim()))
        else {
            continue;
        };
        let stock = &mut inventory[index];
        let previous_amount = stock.quantity.amount;
        let new_amount = (previous_amount - item.quantity.amount).max(0.0);
        stock.quantity.amount = new_amount;
        deductions.push((
            index,
            InventoryDeduction {
                name: stock.name.clone(),
                previous_amount,
                new_amount,
                used: item.quantity.amount,
            },
        ));
    }
    deductions
}

#[post("/<id>/cook", data = "<body>")]
pub async fn cook_recipe(
    db: &State<Gateway>,
    id: &str,
    body: Result<Json<CookRequest>, json::Error<'_>>,
) -> ApiResult<Json<CookResponse>> {
    let request = validated(body)?;
    let recipe: Recipe = db.get(collections::RECIPES, id).await.or_not_found("recipe")?;
    let now = Utc::now();

    let cook_count = recipe.cook_count + 1;
    let patch = CookedPatch {
        cook_count,
        last_cooked: now,
        rating: request.rating,
    };
    db.update(collections::RECIPES, id, &Stamped::new(&patch, now))
        .await
        .or_not_found("recipe")?;

    let mut inventory: Vec<Ingredient> = db.list(collections::INGREDIENTS).await?;
    let deductions = deduct(&mut inventory, &recipe);
    let mut updated_ingredients = Vec::with_capacity(deductions.len());
    for (index, deduction) in deductions {
        store_quantity(db, &inventory[index]).await?;
        updated_ingredients.push(deduction);
    }

    let log = CookingLog {
        id: Uuid::new_v4().to_string(),
        recipe_id: recipe.id.clone(),
        recipe_title: recipe.title.clone(),
        cuisine: recipe.cuisine.clone(),
        cooked_at: now,
        rating: request.rating,
        notes: request.notes,
        ingredients_used: updated_ingredients.clone(),
    };
    db.put(collections::COOKING_LOGS, &log.id, &log).await?;
    info!(recipe = %recipe.id, cook_count, "recipe cooked");

    Ok(Json(CookResponse {
        success: true,
        message: "Recipe marked as cooked successfully".to_string(),
        updated_ingredients,
        cook_count,
    }))
}
