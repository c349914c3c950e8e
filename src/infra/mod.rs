pub mod ai;
pub mod config;
pub mod error;
pub mod expiration;
pub mod fairings;
pub mod parsing;
pub mod records;
pub mod routes;
pub mod store;

use std::sync::Arc;

use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::{catchers, routes, Build, Rocket};

use ai::AiServices;
use config::Settings;
use fairings::{RequestLogger, CORS};
use store::{Gateway, ImageBucket};

/// Assembles the server over already-connected backends.
///
/// Rocket's own logging is switched off; every request is reported through
/// `tracing` by [`RequestLogger`] instead.
pub fn build(
    settings: Settings,
    gateway: Gateway,
    images: Arc<dyn ImageBucket>,
    ai: AiServices,
) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("json", 15.mebibytes())
        .limit("file", 10.mebibytes())
        .limit("data-form", 12.mebibytes());
    let figment = rocket::Config::figment()
        .merge(("limits", limits))
        .merge(("log_level", LogLevel::Off));

    let ingredients = settings.route("ingredients");
    let recipes = settings.route("recipes");
    let users = settings.route("users");
    let expiration = settings.route("expiration");
    let images_path = settings.route("images");

    rocket::custom(figment)
        .manage(settings)
        .manage(gateway)
        .manage(images)
        .manage(ai)
        .mount("/", routes![routes::index, routes::health])
        .mount(
            ingredients,
            routes![
                routes::ingredients::list_ingredients,
                routes::ingredients::create_ingredient,
                routes::ingredients::get_ingredient,
                routes::ingredients::update_ingredient,
                routes::ingredients::delete_ingredient,
                routes::ingredients::scan_ingredients,
                routes::ingredients::batch_update_ingredients,
                routes::ingredients::upload_ingredient_image,
                routes::ingredients::expiring_ingredients,
            ],
        )
        .mount(
            recipes,
            routes![
                routes::recipes::list_recipes,
                routes::recipes::create_recipe,
                routes::recipes::get_recipe,
                routes::recipes::update_recipe,
                routes::recipes::delete_recipe,
                routes::recipes::generate_recipes,
                routes::recipes::regenerate_image,
                routes::recipes::cook_recipe,
            ],
        )
        .mount(
            users,
            routes![
                routes::users::get_preferences,
                routes::users::post_preferences,
                routes::users::put_preferences,
                routes::users::get_stats,
            ],
        )
        .mount(
            expiration,
            routes![
                routes::expiration::summary,
                routes::expiration::alerts,
                routes::expiration::get_settings,
                routes::expiration::put_settings,
                routes::expiration::log_waste,
                routes::expiration::waste_logs,
                routes::expiration::delete_waste_log,
                routes::expiration::waste_stats,
                routes::expiration::recipe_recommendations,
            ],
        )
        .mount(images_path, routes![routes::images::get_image])
        .register(
            "/",
            catchers![
                error::bad_request,
                error::not_found,
                error::payload_too_large,
                error::unprocessable,
                error::internal_error,
            ],
        )
        .attach(CORS)
        .attach(RequestLogger)
}
