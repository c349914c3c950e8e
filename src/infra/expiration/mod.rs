//! Expiration lifecycle and waste analytics over the pantry collections.
//!
//! Everything in here is pure: handlers load the records, pass them in
//! together with "today", and persist whatever comes back.

mod cooking;
mod freshness;
mod recommend;
mod waste;

pub use cooking::cooking_statistics;
pub use freshness::{
    classify_freshness, classify_freshness_within, days_until, ingredients_expiring_soon,
    summarize_expiration, SOON_THRESHOLD_DAYS,
};
pub use recommend::{
    expiring_within, names_match, recommend_recipes_for_expiring, MAX_HORIZON_DAYS,
};
pub use waste::{default_window, record_waste, waste_statistics, DEFAULT_WINDOW_DAYS};
