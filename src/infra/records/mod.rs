mod expiration;
mod ingredient;
mod recipe;
mod user;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use expiration::*;
pub use ingredient::*;
pub use recipe::*;
pub use user::*;

/// Collection names in the document store.
pub mod collections {
    pub const INGREDIENTS: &str = "ingredients";
    pub const RECIPES: &str = "recipes";
    pub const USERS: &str = "users";
    pub const WASTE_LOGS: &str = "waste_logs";
    pub const EXPIRATION_SETTINGS: &str = "expiration_settings";
    pub const COOKING_LOGS: &str = "cooking_logs";
}

/// Id of the expiration settings singleton.
pub const SETTINGS_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct Quantity {
    #[validate(range(min = 0.0, message = "amount must not be negative"))]
    pub amount: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(amount: f64, unit: impl Into<String>) -> Self {
        Quantity {
            amount,
            unit: unit.into(),
        }
    }
}

/// A partial update together with a fresh `updated_at`, merged in one write.
#[derive(Debug, Serialize)]
pub struct Stamped<'a, T> {
    #[serde(flatten)]
    pub patch: &'a T,
    pub updated_at: DateTime<Utc>,
}

impl<'a, T> Stamped<'a, T> {
    pub fn new(patch: &'a T, updated_at: DateTime<Utc>) -> Self {
        Stamped { patch, updated_at }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Message {
            message: message.into(),
        }
    }
}
