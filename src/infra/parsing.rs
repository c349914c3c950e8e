//! Free-text helpers for what the AI services send back: category guesses,
//! quantities like "3 pieces" and durations like "1 week" or "15 minutes".

use std::sync::LazyLock;

use regex::Regex;

use super::records::{IngredientCategory, Quantity};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"));

const CATEGORY_KEYWORDS: &[(IngredientCategory, &[&str])] = &[
    (
        IngredientCategory::Spices,
        &[
            "salt", "pepper", "garlic", "ginger", "basil", "oregano", "cumin", "paprika",
            "cinnamon", "thyme",
        ],
    ),
    (
        IngredientCategory::Dairy,
        &["milk", "cheese", "yogurt", "yoghurt", "butter", "cream"],
    ),
    (
        IngredientCategory::Protein,
        &[
            "chicken", "beef", "pork", "fish", "turkey", "lamb", "egg", "tofu", "salmon", "tuna",
            "bean", "lentil",
        ],
    ),
    (
        IngredientCategory::Grains,
        &["rice", "bread", "pasta", "flour", "oat", "quinoa", "noodle", "cereal"],
    ),
    (
        IngredientCategory::Produce,
        &[
            "apple", "banana", "orange", "berry", "berries", "grape", "lemon", "lime", "tomato",
            "onion", "carrot", "lettuce", "spinach", "potato", "cucumber", "broccoli", "avocado",
        ],
    ),
];

/// First matching keyword list wins; "bell pepper" counts as a spice, as the
/// lists are checked in order.
pub fn guess_category(name: &str) -> IngredientCategory {
    let lower = name.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or(IngredientCategory::Other)
}

/// First number in the text, or `default` when there is none.
pub fn leading_number(text: &str, default: f64) -> f64 {
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(default)
}

pub fn parse_unit(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    const UNITS: &[(&[&str], &str)] = &[
        (&["piece", "item"], "pieces"),
        (&["bottle"], "bottles"),
        (&["container", "box"], "containers"),
        (&["cup"], "cups"),
        (&["lb", "pound"], "lbs"),
        (&["kg"], "kg"),
        (&["carton"], "cartons"),
        (&["loaf", "loaves"], "loaves"),
        (&["block"], "blocks"),
    ];
    UNITS
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, unit)| *unit)
        .unwrap_or("pieces")
}

/// "3 pieces" -> 3 pieces, "half container" -> 1 containers.
pub fn parse_quantity(text: &str) -> Quantity {
    Quantity::new(leading_number(text, 1.0), parse_unit(text))
}

/// Upper bound on a parsed shelf life, about ten years.
pub const MAX_SHELF_LIFE_DAYS: i64 = 3650;

/// "3 days" -> 3, "2 weeks" -> 14, "1 month" -> 30; anything else is a week.
/// Results are clamped to `0..=MAX_SHELF_LIFE_DAYS`.
pub fn parse_shelf_life_days(text: &str) -> i64 {
    let lower = text.to_lowercase();
    let n = NUMBER.find(&lower).and_then(|m| m.as_str().parse::<f64>().ok());
    let (per_unit, fallback) = if lower.contains("day") {
        (1, 7)
    } else if lower.contains("week") {
        (7, 7)
    } else if lower.contains("month") {
        (30, 30)
    } else {
        return 7;
    };
    match n {
        Some(n) => (n.trunc() * per_unit as f64).clamp(0.0, MAX_SHELF_LIFE_DAYS as f64) as i64,
        None => fallback,
    }
}

/// "15 minutes" -> 15, "1 hour" -> 60; 30 when nothing numeric is present.
pub fn parse_minutes(text: &str) -> u32 {
    let lower = text.to_lowercase();
    match NUMBER.find(&lower).and_then(|m| m.as_str().parse::<f64>().ok()) {
        Some(n) if lower.contains("hour") => (n * 60.0) as u32,
        Some(n) => n as u32,
        None => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_category() {
        assert_eq!(guess_category("Green Apples"), IngredientCategory::Produce);
        assert_eq!(guess_category("Milk"), IngredientCategory::Dairy);
        assert_eq!(guess_category("Eggs"), IngredientCategory::Protein);
        assert_eq!(guess_category("Bread"), IngredientCategory::Grains);
        assert_eq!(guess_category("sea salt"), IngredientCategory::Spices);
        assert_eq!(guess_category("ketchup"), IngredientCategory::Other);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3 pieces"), Quantity::new(3.0, "pieces"));
        assert_eq!(parse_quantity("1 carton"), Quantity::new(1.0, "cartons"));
        assert_eq!(parse_quantity("0.5 kg"), Quantity::new(0.5, "kg"));
        assert_eq!(parse_quantity("half container"), Quantity::new(1.0, "containers"));
    }

    #[test]
    fn test_parse_shelf_life_days() {
        assert_eq!(parse_shelf_life_days("3 days"), 3);
        assert_eq!(parse_shelf_life_days("2 weeks"), 14);
        assert_eq!(parse_shelf_life_days("1 month"), 30);
        assert_eq!(parse_shelf_life_days("a week"), 7);
        assert_eq!(parse_shelf_life_days("soon"), 7);
        assert_eq!(
            parse_shelf_life_days("99999999999999999999 months"),
            MAX_SHELF_LIFE_DAYS
        );
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("15 minutes"), 15);
        assert_eq!(parse_minutes("1 hour"), 60);
        assert_eq!(parse_minutes("a while"), 30);
    }
}
