use chrono::{DateTime, NaiveDate, Utc};

use crate::infra::records::{
    ExpirationAlert, ExpirationSettings, ExpirationSummary, Freshness, Ingredient,
    DEFAULT_WARNING_DAYS,
};

pub const SOON_THRESHOLD_DAYS: i64 = DEFAULT_WARNING_DAYS as i64;

/// Whole calendar days from `today` to the expiration day; negative once past.
pub fn days_until(expiration: DateTime<Utc>, today: NaiveDate) -> i64 {
    (expiration.date_naive() - today).num_days()
}

pub fn classify_freshness(expiration: NaiveDate, today: NaiveDate) -> Freshness {
    classify_freshness_within(expiration, today, SOON_THRESHOLD_DAYS)
}

pub fn classify_freshness_within(
    expiration: NaiveDate,
    today: NaiveDate,
    threshold: i64,
) -> Freshness {
    let remaining = (expiration - today).num_days();
    if remaining < 0 {
        Freshness::Expired
    } else if remaining <= threshold {
        Freshness::ExpiringSoon
    } else {
        Freshness::Fresh
    }
}

pub fn summarize_expiration(
    ingredients: &[Ingredient],
    today: NaiveDate,
    settings: &ExpirationSettings,
) -> ExpirationSummary {
    let mut summary = ExpirationSummary {
        total_ingredients: ingredients.len(),
        ..Default::default()
    };

    for ingredient in ingredients {
        let Some(expiration) = ingredient.expiration_date else {
            summary.unknown_count += 1;
            continue;
        };
        let day = expiration.date_naive();
        let status =
            classify_freshness_within(day, today, settings.threshold_for(ingredient.category));
        match status {
            Freshness::Fresh => {
                summary.fresh_count += 1;
                continue;
            }
            Freshness::ExpiringSoon => summary.expiring_soon_count += 1,
            Freshness::Expired => summary.expired_count += 1,
        }
        summary.alerts.push(ExpirationAlert {
            ingredient_id: ingredient.id.clone(),
            ingredient_name: ingredient.name.clone(),
            category: ingredient.category,
            expiration_date: day,
            days_until_expiration: (day - today).num_days(),
            status,
            quantity: ingredient.quantity.clone(),
            location: ingredient.location.clone(),
        });
    }

    summary.alerts.sort_by(|a, b| {
        a.days_until_expiration
            .cmp(&b.days_until_expiration)
            .then_with(|| a.ingredient_name.cmp(&b.ingredient_name))
    });
    summary
}

/// Ingredients classified `ExpiringSoon` under the given settings. Expired
/// items are excluded; they are candidates for the waste log, not for cooking.
pub fn ingredients_expiring_soon(
    ingredients: &[Ingredient],
    today: NaiveDate,
    settings: &ExpirationSettings,
) -> Vec<Ingredient> {
    ingredients
        .iter()
        .filter(|ingredient| {
            ingredient.expiration_date.is_some_and(|exp| {
                classify_freshness_within(
                    exp.date_naive(),
                    today,
                    settings.threshold_for(ingredient.category),
                ) == Freshness::ExpiringSoon
            })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::infra::expiration::fixtures::{ingredient, today};
    use crate::infra::records::IngredientCategory;

    #[test]
    fn test_classify_boundaries() {
        let t = today();
        assert_eq!(classify_freshness(t - Duration::days(1), t), Freshness::Expired);
        assert_eq!(classify_freshness(t, t), Freshness::ExpiringSoon);
        assert_eq!(classify_freshness(t + Duration::days(3), t), Freshness::ExpiringSoon);
        assert_eq!(classify_freshness(t + Duration::days(4), t), Freshness::Fresh);
    }

    #[test]
    fn test_classify_is_fresh_beyond_any_threshold() {
        let t = today();
        for threshold in 0..10 {
            for extra in 1..30 {
                let exp = t + Duration::days(threshold + extra);
                assert_eq!(classify_freshness_within(exp, t, threshold), Freshness::Fresh);
            }
            for remaining in 0..=threshold {
                let exp = t + Duration::days(remaining);
                assert_eq!(
                    classify_freshness_within(exp, t, threshold),
                    Freshness::ExpiringSoon
                );
            }
        }
    }

    #[test]
    fn test_days_until_ignores_time_of_day() {
        let late = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 3, 11, 23, 59, 0).unwrap();
        assert_eq!(days_until(late, today()), 1);
    }

    #[test]
    fn test_summary_counts_and_sorts_alerts() {
        let ingredients = vec![
            ingredient("yogurt", Some(2)),
            ingredient("bread", Some(-1)),
            ingredient("rice", Some(200)),
            ingredient("salt", None),
            ingredient("apple", Some(2)),
        ];
        let summary = summarize_expiration(&ingredients, today(), &ExpirationSettings::default());

        assert_eq!(summary.total_ingredients, 5);
        assert_eq!(summary.fresh_count, 1);
        assert_eq!(summary.expiring_soon_count, 2);
        assert_eq!(summary.expired_count, 1);
        assert_eq!(summary.unknown_count, 1);

        let names: Vec<&str> = summary
            .alerts
            .iter()
            .map(|a| a.ingredient_name.as_str())
            .collect();
        assert_eq!(names, vec!["bread", "apple", "yogurt"]);
        assert_eq!(summary.alerts[0].status, Freshness::Expired);
        assert_eq!(summary.alerts[0].days_until_expiration, -1);
    }

    #[test]
    fn test_summary_uses_category_threshold() {
        let mut milk = ingredient("milk", Some(5));
        milk.category = IngredientCategory::Dairy;
        let mut settings = ExpirationSettings::default();
        settings.category_thresholds.insert(IngredientCategory::Dairy, 5);

        let summary = summarize_expiration(&[milk.clone()], today(), &settings);
        assert_eq!(summary.expiring_soon_count, 1);

        let summary = summarize_expiration(&[milk], today(), &ExpirationSettings::default());
        assert_eq!(summary.fresh_count, 1);
    }

    #[test]
    fn test_expiring_soon_excludes_expired_and_unknown() {
        let ingredients = vec![
            ingredient("spinach", Some(1)),
            ingredient("bread", Some(-2)),
            ingredient("salt", None),
        ];
        let soon = ingredients_expiring_soon(&ingredients, today(), &ExpirationSettings::default());
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].name, "spinach");
    }
}
