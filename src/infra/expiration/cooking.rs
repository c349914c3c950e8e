use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};

use crate::infra::records::{CookingLog, UserStats};

pub fn cooking_statistics(logs: &[CookingLog], today: NaiveDate) -> UserStats {
    let ratings: Vec<f64> = logs
        .iter()
        .filter_map(|log| log.rating.map(f64::from))
        .collect();
    let average_rating =
        (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);

    let mut cuisines: BTreeMap<&str, usize> = BTreeMap::new();
    for cuisine in logs.iter().filter_map(|log| log.cuisine.as_deref()) {
        *cuisines.entry(cuisine).or_insert(0) += 1;
    }
    let mut favorite_cuisine: Option<(&str, usize)> = None;
    for (cuisine, count) in cuisines {
        if favorite_cuisine.map_or(true, |(_, best)| count > best) {
            favorite_cuisine = Some((cuisine, count));
        }
    }

    let days: BTreeSet<NaiveDate> = logs.iter().map(|log| log.cooked_at.date_naive()).collect();

    UserStats {
        total_recipes_cooked: logs.len(),
        average_rating,
        favorite_cuisine: favorite_cuisine.map(|(cuisine, _)| cuisine.to_string()),
        last_cooked_date: logs.iter().map(|log| log.cooked_at).max(),
        cooking_streak_days: streak(&days, today),
    }
}

/// Consecutive cooking days ending today, or ending yesterday when nothing
/// has been cooked yet today.
fn streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut count = 0;
    while days.contains(&cursor) {
        count += 1;
        cursor -= Duration::days(1);
    }
    count
}
