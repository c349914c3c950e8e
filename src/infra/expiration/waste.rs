use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::infra::parsing::guess_category;
use crate::infra::records::{
    DateWindow, MonthlyWaste, WasteLogCreate, WasteLogEntry, WasteStatistics,
};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// The last thirty days, ending today.
pub fn default_window(today: NaiveDate) -> DateWindow {
    DateWindow {
        start: today - Duration::days(DEFAULT_WINDOW_DAYS),
        end: today,
    }
}

pub fn record_waste(request: WasteLogCreate, now: DateTime<Utc>) -> WasteLogEntry {
    let category = request
        .category
        .unwrap_or_else(|| guess_category(&request.ingredient_name));
    WasteLogEntry {
        id: Uuid::new_v4().to_string(),
        ingredient_name: request.ingredient_name,
        category,
        quantity: request.quantity,
        reason: request.reason,
        expiration_date: request.expiration_date,
        estimated_cost: request.estimated_cost,
        logged_at: now,
    }
}

pub fn waste_statistics(logs: &[WasteLogEntry], window: DateWindow) -> WasteStatistics {
    let in_window: Vec<&WasteLogEntry> = logs
        .iter()
        .filter(|entry| window.contains(entry.logged_at.date_naive()))
        .collect();

    let mut by_category = BTreeMap::new();
    let mut by_reason = BTreeMap::new();
    let mut by_name: BTreeMap<String, (usize, &str)> = BTreeMap::new();
    let mut monthly: BTreeMap<String, MonthlyWaste> = BTreeMap::new();
    let mut total_estimated_cost = 0.0;

    for entry in &in_window {
        let cost = entry.estimated_cost.unwrap_or(0.0);
        *by_category.entry(entry.category).or_insert(0.0) += entry.quantity.amount;
        *by_reason.entry(entry.reason).or_insert(0) += 1;
        by_name
            .entry(entry.ingredient_name.trim().to_lowercase())
            .or_insert((0, entry.ingredient_name.as_str()))
            .0 += 1;
        total_estimated_cost += cost;

        let month = entry.logged_at.format("%Y-%m").to_string();
        let bucket = monthly.entry(month.clone()).or_insert_with(|| MonthlyWaste {
            month,
            entries: 0,
            quantity: 0.0,
            estimated_cost: 0.0,
        });
        bucket.entries += 1;
        bucket.quantity += entry.quantity.amount;
        bucket.estimated_cost += cost;
    }

    // Alphabetical iteration plus strict comparison keeps the first name on ties.
    let mut most_wasted: Option<(usize, &str)> = None;
    for (count, name) in by_name.values() {
        if most_wasted.map_or(true, |(best, _)| *count > best) {
            most_wasted = Some((*count, *name));
        }
    }

    WasteStatistics {
        window,
        total_entries: in_window.len(),
        total_quantity: by_category.values().sum(),
        by_category,
        by_reason,
        total_estimated_cost,
        most_wasted_ingredient: most_wasted.map(|(_, name)| name.to_string()),
        monthly: monthly.into_values().collect(),
    }
}
