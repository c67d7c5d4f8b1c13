//! Derived views over a record set.
//!
//! Everything here is a pure function of its inputs: records are only borrowed,
//! and results depend on nothing but their values and order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Category, Cents, Coordinates, ExpenseId, ExpenseRecord, round_to_units, sum_cents,
};

/// Label used when a "top" key cannot be determined.
pub const NO_DATA: &str = "N/A";

/// Number of locations shown in the top-locations breakdown.
pub const TOP_LOCATIONS: usize = 8;

/// Zoom applied when the map is centered on a chosen point without an explicit zoom.
pub const FOCUSED_ZOOM: u8 = 6;

/// Zoom applied to the overview map.
pub const OVERVIEW_ZOOM: u8 = 2;

// ========================
// Totals
// ========================

/// Sum of all amounts, clamped at `Cents::MAX`.
pub fn total(records: &[ExpenseRecord]) -> Cents {
    sum_cents(records.iter().map(|r| r.amount_cents))
}

/// Mean amount, rounded half away from zero. An empty set averages to 0.
pub fn average(records: &[ExpenseRecord]) -> Cents {
    if records.is_empty() {
        return 0;
    }
    rounded_div(total(records), records.len() as i64)
}

fn rounded_div(numerator: Cents, denominator: i64) -> Cents {
    let n = numerator as i128;
    let d = denominator as i128;
    let q = (2 * n.abs() + d) / (2 * d);
    (if n < 0 { -q } else { q }) as Cents
}

// ========================
// Grouping
// ========================

/// Year and month of an expense date. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(date) => write!(f, "{}", date.format("%b %Y")),
            None => write!(f, "{:04}-{:02}", self.year, self.month),
        }
    }
}

pub fn category_key(record: &ExpenseRecord) -> Option<Category> {
    Some(record.category)
}

/// Trimmed location; blank locations have no key.
pub fn location_key(record: &ExpenseRecord) -> Option<String> {
    let location = record.location.trim();
    (!location.is_empty()).then(|| location.to_string())
}

pub fn month_key(record: &ExpenseRecord) -> Option<MonthKey> {
    Some(MonthKey::of(record.date))
}

/// Sum amounts per key. Records for which `key_fn` yields `None` are skipped.
pub fn group_sum<K, F>(records: &[ExpenseRecord], key_fn: F) -> BTreeMap<K, Cents>
where
    K: Ord,
    F: Fn(&ExpenseRecord) -> Option<K>,
{
    let mut sums = BTreeMap::new();
    for record in records {
        if let Some(key) = key_fn(record) {
            let sum = sums.entry(key).or_insert(0 as Cents);
            *sum = sum.saturating_add(record.amount_cents);
        }
    }
    sums
}

/// Key with the largest sum. Ties go to the first key in key order.
pub fn top_key<K>(sums: &BTreeMap<K, Cents>) -> Option<&K> {
    let mut best: Option<(&K, Cents)> = None;
    for (key, amount) in sums {
        match best {
            Some((_, best_amount)) if *amount <= best_amount => {}
            _ => best = Some((key, *amount)),
        }
    }
    best.map(|(key, _)| key)
}

/// Label of [`top_key`], or [`NO_DATA`] when there are no keys.
pub fn top<K: fmt::Display>(sums: &BTreeMap<K, Cents>) -> String {
    top_key(sums)
        .map(|key| key.to_string())
        .unwrap_or_else(|| NO_DATA.to_string())
}

/// Groups ordered by descending amount (ties in key order), at most `limit` of them.
pub fn ranked<K: Clone>(sums: &BTreeMap<K, Cents>, limit: usize) -> Vec<(K, Cents)> {
    let mut entries: Vec<(K, Cents)> = sums.iter().map(|(k, v)| (k.clone(), *v)).collect();
    // Stable sort keeps key order among equal amounts
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(limit);
    entries
}

/// A labelled group total, ready for display or JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: Cents,
}

/// Spending per month, in chronological order.
pub fn monthly_totals(records: &[ExpenseRecord]) -> Vec<GroupTotal> {
    group_sum(records, month_key)
        .into_iter()
        .map(|(month, total)| GroupTotal {
            key: month.to_string(),
            total,
        })
        .collect()
}

/// Locations with the highest spending, largest first.
pub fn top_locations(records: &[ExpenseRecord], limit: usize) -> Vec<GroupTotal> {
    ranked(&group_sum(records, location_key), limit)
        .into_iter()
        .map(|(key, total)| GroupTotal { key, total })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: Category,
    pub total: Cents,
    pub count: usize,
    pub average: Cents,
    pub percentage: f64,
}

/// Per-category totals with their share of overall spending, largest first.
pub fn category_shares(records: &[ExpenseRecord]) -> Vec<CategoryShare> {
    let mut grouped: BTreeMap<Category, Vec<&ExpenseRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.category).or_default().push(record);
    }

    let grand_total = total(records);
    let mut shares: Vec<CategoryShare> = grouped
        .into_iter()
        .map(|(category, members)| {
            let category_total = sum_cents(members.iter().map(|r| r.amount_cents));
            let count = members.len();
            CategoryShare {
                category,
                total: category_total,
                count,
                average: rounded_div(category_total, count as i64),
                percentage: if grand_total > 0 {
                    category_total as f64 / grand_total as f64 * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();
    shares.sort_by(|a, b| b.total.cmp(&a.total));
    shares
}

// ========================
// Timeline and map
// ========================

/// A record with its timeline caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub record: ExpenseRecord,
    pub label: String,
}

/// Caption combining emoji, trip name (or location) and the amount in whole units.
pub fn timeline_label(record: &ExpenseRecord, currency_symbol: &str) -> String {
    let amount = format!("{}{}", currency_symbol, round_to_units(record.amount_cents));
    match record.emoji.as_deref() {
        Some(emoji) => format!("{} {} — {}", emoji, record.title(), amount),
        None => format!("{} — {}", record.title(), amount),
    }
}

/// Records in ascending date order; records sharing a date keep their input order.
pub fn timeline(records: &[ExpenseRecord], currency_symbol: &str) -> Vec<TimelineEntry> {
    let mut ordered: Vec<&ExpenseRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.date);
    ordered
        .into_iter()
        .map(|record| TimelineEntry {
            label: timeline_label(record, currency_symbol),
            record: record.clone(),
        })
        .collect()
}

/// Explicit view state for the map, replacing any session-held "center on" selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MapParams {
    pub center: Option<Coordinates>,
    pub zoom: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapPoint {
    pub id: ExpenseId,
    pub date: NaiveDate,
    pub coordinates: Coordinates,
    pub category: Category,
    pub amount_cents: Cents,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapView {
    pub points: Vec<MapPoint>,
    /// `None` only when there is nothing to show and no override
    pub center: Option<Coordinates>,
    pub zoom: u8,
}

/// Records with coordinates as map points. Records without them are left out.
pub fn map_view(records: &[ExpenseRecord], params: &MapParams, currency_symbol: &str) -> MapView {
    let points: Vec<MapPoint> = records
        .iter()
        .filter_map(|record| {
            record.coordinates.map(|coordinates| MapPoint {
                id: record.id,
                date: record.date,
                coordinates,
                category: record.category,
                amount_cents: record.amount_cents,
                label: timeline_label(record, currency_symbol),
            })
        })
        .collect();

    let (center, zoom) = match params.center {
        Some(center) => (Some(center), params.zoom.unwrap_or(FOCUSED_ZOOM)),
        None => (mean_center(&points), params.zoom.unwrap_or(OVERVIEW_ZOOM)),
    };

    MapView {
        points,
        center,
        zoom,
    }
}

fn mean_center(points: &[MapPoint]) -> Option<Coordinates> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let latitude = points.iter().map(|p| p.coordinates.latitude).sum::<f64>() / n;
    let longitude = points.iter().map(|p| p.coordinates.longitude).sum::<f64>() / n;
    Coordinates::new(latitude, longitude)
}

// ========================
// Dashboard
// ========================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub count: usize,
    pub total: Cents,
    pub average: Cents,
    pub top_location: String,
    pub top_category: String,
}

pub fn summary(records: &[ExpenseRecord]) -> DashboardSummary {
    DashboardSummary {
        count: records.len(),
        total: total(records),
        average: average(records),
        top_location: top(&group_sum(records, location_key)),
        top_category: top(&group_sum(records, category_key)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget: Cents,
    pub spent: Cents,
    /// Negative when over budget
    pub remaining: Cents,
}

impl BudgetStatus {
    pub fn is_over_budget(&self) -> bool {
        self.remaining < 0
    }
}

pub fn budget_status(records: &[ExpenseRecord], budget: Cents) -> BudgetStatus {
    let spent = total(records);
    BudgetStatus {
        budget,
        spent,
        remaining: budget.saturating_sub(spent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        id: ExpenseId,
        date: &str,
        category: Category,
        location: &str,
        amount: Cents,
    ) -> ExpenseRecord {
        ExpenseRecord {
            id,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            trip_name: None,
            category,
            amount_cents: amount,
            location: location.to_string(),
            coordinates: None,
            emoji: None,
            description: None,
            photo_path: None,
        }
    }

    #[test]
    fn test_total_and_average() {
        let records = vec![
            record(1, "2024-01-01", Category::Food, "Pune", 100),
            record(2, "2024-01-02", Category::Food, "Pune", 201),
        ];
        assert_eq!(total(&records), 301);
        // 150.5 rounds away from zero
        assert_eq!(average(&records), 151);
    }

    #[test]
    fn test_average_of_empty_set() {
        assert_eq!(average(&[]), 0);
        assert_eq!(total(&[]), 0);
    }

    #[test]
    fn test_group_sum_and_top() {
        let records = vec![
            record(1, "2024-01-01", Category::Hotel, "Goa", 100),
            record(2, "2024-01-02", Category::Hotel, "Goa", 50),
            record(3, "2024-01-03", Category::Food, "Goa", 30),
        ];
        let sums = group_sum(&records, category_key);
        assert_eq!(sums.len(), 2);
        assert_eq!(sums[&Category::Hotel], 150);
        assert_eq!(sums[&Category::Food], 30);
        assert_eq!(top(&sums), "Hotel");
    }

    #[test]
    fn test_top_breaks_ties_by_key_order() {
        let records = vec![
            record(1, "2024-01-01", Category::Food, "Shimla", 100),
            record(2, "2024-01-02", Category::Food, "Manali", 100),
        ];
        let sums = group_sum(&records, location_key);
        assert_eq!(top_key(&sums).map(String::as_str), Some("Manali"));
    }

    #[test]
    fn test_top_on_empty_and_missing_keys() {
        let empty: BTreeMap<String, Cents> = BTreeMap::new();
        assert_eq!(top(&empty), NO_DATA);

        let records = vec![record(1, "2024-01-01", Category::Food, "   ", 100)];
        assert_eq!(top(&group_sum(&records, location_key)), NO_DATA);
    }

    #[test]
    fn test_month_keys_order_chronologically() {
        let records = vec![
            record(1, "2024-01-15", Category::Food, "A", 10),
            record(2, "2023-12-31", Category::Food, "A", 20),
            record(3, "2024-01-01", Category::Food, "A", 5),
        ];
        let months = monthly_totals(&records);
        assert_eq!(
            months,
            vec![
                GroupTotal {
                    key: "Dec 2023".to_string(),
                    total: 20,
                },
                GroupTotal {
                    key: "Jan 2024".to_string(),
                    total: 15,
                },
            ]
        );
    }

    #[test]
    fn test_ranked_limits_and_orders() {
        let records = vec![
            record(1, "2024-01-01", Category::Food, "A", 10),
            record(2, "2024-01-01", Category::Food, "B", 30),
            record(3, "2024-01-01", Category::Food, "C", 10),
            record(4, "2024-01-01", Category::Food, "D", 5),
        ];
        let top2 = top_locations(&records, 2);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].key, "B");
        assert_eq!(top2[1].key, "A");
    }

    #[test]
    fn test_category_shares() {
        let records = vec![
            record(1, "2024-01-01", Category::Flight, "A", 7500),
            record(2, "2024-01-01", Category::Food, "A", 1000),
            record(3, "2024-01-01", Category::Food, "A", 1500),
        ];
        let shares = category_shares(&records);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].category, Category::Flight);
        assert!((shares[0].percentage - 75.0).abs() < 1e-9);
        assert_eq!(shares[1].count, 2);
        assert_eq!(shares[1].average, 1250);
    }

    #[test]
    fn test_timeline_is_sorted_and_labelled() {
        let mut late = record(1, "2024-03-01", Category::Hotel, "Munnar", 250050);
        late.trip_name = Some("Kerala Trip".to_string());
        late.emoji = Some("🏨".to_string());
        let early = record(2, "2024-02-01", Category::Food, "Kochi", 45000);
        let same_day = record(3, "2024-02-01", Category::Food, "Alleppey", 100);
        let records = vec![late, early, same_day];

        let entries = timeline(&records, "₹");
        let ids: Vec<_> = entries.iter().map(|e| e.record.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(entries[0].label, "Kochi — ₹450");
        assert_eq!(entries[2].label, "🏨 Kerala Trip — ₹2500");
        // Input untouched
        assert_eq!(records[0].id, 1);
    }

    #[test]
    fn test_map_view_excludes_records_without_coordinates() {
        let mut a = record(1, "2024-01-01", Category::Food, "A", 100);
        a.coordinates = Coordinates::new(10.0, 70.0);
        let mut b = record(2, "2024-01-01", Category::Food, "B", 100);
        b.coordinates = Coordinates::new(20.0, 80.0);
        let c = record(3, "2024-01-01", Category::Food, "Nonexistentplace12345", 100);

        let view = map_view(&[a, b, c], &MapParams::default(), "₹");
        assert_eq!(view.points.len(), 2);
        assert_eq!(view.center, Coordinates::new(15.0, 75.0));
        assert_eq!(view.zoom, OVERVIEW_ZOOM);

        let focus = MapParams {
            center: Coordinates::new(1.0, 2.0),
            zoom: None,
        };
        let view = map_view(&[], &focus, "₹");
        assert!(view.points.is_empty());
        assert_eq!(view.center, Coordinates::new(1.0, 2.0));
        assert_eq!(view.zoom, FOCUSED_ZOOM);

        assert_eq!(map_view(&[], &MapParams::default(), "₹").center, None);
    }

    #[test]
    fn test_summary_and_budget() {
        let records = vec![
            record(1, "2024-01-01", Category::Hotel, "Goa", 6000),
            record(2, "2024-01-02", Category::Food, "Pune", 5000),
        ];
        let s = summary(&records);
        assert_eq!(s.count, 2);
        assert_eq!(s.total, 11000);
        assert_eq!(s.average, 5500);
        assert_eq!(s.top_location, "Goa");
        assert_eq!(s.top_category, "Hotel");

        let empty = summary(&[]);
        assert_eq!(empty.top_location, NO_DATA);
        assert_eq!(empty.top_category, NO_DATA);

        let status = budget_status(&records, 10000);
        assert_eq!(status.remaining, -1000);
        assert!(status.is_over_budget());
    }

    #[test]
    fn test_sums_clamp_instead_of_overflowing() {
        let records = vec![
            record(1, "2024-01-01", Category::Hotel, "Goa", i64::MAX - 10),
            record(2, "2024-02-01", Category::Hotel, "Goa", 100),
            record(3, "2024-02-02", Category::Food, "Pune", 50),
        ];
        assert_eq!(total(&records), i64::MAX);
        assert_eq!(group_sum(&records, category_key)[&Category::Hotel], i64::MAX);
        assert_eq!(group_sum(&records, location_key)[&"Goa".to_string()], i64::MAX);

        let s = summary(&records);
        assert_eq!(s.total, i64::MAX);
        assert_eq!(s.top_location, "Goa");

        let shares = category_shares(&records);
        assert_eq!(shares[0].total, i64::MAX);
        assert_eq!(shares[0].count, 2);

        let status = budget_status(&records, -100);
        assert_eq!(status.remaining, i64::MIN);
        assert!(status.is_over_budget());
    }
}
