//! Result aggregation for chart rendering.
//!
//! Pure derivations over candidate dishes with live vote counts. Ranking is
//! a stable descending sort: equal counts keep the order the backend
//! returned them in (no secondary key is defined by the contract).

use canteen_client::types::{CandidateDish, Category};
use serde::Serialize;

/// Stable descending sort by vote count.
#[must_use]
pub fn rank(items: &[CandidateDish]) -> Vec<CandidateDish> {
    let mut ranked = items.to_vec();
    ranked.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
    ranked
}

/// First `n` of [`rank`].
#[must_use]
pub fn top_n(items: &[CandidateDish], n: usize) -> Vec<CandidateDish> {
    let mut ranked = rank(items);
    ranked.truncate(n);
    ranked
}

/// One proportional bar/donut segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub dish_id: i64,
    pub vote_count: i64,
    /// Percent of the largest observed count, 0.0–100.0.
    pub percent: f64,
}

/// Each item's share of the largest count, as a percentage.
///
/// The divisor is `max(largest count, floor)`; the floor keeps all-zero
/// inputs from dividing by zero and keeps tiny totals from rendering as
/// full-width bars.
#[must_use]
pub fn percentage_of_max(items: &[CandidateDish], floor: i64) -> Vec<ChartSlice> {
    let observed = items.iter().map(|c| c.vote_count).max().unwrap_or(0);
    let divisor = observed.max(floor).max(1);

    items
        .iter()
        .map(|c| ChartSlice {
            dish_id: c.dish.id,
            vote_count: c.vote_count,
            percent: (c.vote_count as f64 / divisor as f64) * 100.0,
        })
        .collect()
}

/// Candidates of one category, independently ranked.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBucket {
    pub category: Category,
    /// Sum of vote counts in this bucket.
    pub total: i64,
    pub items: Vec<CandidateDish>,
}

/// Bucket candidates by category, rank each bucket, and order the buckets by
/// bucket total descending. Categories without candidates are omitted.
#[must_use]
pub fn group_by_category(items: &[CandidateDish], categories: &[Category]) -> Vec<CategoryBucket> {
    let mut buckets: Vec<CategoryBucket> = categories
        .iter()
        .filter_map(|category| {
            let members: Vec<CandidateDish> = items
                .iter()
                .filter(|c| c.dish.category_id == category.id)
                .cloned()
                .collect();
            if members.is_empty() {
                return None;
            }
            Some(CategoryBucket {
                category: category.clone(),
                total: members.iter().map(|c| c.vote_count).sum(),
                items: rank(&members),
            })
        })
        .collect();

    buckets.sort_by(|a, b| b.total.cmp(&a.total));
    buckets
}
