//! Normalized wire types.
//!
//! The backend spells some fields several ways depending on the endpoint
//! (`voteCount` vs `vote_count`, candidate dishes nested under `Dish`, ...).
//! Every alias is absorbed here with serde attributes so the rest of the
//! workspace sees exactly one shape per entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A menu item. Immutable from the voting client's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    #[serde(alias = "nameEn", alias = "name")]
    pub name_en: String,
    #[serde(alias = "nameKh", default)]
    pub name_kh: Option<String>,
    #[serde(alias = "descriptionEn", default)]
    pub description_en: Option<String>,
    #[serde(alias = "descriptionKh", default)]
    pub description_kh: Option<String>,
    #[serde(alias = "ingredientsEn", default)]
    pub ingredients_en: Option<String>,
    #[serde(alias = "ingredientsKh", default)]
    pub ingredients_kh: Option<String>,
    #[serde(alias = "imageUrl", alias = "image", default)]
    pub image_url: Option<String>,
    #[serde(alias = "categoryId")]
    pub category_id: i64,
}

/// A grouping label for dishes. Read-only reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Lifecycle status of a vote poll. The client never transitions this
/// directly; staff actions are accepted or rejected server-side based on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Pending,
    Open,
    Closed,
    Finalized,
}

/// A dish included in a vote poll, carrying its live vote count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDish {
    #[serde(alias = "Dish")]
    pub dish: Dish,
    #[serde(alias = "voteCount", default)]
    pub vote_count: i64,
    /// Per-candidate selection flag on upcoming polls.
    #[serde(alias = "isSelected", default)]
    pub selected: Option<bool>,
}

/// The staff-curated candidate set for one meal date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotePoll {
    #[serde(alias = "votePollId", alias = "id")]
    pub vote_poll_id: i64,
    #[serde(alias = "mealDate")]
    pub meal_date: NaiveDate,
    /// The date voting occurs, when the backend reports it.
    #[serde(alias = "voteDate", default)]
    pub vote_date: Option<NaiveDate>,
    pub status: PollStatus,
    #[serde(alias = "dishes", default)]
    pub candidates: Vec<CandidateDish>,
}

impl VotePoll {
    /// Whether a dish is among this poll's candidates.
    #[must_use]
    pub fn has_candidate(&self, dish_id: i64) -> bool {
        self.candidates.iter().any(|c| c.dish.id == dish_id)
    }

    /// Candidate dish ids in poll order.
    #[must_use]
    pub fn dish_ids(&self) -> Vec<i64> {
        self.candidates.iter().map(|c| c.dish.id).collect()
    }
}

/// One voter's choice within exactly one poll.
///
/// Invariant (server-enforced): at most one row per (user, poll); a second
/// cast must be realized as an update of `dish_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    #[serde(alias = "votePollId")]
    pub vote_poll_id: i64,
    #[serde(alias = "dishId")]
    pub dish_id: i64,
    #[serde(alias = "userId")]
    pub user_id: i64,
}

/// Response to a vote cast/change: the updated vote row plus the poll with
/// refreshed counts. The client adopts these wholesale instead of applying
/// local increments, so concurrent voters stay consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub vote: Vote,
    pub poll: VotePoll,
}

/// A past poll together with the caller's historical vote, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollHistory {
    pub poll: VotePoll,
    #[serde(alias = "myVote", default)]
    pub my_vote: Option<Vote>,
}

/// The caller's single standing favorite dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wish {
    #[serde(alias = "dishId")]
    pub dish_id: i64,
    #[serde(alias = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Per-dish wish aggregate. Ranked total-wishes descending; ties keep the
/// server's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishTally {
    #[serde(alias = "dishId")]
    pub dish_id: i64,
    #[serde(alias = "totalWishes", alias = "count")]
    pub total_wishes: i64,
}

/// An anonymous rating/comment. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: i64,
    #[serde(alias = "canteenRating", default)]
    pub canteen_rating: Option<u8>,
    #[serde(alias = "systemRating", default)]
    pub system_rating: Option<u8>,
    #[serde(alias = "foodRating", default)]
    pub food_rating: Option<u8>,
    #[serde(default)]
    pub content: String,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// One page of a paginated catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(alias = "data")]
    pub items: Vec<T>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(alias = "perPage", default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
}

const fn first_page() -> u32 {
    1
}

/// Payload for staff dish create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDish {
    pub name_en: String,
    #[serde(default)]
    pub name_kh: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_kh: Option<String>,
    #[serde(default)]
    pub ingredients_en: Option<String>,
    #[serde(default)]
    pub ingredients_kh: Option<String>,
    pub category_id: i64,
}

/// Image part of a multipart dish upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Payload for general (canteen/system) feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSystemFeedback {
    #[serde(default)]
    pub canteen_rating: Option<u8>,
    #[serde(default)]
    pub system_rating: Option<u8>,
    #[serde(default)]
    pub content: String,
}

/// Payload for dish-scoped feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDishFeedback {
    #[serde(default)]
    pub food_rating: Option<u8>,
    #[serde(default)]
    pub content: String,
}

/// Remaining-seconds payload attached to a 403 cooldown rejection.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CooldownBody {
    #[serde(alias = "remainingSeconds")]
    pub remaining_seconds: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_dish_aliases() {
        // Candidate nested under `Dish` with camelCase count, as the results
        // endpoints return it.
        let raw = serde_json::json!({
            "Dish": {
                "id": 7,
                "name": "Amok Trey",
                "categoryId": 2
            },
            "voteCount": 41
        });
        let candidate: CandidateDish = serde_json::from_value(raw).unwrap();
        assert_eq!(candidate.dish.id, 7);
        assert_eq!(candidate.dish.name_en, "Amok Trey");
        assert_eq!(candidate.dish.category_id, 2);
        assert_eq!(candidate.vote_count, 41);
    }

    #[test]
    fn test_vote_poll_aliases_and_status() {
        let raw = serde_json::json!({
            "id": 3,
            "mealDate": "2025-06-10",
            "status": "pending",
            "dishes": []
        });
        let poll: VotePoll = serde_json::from_value(raw).unwrap();
        assert_eq!(poll.vote_poll_id, 3);
        assert_eq!(poll.status, PollStatus::Pending);
        assert!(poll.candidates.is_empty());
        assert!(poll.vote_date.is_none());
    }

    #[test]
    fn test_paginated_data_alias() {
        let raw = serde_json::json!({
            "data": [{ "id": 1, "name": "Soup" }],
            "page": 2,
            "perPage": 10,
            "total": 31
        });
        let page: Paginated<Category> = serde_json::from_value(raw).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page, 2);
        assert_eq!(page.per_page, 10);
    }

    #[test]
    fn test_cooldown_body_alias() {
        let body: CooldownBody =
            serde_json::from_value(serde_json::json!({ "remainingSeconds": 1799 })).unwrap();
        assert_eq!(body.remaining_seconds, 1799);
    }
}
