//! Feedback submission.
//!
//! Ratings are 1–5, free text is capped at 250 characters; both are checked
//! client-side before anything is sent. Entries are append-only.

use canteen_client::CanteenApi;
use canteen_client::types::{FeedbackEntry, NewDishFeedback, NewSystemFeedback};
use canteen_common::AppResult;
use validator::Validate;

/// Maximum free-text length, in characters.
pub const MAX_CONTENT_CHARS: u64 = 250;

/// General (canteen/system) feedback being composed.
#[derive(Debug, Clone, Default, Validate)]
pub struct SystemFeedbackDraft {
    /// Canteen rating, 1–5.
    #[validate(range(min = 1, max = 5))]
    pub canteen_rating: Option<u8>,
    /// Voting-system rating, 1–5.
    #[validate(range(min = 1, max = 5))]
    pub system_rating: Option<u8>,
    /// Free text, at most [`MAX_CONTENT_CHARS`] characters.
    #[validate(length(max = 250))]
    pub content: String,
}

/// Dish-scoped feedback being composed.
#[derive(Debug, Clone, Default, Validate)]
pub struct DishFeedbackDraft {
    /// Food rating, 1–5.
    #[validate(range(min = 1, max = 5))]
    pub food_rating: Option<u8>,
    /// Free text, at most [`MAX_CONTENT_CHARS`] characters.
    #[validate(length(max = 250))]
    pub content: String,
}

/// Validate and submit general feedback.
pub async fn submit_system_feedback(
    api: &dyn CanteenApi,
    draft: SystemFeedbackDraft,
) -> AppResult<FeedbackEntry> {
    draft.validate()?;
    api.submit_system_feedback(NewSystemFeedback {
        canteen_rating: draft.canteen_rating,
        system_rating: draft.system_rating,
        content: draft.content,
    })
    .await
}

/// Validate and submit feedback for one dish.
pub async fn submit_dish_feedback(
    api: &dyn CanteenApi,
    dish_id: i64,
    draft: DishFeedbackDraft,
) -> AppResult<FeedbackEntry> {
    draft.validate()?;
    api.submit_dish_feedback(
        dish_id,
        NewDishFeedback {
            food_rating: draft.food_rating,
            content: draft.content,
        },
    )
    .await
}
