//! The backend API surface the client core depends on.

use async_trait::async_trait;
use canteen_common::AppResult;
use chrono::NaiveDate;

use crate::types::{
    Category, Dish, FeedbackEntry, ImageUpload, NewDish, NewDishFeedback, NewSystemFeedback,
    Paginated, PollHistory, Vote, VotePoll, VoteReceipt, Wish, WishTally,
};

/// REST API consumed by the session state machines.
///
/// `Option` return types mark endpoints where absence is a legal empty state
/// (no poll today, no vote yet, no wish yet) rather than a failure.
///
/// Implementations must never retry a mutating call: a duplicate
/// cast/change/submit is not safe to replay blindly.
#[async_trait]
pub trait CanteenApi: Send + Sync {
    // === Voter: results & votes ===

    /// Current poll's candidates with live vote counts. Public.
    async fn results_today(&self) -> AppResult<Option<VotePoll>>;

    /// Future poll(s) with per-candidate selection flags. Public.
    async fn results_upcoming(&self) -> AppResult<Vec<VotePoll>>;

    /// The caller's existing vote for today's poll, if any.
    async fn my_vote_today(&self) -> AppResult<Option<Vote>>;

    /// Cast a new vote. Must only be called when the caller has no vote in
    /// the active poll; a second cast is a [`Self::change_vote`].
    async fn cast_vote(&self, dish_id: i64) -> AppResult<VoteReceipt>;

    /// Change the caller's existing vote to another candidate.
    async fn change_vote(&self, dish_id: i64) -> AppResult<VoteReceipt>;

    /// A past poll together with the caller's historical vote.
    async fn vote_history(&self, date: NaiveDate) -> AppResult<Option<PollHistory>>;

    // === Wishlist ===

    /// The caller's standing wish, if any.
    async fn my_wish(&self) -> AppResult<Option<Wish>>;

    /// Reassign the caller's wish. Cooldown-gated server-side: rejected with
    /// [`canteen_common::AppError::CooldownActive`] inside the cooldown.
    async fn change_wish(&self, dish_id: i64) -> AppResult<Wish>;

    /// Full per-dish wish-count table.
    async fn wish_tallies(&self) -> AppResult<Vec<WishTally>>;

    // === Staff: poll curation & live tally ===

    /// Staff live-tally view of today's poll.
    async fn poll_today(&self) -> AppResult<Option<VotePoll>>;

    /// The staff draft/pending poll for a meal date, if one exists.
    async fn pending_poll(&self, meal_date: NaiveDate) -> AppResult<Option<VotePoll>>;

    /// Create a poll for a future meal date.
    async fn create_poll(&self, meal_date: NaiveDate, dish_ids: &[i64]) -> AppResult<VotePoll>;

    /// Replace a pending poll's dish set.
    async fn edit_poll(&self, poll_id: i64, dish_ids: &[i64]) -> AppResult<VotePoll>;

    /// Delete a pending poll.
    async fn delete_poll(&self, poll_id: i64) -> AppResult<()>;

    // === Catalog ===

    /// Category reference list. Public.
    async fn categories(&self) -> AppResult<Vec<Category>>;

    /// Paginated dish catalog. Public.
    async fn dishes(&self, page: u32) -> AppResult<Paginated<Dish>>;

    /// Paginated dishes within one category. Public.
    async fn dishes_by_category(&self, category_id: i64, page: u32) -> AppResult<Paginated<Dish>>;

    /// Highest-rated dishes. Public.
    async fn dishes_most_rated(&self) -> AppResult<Vec<Dish>>;

    /// Most-wished dishes. Public.
    async fn dishes_most_favorited(&self) -> AppResult<Vec<Dish>>;

    /// Staff: add a dish to the catalog (multipart when an image is given).
    async fn create_dish(&self, dish: NewDish, image: Option<ImageUpload>) -> AppResult<Dish>;

    /// Staff: update a catalog dish.
    async fn update_dish(
        &self,
        dish_id: i64,
        dish: NewDish,
        image: Option<ImageUpload>,
    ) -> AppResult<Dish>;

    /// Staff: remove a catalog dish.
    async fn delete_dish(&self, dish_id: i64) -> AppResult<()>;

    // === Feedback ===

    /// General feedback entries. Public.
    async fn system_feedback(&self) -> AppResult<Vec<FeedbackEntry>>;

    /// Submit general feedback. Public, append-only.
    async fn submit_system_feedback(&self, feedback: NewSystemFeedback)
    -> AppResult<FeedbackEntry>;

    /// Feedback entries for one dish. Public.
    async fn dish_feedback(&self, dish_id: i64) -> AppResult<Vec<FeedbackEntry>>;

    /// Submit dish-scoped feedback. Public, append-only.
    async fn submit_dish_feedback(
        &self,
        dish_id: i64,
        feedback: NewDishFeedback,
    ) -> AppResult<FeedbackEntry>;
}
