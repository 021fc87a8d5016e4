//! In-memory fake backend for tests.
//!
//! Unlike a per-call stub, [`MockApi`] behaves like the real server for the
//! rules the client must respect: it enforces one vote per (user, poll),
//! one wish per user, the pending-only poll edit/delete rule, and a
//! programmable wish cooldown. Every call is recorded so tests can assert
//! that a rejected action issued no network traffic at all.

use async_trait::async_trait;
use canteen_common::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::api::CanteenApi;
use crate::types::{
    CandidateDish, Category, Dish, FeedbackEntry, ImageUpload, NewDish, NewDishFeedback,
    NewSystemFeedback, Paginated, PollHistory, PollStatus, Vote, VotePoll, VoteReceipt, Wish,
    WishTally,
};

/// Mutable world state of the fake backend.
#[derive(Debug, Default)]
pub struct MockState {
    /// Today's poll, served by both the voter and staff "today" endpoints.
    pub today: Option<VotePoll>,
    /// The caller's vote in today's poll.
    pub my_vote: Option<Vote>,
    /// The caller's standing wish.
    pub my_wish: Option<Wish>,
    /// When set, the next `change_wish` is rejected with this many seconds
    /// remaining, mirroring the server's 403 answer.
    pub wish_cooldown_remaining: Option<u64>,
    /// Per-dish wish totals.
    pub tallies: Vec<WishTally>,
    /// Pending polls by meal date.
    pub pending: HashMap<NaiveDate, VotePoll>,
    /// Historical polls by meal date.
    pub history: HashMap<NaiveDate, PollHistory>,
    /// Category reference data.
    pub categories: Vec<Category>,
    /// Dish catalog.
    pub dishes: Vec<Dish>,
    /// Feedback entries, append-only.
    pub feedback: Vec<FeedbackEntry>,
    /// One-shot error injected into the next call, whatever it is.
    pub fail_next: Option<AppError>,
    /// One-shot error injected into the next call with the given name;
    /// other calls pass through untouched.
    pub fail_on: Option<(String, AppError)>,
    /// Names of every API call made, in order.
    pub calls: Vec<String>,
    next_id: i64,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn dish(&mut self, dish_id: i64) -> Dish {
        self.dishes
            .iter()
            .find(|d| d.id == dish_id)
            .cloned()
            .unwrap_or_else(|| test_dish(dish_id, 1))
    }
}

/// Build a minimal catalog dish for fixtures.
#[must_use]
pub fn test_dish(id: i64, category_id: i64) -> Dish {
    Dish {
        id,
        name_en: format!("dish-{id}"),
        name_kh: None,
        description_en: None,
        description_kh: None,
        ingredients_en: None,
        ingredients_kh: None,
        image_url: None,
        category_id,
    }
}

/// Build a poll from dish ids with zeroed counts.
#[must_use]
pub fn test_poll(
    vote_poll_id: i64,
    meal_date: NaiveDate,
    status: PollStatus,
    dish_ids: &[i64],
) -> VotePoll {
    VotePoll {
        vote_poll_id,
        meal_date,
        vote_date: None,
        status,
        candidates: dish_ids
            .iter()
            .map(|&id| CandidateDish {
                dish: test_dish(id, 1),
                vote_count: 0,
                selected: None,
            })
            .collect(),
    }
}

/// In-memory fake implementation of [`CanteenApi`].
#[derive(Debug, Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    /// Empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the world for setup or assertions.
    #[allow(clippy::expect_used)]
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock poisoned")
    }

    /// Names of every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Record a call, honoring an injected one-shot failure.
    fn enter(&self, name: &str) -> AppResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(name.to_string());
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        if let Some((target, err)) = state.fail_on.take() {
            if target == name {
                return Err(err);
            }
            state.fail_on = Some((target, err));
        }
        Ok(state)
    }
}

fn bump_count(poll: &mut VotePoll, dish_id: i64, delta: i64) {
    if let Some(candidate) = poll.candidates.iter_mut().find(|c| c.dish.id == dish_id) {
        candidate.vote_count += delta;
    }
}

#[async_trait]
impl CanteenApi for MockApi {
    async fn results_today(&self) -> AppResult<Option<VotePoll>> {
        let state = self.enter("results_today")?;
        Ok(state.today.clone())
    }

    async fn results_upcoming(&self) -> AppResult<Vec<VotePoll>> {
        let state = self.enter("results_upcoming")?;
        Ok(state.pending.values().cloned().collect())
    }

    async fn my_vote_today(&self) -> AppResult<Option<Vote>> {
        let state = self.enter("my_vote_today")?;
        Ok(state.my_vote.clone())
    }

    async fn cast_vote(&self, dish_id: i64) -> AppResult<VoteReceipt> {
        let mut state = self.enter("cast_vote")?;
        // One vote per (user, poll): a second create is a server-side
        // conflict, exactly what the session must never trigger.
        if state.my_vote.is_some() {
            return Err(AppError::Conflict(
                "vote already exists for this poll".to_string(),
            ));
        }
        let Some(mut poll) = state.today.clone() else {
            return Err(AppError::NotFound("no poll today".to_string()));
        };
        if poll.status != PollStatus::Open {
            return Err(AppError::Forbidden("voting is not open".to_string()));
        }
        if !poll.has_candidate(dish_id) {
            return Err(AppError::NotFound("dish is not a candidate".to_string()));
        }

        bump_count(&mut poll, dish_id, 1);
        let vote = Vote {
            id: state.next_id(),
            vote_poll_id: poll.vote_poll_id,
            dish_id,
            user_id: 1,
        };
        state.my_vote = Some(vote.clone());
        state.today = Some(poll.clone());
        Ok(VoteReceipt { vote, poll })
    }

    async fn change_vote(&self, dish_id: i64) -> AppResult<VoteReceipt> {
        let mut state = self.enter("change_vote")?;
        let Some(mut vote) = state.my_vote.clone() else {
            return Err(AppError::NotFound("no vote to change".to_string()));
        };
        let Some(mut poll) = state.today.clone() else {
            return Err(AppError::NotFound("no poll today".to_string()));
        };
        if poll.status != PollStatus::Open {
            return Err(AppError::Forbidden("voting is not open".to_string()));
        }
        if !poll.has_candidate(dish_id) {
            return Err(AppError::NotFound("dish is not a candidate".to_string()));
        }

        // The same row is updated; no second row ever exists.
        bump_count(&mut poll, vote.dish_id, -1);
        bump_count(&mut poll, dish_id, 1);
        vote.dish_id = dish_id;
        state.my_vote = Some(vote.clone());
        state.today = Some(poll.clone());
        Ok(VoteReceipt { vote, poll })
    }

    async fn vote_history(&self, date: NaiveDate) -> AppResult<Option<PollHistory>> {
        let state = self.enter("vote_history")?;
        Ok(state.history.get(&date).cloned())
    }

    async fn my_wish(&self) -> AppResult<Option<Wish>> {
        let state = self.enter("my_wish")?;
        Ok(state.my_wish.clone())
    }

    async fn change_wish(&self, dish_id: i64) -> AppResult<Wish> {
        let mut state = self.enter("change_wish")?;
        if let Some(remaining_seconds) = state.wish_cooldown_remaining {
            return Err(AppError::CooldownActive { remaining_seconds });
        }

        let previous = state.my_wish.take();
        if let Some(previous) = &previous
            && let Some(tally) = state.tallies.iter_mut().find(|t| t.dish_id == previous.dish_id)
        {
            tally.total_wishes -= 1;
        }
        match state.tallies.iter_mut().find(|t| t.dish_id == dish_id) {
            Some(tally) => tally.total_wishes += 1,
            None => state.tallies.push(WishTally {
                dish_id,
                total_wishes: 1,
            }),
        }

        let wish = Wish {
            dish_id,
            updated_at: Utc::now(),
        };
        state.my_wish = Some(wish.clone());
        Ok(wish)
    }

    async fn wish_tallies(&self) -> AppResult<Vec<WishTally>> {
        let state = self.enter("wish_tallies")?;
        Ok(state.tallies.clone())
    }

    async fn poll_today(&self) -> AppResult<Option<VotePoll>> {
        let state = self.enter("poll_today")?;
        Ok(state.today.clone())
    }

    async fn pending_poll(&self, meal_date: NaiveDate) -> AppResult<Option<VotePoll>> {
        let state = self.enter("pending_poll")?;
        Ok(state.pending.get(&meal_date).cloned())
    }

    async fn create_poll(&self, meal_date: NaiveDate, dish_ids: &[i64]) -> AppResult<VotePoll> {
        let mut state = self.enter("create_poll")?;
        if state.pending.contains_key(&meal_date) {
            return Err(AppError::Conflict(
                "a poll already exists for this date".to_string(),
            ));
        }

        let id = state.next_id();
        let candidates = dish_ids
            .iter()
            .map(|&dish_id| CandidateDish {
                dish: state.dish(dish_id),
                vote_count: 0,
                selected: None,
            })
            .collect();
        let poll = VotePoll {
            vote_poll_id: id,
            meal_date,
            vote_date: None,
            status: PollStatus::Pending,
            candidates,
        };
        state.pending.insert(meal_date, poll.clone());
        Ok(poll)
    }

    async fn edit_poll(&self, poll_id: i64, dish_ids: &[i64]) -> AppResult<VotePoll> {
        let mut state = self.enter("edit_poll")?;
        let Some(date) = state
            .pending
            .iter()
            .find(|(_, p)| p.vote_poll_id == poll_id)
            .map(|(date, _)| *date)
        else {
            return Err(AppError::NotFound("poll not found".to_string()));
        };

        let candidates: Vec<CandidateDish> = dish_ids
            .iter()
            .map(|&dish_id| CandidateDish {
                dish: state.dish(dish_id),
                vote_count: 0,
                selected: None,
            })
            .collect();

        #[allow(clippy::expect_used)]
        let poll = state.pending.get_mut(&date).expect("pending poll vanished");
        if poll.status != PollStatus::Pending {
            return Err(AppError::Conflict("poll is no longer pending".to_string()));
        }
        poll.candidates = candidates;
        Ok(poll.clone())
    }

    async fn delete_poll(&self, poll_id: i64) -> AppResult<()> {
        let mut state = self.enter("delete_poll")?;
        let Some(date) = state
            .pending
            .iter()
            .find(|(_, p)| p.vote_poll_id == poll_id)
            .map(|(date, _)| *date)
        else {
            return Err(AppError::NotFound("poll not found".to_string()));
        };
        if state.pending[&date].status != PollStatus::Pending {
            return Err(AppError::Conflict("poll is no longer pending".to_string()));
        }
        state.pending.remove(&date);
        Ok(())
    }

    async fn categories(&self) -> AppResult<Vec<Category>> {
        let state = self.enter("categories")?;
        Ok(state.categories.clone())
    }

    async fn dishes(&self, page: u32) -> AppResult<Paginated<Dish>> {
        let state = self.enter("dishes")?;
        Ok(Paginated {
            items: state.dishes.clone(),
            page,
            per_page: state.dishes.len() as u32,
            total: state.dishes.len() as u64,
        })
    }

    async fn dishes_by_category(&self, category_id: i64, page: u32) -> AppResult<Paginated<Dish>> {
        let state = self.enter("dishes_by_category")?;
        let items: Vec<Dish> = state
            .dishes
            .iter()
            .filter(|d| d.category_id == category_id)
            .cloned()
            .collect();
        Ok(Paginated {
            page,
            per_page: items.len() as u32,
            total: items.len() as u64,
            items,
        })
    }

    async fn dishes_most_rated(&self) -> AppResult<Vec<Dish>> {
        let state = self.enter("dishes_most_rated")?;
        Ok(state.dishes.clone())
    }

    async fn dishes_most_favorited(&self) -> AppResult<Vec<Dish>> {
        let state = self.enter("dishes_most_favorited")?;
        Ok(state.dishes.clone())
    }

    async fn create_dish(&self, dish: NewDish, _image: Option<ImageUpload>) -> AppResult<Dish> {
        let mut state = self.enter("create_dish")?;
        if state.dishes.iter().any(|d| d.name_en == dish.name_en) {
            return Err(AppError::Conflict("duplicate dish name".to_string()));
        }
        let id = state.next_id();
        let created = Dish {
            id,
            name_en: dish.name_en,
            name_kh: dish.name_kh,
            description_en: dish.description_en,
            description_kh: dish.description_kh,
            ingredients_en: dish.ingredients_en,
            ingredients_kh: dish.ingredients_kh,
            image_url: None,
            category_id: dish.category_id,
        };
        state.dishes.push(created.clone());
        Ok(created)
    }

    async fn update_dish(
        &self,
        dish_id: i64,
        dish: NewDish,
        _image: Option<ImageUpload>,
    ) -> AppResult<Dish> {
        let mut state = self.enter("update_dish")?;
        if state
            .dishes
            .iter()
            .any(|d| d.id != dish_id && d.name_en == dish.name_en)
        {
            return Err(AppError::Conflict("duplicate dish name".to_string()));
        }
        let Some(existing) = state.dishes.iter_mut().find(|d| d.id == dish_id) else {
            return Err(AppError::NotFound("dish not found".to_string()));
        };
        existing.name_en = dish.name_en;
        existing.name_kh = dish.name_kh;
        existing.description_en = dish.description_en;
        existing.description_kh = dish.description_kh;
        existing.ingredients_en = dish.ingredients_en;
        existing.ingredients_kh = dish.ingredients_kh;
        existing.category_id = dish.category_id;
        Ok(existing.clone())
    }

    async fn delete_dish(&self, dish_id: i64) -> AppResult<()> {
        let mut state = self.enter("delete_dish")?;
        let before = state.dishes.len();
        state.dishes.retain(|d| d.id != dish_id);
        if state.dishes.len() == before {
            return Err(AppError::NotFound("dish not found".to_string()));
        }
        Ok(())
    }

    async fn system_feedback(&self) -> AppResult<Vec<FeedbackEntry>> {
        let state = self.enter("system_feedback")?;
        Ok(state.feedback.clone())
    }

    async fn submit_system_feedback(
        &self,
        feedback: NewSystemFeedback,
    ) -> AppResult<FeedbackEntry> {
        let mut state = self.enter("submit_system_feedback")?;
        let entry = FeedbackEntry {
            id: state.next_id(),
            canteen_rating: feedback.canteen_rating,
            system_rating: feedback.system_rating,
            food_rating: None,
            content: feedback.content,
            created_at: Utc::now(),
        };
        state.feedback.push(entry.clone());
        Ok(entry)
    }

    async fn dish_feedback(&self, _dish_id: i64) -> AppResult<Vec<FeedbackEntry>> {
        let state = self.enter("dish_feedback")?;
        Ok(state.feedback.clone())
    }

    async fn submit_dish_feedback(
        &self,
        _dish_id: i64,
        feedback: NewDishFeedback,
    ) -> AppResult<FeedbackEntry> {
        let mut state = self.enter("submit_dish_feedback")?;
        let entry = FeedbackEntry {
            id: state.next_id(),
            canteen_rating: None,
            system_rating: None,
            food_rating: feedback.food_rating,
            content: feedback.content,
            created_at: Utc::now(),
        };
        state.feedback.push(entry.clone());
        Ok(entry)
    }
}
