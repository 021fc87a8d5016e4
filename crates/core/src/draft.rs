//! Staff poll draft: curate the candidate set for a future meal date.
//!
//! State machine over Empty → Drafting → Submitted(pending) → Editing, with
//! Locked covering every poll whose persisted status is no longer `pending`.
//! All admission checks (weekend, submission window, minimum dish count) are
//! client-side pre-flight; the server re-validates and stays authoritative.

use canteen_client::CanteenApi;
use canteen_client::types::{Category, Dish, PollStatus, VotePoll};
use canteen_common::config::VotingConfig;
use canteen_common::{AppError, AppResult};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::window;

/// Where the draft is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftPhase {
    /// No draft and no persisted poll for the date.
    Empty,
    /// Selections accumulating; nothing persisted yet.
    Drafting,
    /// A pending poll exists server-side; the draft mirrors it.
    Submitted,
    /// Staff is mutating the persisted dish set.
    Editing,
    /// The poll left `pending` (open/closed/finalized); edit and delete are
    /// disabled regardless of client-side timers.
    Locked,
}

/// Outcome of a two-phase action (cancel-with-discard, delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftAction {
    /// Applied immediately.
    Done,
    /// User confirmation required before the action takes effect.
    NeedsConfirmation,
}

/// In-progress multi-select within one category.
///
/// Dishes already in the draft are disabled rather than re-addable; the
/// draft itself is untouched until [`StaffPollDraft::add_selected`] merges
/// the picks. Dropping the pick (Cancel) discards only the sub-selection.
#[derive(Debug, Clone)]
pub struct CategoryPick {
    category: Category,
    dishes: Vec<Dish>,
    disabled: HashSet<i64>,
    picked: Vec<i64>,
}

impl CategoryPick {
    /// The category being browsed.
    #[must_use]
    pub const fn category(&self) -> &Category {
        &self.category
    }

    /// Dishes on offer in this category.
    #[must_use]
    pub fn dishes(&self) -> &[Dish] {
        &self.dishes
    }

    /// Whether a dish is already in the draft and therefore not selectable.
    #[must_use]
    pub fn is_disabled(&self, dish_id: i64) -> bool {
        self.disabled.contains(&dish_id)
    }

    /// Currently picked (not yet merged) dish ids, in pick order.
    #[must_use]
    pub fn picked(&self) -> &[i64] {
        &self.picked
    }

    /// Toggle a dish in the sub-selection. Disabled and unknown dishes are
    /// ignored; returns whether the dish is picked afterwards.
    pub fn toggle(&mut self, dish_id: i64) -> bool {
        if self.is_disabled(dish_id) || !self.dishes.iter().any(|d| d.id == dish_id) {
            return false;
        }
        if let Some(index) = self.picked.iter().position(|&id| id == dish_id) {
            self.picked.remove(index);
            false
        } else {
            self.picked.push(dish_id);
            true
        }
    }
}

/// A staff member's in-progress candidate selection for one meal date.
pub struct StaffPollDraft {
    api: Arc<dyn CanteenApi>,
    rules: VotingConfig,
    meal_date: NaiveDate,
    phase: DraftPhase,
    selected: Vec<i64>,
    original: Vec<i64>,
    touched_categories: HashSet<i64>,
    persisted: Option<VotePoll>,
    awaiting_discard: bool,
    awaiting_delete: bool,
    in_flight: bool,
}

impl StaffPollDraft {
    /// Create a draft for a meal date; call [`Self::load`] to pick up any
    /// poll already persisted for it.
    #[must_use]
    pub fn new(api: Arc<dyn CanteenApi>, rules: VotingConfig, meal_date: NaiveDate) -> Self {
        Self {
            api,
            rules,
            meal_date,
            phase: DraftPhase::Empty,
            selected: Vec::new(),
            original: Vec::new(),
            touched_categories: HashSet::new(),
            persisted: None,
            awaiting_discard: false,
            awaiting_delete: false,
            in_flight: false,
        }
    }

    /// Fetch the authoritative state for this date.
    pub async fn load(&mut self) -> AppResult<()> {
        match self.api.pending_poll(self.meal_date).await? {
            Some(poll) => self.adopt(poll),
            None => {
                self.persisted = None;
                self.selected.clear();
                self.original.clear();
                self.phase = DraftPhase::Empty;
            }
        }
        Ok(())
    }

    /// The meal date this draft is for.
    #[must_use]
    pub const fn meal_date(&self) -> NaiveDate {
        self.meal_date
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> DraftPhase {
        self.phase
    }

    /// Selected dish ids, in selection order.
    #[must_use]
    pub fn selected(&self) -> &[i64] {
        &self.selected
    }

    /// The persisted poll, when one exists.
    #[must_use]
    pub const fn persisted(&self) -> Option<&VotePoll> {
        self.persisted.as_ref()
    }

    /// Whether the category has contributed dishes (checkmark affordance).
    #[must_use]
    pub fn is_category_touched(&self, category_id: i64) -> bool {
        self.touched_categories.contains(&category_id)
    }

    /// Whether a mutating call is still in flight. The triggering control
    /// must stay disabled; when the draft is shared behind interior
    /// mutability a re-entrant submit/save/delete is rejected with
    /// [`AppError::Busy`].
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Start drafting. Refused for weekend dates and once the submission
    /// window has closed.
    pub fn begin(&mut self, now: NaiveDateTime) -> AppResult<()> {
        if self.phase != DraftPhase::Empty {
            return Err(AppError::Validation(
                "a draft or poll already exists for this date".to_string(),
            ));
        }
        self.check_window(now)?;
        self.phase = DraftPhase::Drafting;
        Ok(())
    }

    /// Fetch a category's dishes for the picker sub-flow.
    pub async fn open_category(&self, category: Category) -> AppResult<CategoryPick> {
        let page = self.api.dishes_by_category(category.id, 1).await?;
        Ok(CategoryPick {
            category,
            disabled: self.selected.iter().copied().collect(),
            dishes: page.items,
            picked: Vec::new(),
        })
    }

    /// Merge a finished sub-selection into the draft (the picker's "Add
    /// Selected"). Duplicates are suppressed by identity; the category is
    /// recorded as touched when it contributed anything.
    pub fn add_selected(&mut self, pick: &CategoryPick) -> AppResult<()> {
        self.require_mutable()?;
        let mut contributed = false;
        for &dish_id in pick.picked() {
            if !self.selected.contains(&dish_id) {
                self.selected.push(dish_id);
                contributed = true;
            }
        }
        if contributed {
            self.touched_categories.insert(pick.category.id);
        }
        debug!(count = self.selected.len(), "draft selection updated");
        Ok(())
    }

    /// Remove one dish from the draft.
    pub fn remove_dish(&mut self, dish_id: i64) -> AppResult<()> {
        self.require_mutable()?;
        self.selected.retain(|&id| id != dish_id);
        Ok(())
    }

    /// Whether the edited selection differs from the persisted one:
    /// symmetric difference of the id sets is non-empty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let current: HashSet<i64> = self.selected.iter().copied().collect();
        let original: HashSet<i64> = self.original.iter().copied().collect();
        current != original
    }

    /// Submit the draft as a new poll. On success the server's persisted
    /// shape replaces the local draft.
    pub async fn submit(&mut self, now: NaiveDateTime) -> AppResult<()> {
        if self.phase != DraftPhase::Drafting {
            return Err(AppError::Validation("nothing to submit".to_string()));
        }
        self.check_window(now)?;
        self.check_dish_count()?;

        if self.in_flight {
            return Err(AppError::Busy);
        }
        self.in_flight = true;
        let result = self.api.create_poll(self.meal_date, &self.selected).await;
        self.in_flight = false;
        result?;

        info!(meal_date = %self.meal_date, "poll submitted");
        self.refetch().await
    }

    /// Enter edit mode on the pending poll, seeding the draft from the
    /// persisted dish list.
    pub fn enter_edit(&mut self, now: NaiveDateTime) -> AppResult<()> {
        let Some(poll) = &self.persisted else {
            return Err(AppError::Validation("no poll to edit".to_string()));
        };
        if poll.status != PollStatus::Pending {
            self.phase = DraftPhase::Locked;
            return Err(AppError::Validation(
                "poll is no longer pending and cannot be edited".to_string(),
            ));
        }
        if self.phase != DraftPhase::Submitted {
            return Err(AppError::Validation("not in a state to edit".to_string()));
        }
        self.check_window(now)?;

        self.original = poll.dish_ids();
        self.selected.clone_from(&self.original);
        self.phase = DraftPhase::Editing;
        Ok(())
    }

    /// Persist the edited dish set and leave edit mode.
    pub async fn save_changes(&mut self, now: NaiveDateTime) -> AppResult<()> {
        if self.phase != DraftPhase::Editing {
            return Err(AppError::Validation("not editing".to_string()));
        }
        let Some(poll_id) = self.persisted.as_ref().map(|p| p.vote_poll_id) else {
            return Err(AppError::Validation("no poll to edit".to_string()));
        };
        self.check_window(now)?;
        self.check_dish_count()?;

        if self.in_flight {
            return Err(AppError::Busy);
        }
        self.in_flight = true;
        let result = self.api.edit_poll(poll_id, &self.selected).await;
        self.in_flight = false;
        result?;

        info!(poll_id, "poll edited");
        self.refetch().await
    }

    /// Leave edit mode. A dirty draft needs explicit confirmation (the
    /// "discard changes?" prompt) via [`Self::confirm_cancel_edit`]; a clean
    /// one reverts immediately.
    pub fn cancel_edit(&mut self) -> AppResult<DraftAction> {
        if self.phase != DraftPhase::Editing {
            return Err(AppError::Validation("not editing".to_string()));
        }
        if self.is_dirty() {
            self.awaiting_discard = true;
            return Ok(DraftAction::NeedsConfirmation);
        }
        self.revert_edit();
        Ok(DraftAction::Done)
    }

    /// Discard confirmed: revert to the persisted dish list.
    pub fn confirm_cancel_edit(&mut self) -> AppResult<()> {
        if !self.awaiting_discard {
            return Err(AppError::Validation("no discard to confirm".to_string()));
        }
        self.revert_edit();
        Ok(())
    }

    /// Keep editing (the prompt's "no").
    pub fn keep_editing(&mut self) {
        self.awaiting_discard = false;
    }

    /// Request deletion of the pending poll. Always two-phase.
    pub fn request_delete(&mut self) -> AppResult<DraftAction> {
        let Some(poll) = &self.persisted else {
            return Err(AppError::Validation("no poll to delete".to_string()));
        };
        if poll.status != PollStatus::Pending {
            self.phase = DraftPhase::Locked;
            return Err(AppError::Validation(
                "poll is no longer pending and cannot be deleted".to_string(),
            ));
        }
        self.awaiting_delete = true;
        Ok(DraftAction::NeedsConfirmation)
    }

    /// Deletion confirmed: delete server-side and clear all local state.
    pub async fn confirm_delete(&mut self) -> AppResult<()> {
        if !self.awaiting_delete {
            return Err(AppError::Validation("no delete to confirm".to_string()));
        }
        self.awaiting_delete = false;
        let Some(poll_id) = self.persisted.as_ref().map(|p| p.vote_poll_id) else {
            return Err(AppError::Validation("no poll to delete".to_string()));
        };

        if self.in_flight {
            return Err(AppError::Busy);
        }
        self.in_flight = true;
        let result = self.api.delete_poll(poll_id).await;
        self.in_flight = false;
        result?;

        info!(poll_id, "poll deleted");
        self.persisted = None;
        self.selected.clear();
        self.original.clear();
        self.touched_categories.clear();
        self.phase = DraftPhase::Empty;
        Ok(())
    }

    /// Abandon the delete (the prompt's "no").
    pub fn cancel_delete(&mut self) {
        self.awaiting_delete = false;
    }

    fn adopt(&mut self, poll: VotePoll) {
        self.selected = poll.dish_ids();
        self.original.clone_from(&self.selected);
        self.phase = if poll.status == PollStatus::Pending {
            DraftPhase::Submitted
        } else {
            DraftPhase::Locked
        };
        self.persisted = Some(poll);
        self.awaiting_discard = false;
        self.awaiting_delete = false;
    }

    /// The server is the source of truth for the persisted shape.
    async fn refetch(&mut self) -> AppResult<()> {
        match self.api.pending_poll(self.meal_date).await? {
            Some(poll) => self.adopt(poll),
            None => {
                self.persisted = None;
                self.phase = DraftPhase::Empty;
            }
        }
        Ok(())
    }

    fn revert_edit(&mut self) {
        self.selected.clone_from(&self.original);
        self.awaiting_discard = false;
        self.phase = DraftPhase::Submitted;
    }

    fn require_mutable(&self) -> AppResult<()> {
        match self.phase {
            DraftPhase::Drafting | DraftPhase::Editing => Ok(()),
            _ => Err(AppError::Validation(
                "draft is not open for selection".to_string(),
            )),
        }
    }

    fn check_window(&self, now: NaiveDateTime) -> AppResult<()> {
        if window::is_weekend(self.meal_date) {
            return Err(AppError::Validation(
                "weekend dates are not eligible for polls".to_string(),
            ));
        }
        if !window::is_open(now, self.meal_date, self.rules.submission_deadline_hour) {
            return Err(AppError::Validation(
                "the submission window for this date has closed".to_string(),
            ));
        }
        Ok(())
    }

    fn check_dish_count(&self) -> AppResult<()> {
        let distinct: HashSet<i64> = self.selected.iter().copied().collect();
        if distinct.len() < self.rules.min_poll_dishes {
            return Err(AppError::Validation(format!(
                "select at least {} dishes",
                self.rules.min_poll_dishes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use canteen_client::MockApi;
    use canteen_client::mock::{test_dish, test_poll};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    // 2025-06-10 is a Tuesday; window open at 2025-06-08 noon.
    fn meal() -> NaiveDate {
        date("2025-06-10")
    }

    fn now_open() -> NaiveDateTime {
        at("2025-06-08T12:00:00")
    }

    fn draft(api: &Arc<MockApi>) -> StaffPollDraft {
        StaffPollDraft::new(
            Arc::clone(api) as Arc<dyn CanteenApi>,
            VotingConfig::default(),
            meal(),
        )
    }

    fn catalog(api: &MockApi) {
        let mut state = api.state();
        state.categories = vec![
            Category { id: 1, name: "Soup".to_string() },
            Category { id: 2, name: "Grill".to_string() },
        ];
        state.dishes = vec![
            test_dish(1, 1),
            test_dish(2, 1),
            test_dish(3, 2),
            test_dish(4, 2),
        ];
    }

    fn soup() -> Category {
        Category { id: 1, name: "Soup".to_string() }
    }

    fn grill() -> Category {
        Category { id: 2, name: "Grill".to_string() }
    }

    async fn drafted_with(api: &Arc<MockApi>, dish_ids: &[i64]) -> StaffPollDraft {
        let mut d = draft(api);
        d.load().await.unwrap();
        d.begin(now_open()).unwrap();
        for category in [soup(), grill()] {
            let mut pick = d.open_category(category).await.unwrap();
            for &id in dish_ids {
                pick.toggle(id);
            }
            d.add_selected(&pick).unwrap();
        }
        d
    }

    #[tokio::test]
    async fn test_weekend_date_refused() {
        let api = Arc::new(MockApi::new());
        let mut d = StaffPollDraft::new(
            Arc::clone(&api) as Arc<dyn CanteenApi>,
            VotingConfig::default(),
            date("2025-06-07"), // Saturday
        );
        let err = d.begin(at("2025-06-05T12:00:00")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(d.phase(), DraftPhase::Empty);
    }

    #[tokio::test]
    async fn test_expired_window_refused() {
        let api = Arc::new(MockApi::new());
        let mut d = draft(&api);
        // After 06:00 on the day before.
        let err = d.begin(at("2025-06-09T07:00:00")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_picker_disables_drafted_dishes_and_dedupes() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = draft(&api);
        d.load().await.unwrap();
        d.begin(now_open()).unwrap();

        let mut pick = d.open_category(soup()).await.unwrap();
        assert!(pick.toggle(1));
        assert!(pick.toggle(2));
        d.add_selected(&pick).unwrap();
        assert_eq!(d.selected(), &[1, 2]);
        assert!(d.is_category_touched(1));

        // Revisit the category: drafted dishes come back disabled.
        let mut pick = d.open_category(soup()).await.unwrap();
        assert!(pick.is_disabled(1));
        assert!(!pick.toggle(1), "disabled dishes are not pickable");
        d.add_selected(&pick).unwrap();
        assert_eq!(d.selected(), &[1, 2], "no duplicates across visits");
    }

    #[tokio::test]
    async fn test_cancelled_pick_leaves_draft_untouched() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = draft(&api);
        d.load().await.unwrap();
        d.begin(now_open()).unwrap();

        let mut pick = d.open_category(grill()).await.unwrap();
        pick.toggle(3);
        drop(pick); // Cancel: sub-selection discarded, draft unaffected.
        assert!(d.selected().is_empty());
        assert!(!d.is_category_touched(2));
    }

    #[tokio::test]
    async fn test_insufficient_dishes_blocks_submit_without_network() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = drafted_with(&api, &[1, 2]).await;
        let calls_before = api.calls().len();

        let err = d.submit(now_open()).await.unwrap_err();
        match err {
            AppError::Validation(message) => {
                assert!(message.contains("at least 3 dishes"), "got: {message}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(api.calls().len(), calls_before, "no network call made");
        assert_eq!(d.phase(), DraftPhase::Drafting);
    }

    #[tokio::test]
    async fn test_submit_refetches_authoritative_state() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = drafted_with(&api, &[1, 2, 3]).await;

        d.submit(now_open()).await.unwrap();
        assert_eq!(d.phase(), DraftPhase::Submitted);
        let persisted = d.persisted().unwrap();
        assert_eq!(persisted.status, PollStatus::Pending);
        assert_eq!(persisted.dish_ids(), vec![1, 2, 3]);

        // create_poll then a pending_poll refetch, in that order.
        let calls = api.calls();
        let create = calls.iter().position(|c| c == "create_poll").unwrap();
        assert!(calls[create + 1..].contains(&"pending_poll".to_string()));
    }

    #[tokio::test]
    async fn test_dirty_tracking_symmetric_difference() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = drafted_with(&api, &[1, 2, 3]).await;
        d.submit(now_open()).await.unwrap();
        d.enter_edit(now_open()).unwrap();
        assert!(!d.is_dirty());

        // Add dish 4, then remove it: clean again.
        let mut pick = d.open_category(grill()).await.unwrap();
        pick.toggle(4);
        d.add_selected(&pick).unwrap();
        assert!(d.is_dirty());
        d.remove_dish(4).unwrap();
        assert!(!d.is_dirty());

        // Add and keep: dirty.
        let mut pick = d.open_category(grill()).await.unwrap();
        pick.toggle(4);
        d.add_selected(&pick).unwrap();
        assert!(d.is_dirty());
    }

    #[tokio::test]
    async fn test_edit_save_and_delete_lifecycle() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = drafted_with(&api, &[1, 2, 3]).await;
        d.submit(now_open()).await.unwrap();

        // Edit to 4 dishes and save.
        d.enter_edit(now_open()).unwrap();
        let mut pick = d.open_category(grill()).await.unwrap();
        pick.toggle(4);
        d.add_selected(&pick).unwrap();
        d.save_changes(now_open()).await.unwrap();
        assert_eq!(d.phase(), DraftPhase::Submitted);
        assert_eq!(d.persisted().unwrap().dish_ids(), vec![1, 2, 3, 4]);

        // Delete with confirmation: everything cleared.
        assert_eq!(d.request_delete().unwrap(), DraftAction::NeedsConfirmation);
        d.confirm_delete().await.unwrap();
        assert_eq!(d.phase(), DraftPhase::Empty);
        assert!(d.selected().is_empty());
        assert!(d.persisted().is_none());
        assert!(api.state().pending.is_empty());
    }

    #[tokio::test]
    async fn test_save_revalidates_minimum() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = drafted_with(&api, &[1, 2, 3]).await;
        d.submit(now_open()).await.unwrap();
        d.enter_edit(now_open()).unwrap();

        d.remove_dish(3).unwrap();
        let err = d.save_changes(now_open()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(d.phase(), DraftPhase::Editing);
    }

    #[tokio::test]
    async fn test_cancel_edit_dirty_needs_confirmation() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = drafted_with(&api, &[1, 2, 3]).await;
        d.submit(now_open()).await.unwrap();
        d.enter_edit(now_open()).unwrap();

        // Clean cancel reverts immediately.
        assert_eq!(d.cancel_edit().unwrap(), DraftAction::Done);
        assert_eq!(d.phase(), DraftPhase::Submitted);

        // Dirty cancel needs the discard prompt.
        d.enter_edit(now_open()).unwrap();
        d.remove_dish(1).unwrap();
        assert_eq!(d.cancel_edit().unwrap(), DraftAction::NeedsConfirmation);
        assert_eq!(d.phase(), DraftPhase::Editing, "still editing until confirmed");

        d.confirm_cancel_edit().unwrap();
        assert_eq!(d.phase(), DraftPhase::Submitted);
        assert_eq!(d.selected(), &[1, 2, 3], "reverted to persisted dishes");
    }

    #[tokio::test]
    async fn test_in_flight_submit_rejected_busy() {
        let api = Arc::new(MockApi::new());
        catalog(&api);
        let mut d = drafted_with(&api, &[1, 2, 3]).await;
        let calls_before = api.calls().len();

        // What a second click sees while the first submit is on the wire.
        d.in_flight = true;
        assert!(d.is_busy());
        let err = d.submit(now_open()).await.unwrap_err();
        assert!(matches!(err, AppError::Busy));
        assert_eq!(api.calls().len(), calls_before, "nothing sent while busy");
        assert_eq!(d.phase(), DraftPhase::Drafting);

        d.in_flight = false;
        d.submit(now_open()).await.unwrap();
        assert_eq!(d.phase(), DraftPhase::Submitted);
    }

    #[tokio::test]
    async fn test_non_pending_poll_is_locked() {
        let api = Arc::new(MockApi::new());
        api.state()
            .pending
            .insert(meal(), test_poll(9, meal(), PollStatus::Closed, &[1, 2, 3]));

        let mut d = draft(&api);
        d.load().await.unwrap();
        assert_eq!(d.phase(), DraftPhase::Locked);

        assert!(d.enter_edit(now_open()).is_err());
        assert!(d.request_delete().is_err());
    }
}
