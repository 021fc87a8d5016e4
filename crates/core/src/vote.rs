//! Voter session: one selectable choice within a time-bounded poll.
//!
//! The server enforces at most one vote per (user, poll). The session's job
//! is to know whether the caller already holds a vote so a second choice is
//! sent as a change (update), never as a second cast, and to adopt the
//! server's refreshed counts instead of applying local increments.

use canteen_client::CanteenApi;
use canteen_client::types::{PollHistory, PollStatus, VotePoll};
use canteen_common::{AppError, AppResult, AuthSession};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

/// Result of a cast/change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    /// The vote now points at the requested dish.
    Applied,
    /// The requested dish already was the caller's vote; nothing was sent.
    Unchanged,
}

/// Tracks the active poll and the caller's vote within it.
pub struct VoteSession {
    api: Arc<dyn CanteenApi>,
    auth: AuthSession,
    active_poll: Option<VotePoll>,
    my_vote_dish_id: Option<i64>,
    in_flight: bool,
}

impl VoteSession {
    /// Create a session; call [`Self::refresh`] before rendering.
    #[must_use]
    pub fn new(api: Arc<dyn CanteenApi>, auth: AuthSession) -> Self {
        Self {
            api,
            auth,
            active_poll: None,
            my_vote_dish_id: None,
            in_flight: false,
        }
    }

    /// Reload the active poll and (when signed in) the caller's vote.
    pub async fn refresh(&mut self) -> AppResult<()> {
        self.active_poll = self.api.results_today().await?;
        self.my_vote_dish_id = if self.auth.is_authenticated() {
            self.api.my_vote_today().await?.map(|v| v.dish_id)
        } else {
            None
        };
        Ok(())
    }

    /// The poll currently on display, if any.
    #[must_use]
    pub const fn active_poll(&self) -> Option<&VotePoll> {
        self.active_poll.as_ref()
    }

    /// The caller's current choice in the active poll.
    #[must_use]
    pub const fn my_vote_dish_id(&self) -> Option<i64> {
        self.my_vote_dish_id
    }

    /// Whether a mutating call is still in flight. The triggering control
    /// must stay disabled; when the session is shared behind interior
    /// mutability a re-entrant cast is rejected with [`AppError::Busy`].
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Cast the caller's vote, or change it if one already exists.
    ///
    /// Pre-flight checks (no request issued on failure): signed in, poll
    /// present and open, dish among the candidates, no duplicate in-flight
    /// call. On success both the vote and the candidate counts are adopted
    /// from the server response.
    pub async fn cast_or_change_vote(&mut self, dish_id: i64) -> AppResult<CastOutcome> {
        self.auth.require_bearer()?;

        let Some(poll) = &self.active_poll else {
            return Err(AppError::Validation("no poll is open today".to_string()));
        };
        if poll.status != PollStatus::Open {
            return Err(AppError::Validation("voting is closed".to_string()));
        }
        if !poll.has_candidate(dish_id) {
            return Err(AppError::Validation(
                "dish is not a candidate in this poll".to_string(),
            ));
        }
        if self.my_vote_dish_id == Some(dish_id) {
            return Ok(CastOutcome::Unchanged);
        }
        if self.in_flight {
            return Err(AppError::Busy);
        }

        self.in_flight = true;
        let result = match self.my_vote_dish_id {
            // First choice in this poll: create.
            None => self.api.cast_vote(dish_id).await,
            // Existing vote: update it, never create a second row.
            Some(_) => self.api.change_vote(dish_id).await,
        };
        self.in_flight = false;

        let receipt = result?;
        debug!(dish_id = receipt.vote.dish_id, "vote applied");
        self.my_vote_dish_id = Some(receipt.vote.dish_id);
        self.active_poll = Some(receipt.poll);
        Ok(CastOutcome::Applied)
    }

    /// A past poll and the caller's historical vote for it.
    pub async fn history(&self, date: NaiveDate) -> AppResult<Option<PollHistory>> {
        self.auth.require_bearer()?;
        self.api.vote_history(date).await
    }
}
