//! Wishlist session: a single standing favorite with cooldown-gated
//! reassignment.
//!
//! The cooldown pre-check is a pure function of the cached `updated_at` and
//! the configured cooldown; no network call is spent probing the server.
//! The server stays authoritative: a 403 on the actual change is surfaced as
//! a cooldown notice even if the local clock disagreed.

use canteen_client::CanteenApi;
use canteen_client::types::{Wish, WishTally};
use canteen_common::config::VotingConfig;
use canteen_common::{AppError, AppResult, AuthSession};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pure cooldown verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCheck {
    /// Whether a reassignment would be accepted now.
    pub allowed: bool,
    /// Seconds until it would be; zero when allowed.
    pub remaining_seconds: u64,
}

/// Whether a wish changed at `last_change_at` may change again at `now`.
///
/// Allowed exactly from `last_change_at + cooldown` onwards; before that,
/// `remaining_seconds` counts down strictly to zero across the interval.
#[must_use]
pub fn can_change_wish(
    now: DateTime<Utc>,
    last_change_at: DateTime<Utc>,
    cooldown: Duration,
) -> CooldownCheck {
    let elapsed = now - last_change_at;
    if elapsed >= cooldown {
        CooldownCheck {
            allowed: true,
            remaining_seconds: 0,
        }
    } else {
        let remaining = cooldown - elapsed;
        CooldownCheck {
            allowed: false,
            // Partial seconds still block; round up so zero means allowed.
            remaining_seconds: u64::try_from(remaining.num_milliseconds().max(0))
                .unwrap_or(0)
                .div_ceil(1000),
        }
    }
}

/// Result of a wish-change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishChangeOutcome {
    /// The requested dish already is the wish; nothing was sent.
    Unchanged,
    /// The wish now points at the requested dish.
    Applied,
    /// An existing wish would be replaced; ask the user, then call
    /// [`WishlistSession::confirm_wish_change`].
    NeedsConfirmation,
    /// Inside the cooldown; no request was made.
    CoolingDown {
        /// Seconds until the next attempt can succeed.
        remaining_seconds: u64,
    },
}

/// Tracks the caller's wish, the cooldown, and the ranked wish-count table.
pub struct WishlistSession {
    api: Arc<dyn CanteenApi>,
    auth: AuthSession,
    cooldown: Duration,
    my_wish: Option<Wish>,
    tallies: Vec<WishTally>,
    tallies_stale: bool,
    pending: Option<i64>,
    in_flight: bool,
}

impl WishlistSession {
    /// Create a session; call [`Self::refresh`] before rendering.
    #[must_use]
    pub fn new(api: Arc<dyn CanteenApi>, auth: AuthSession, rules: &VotingConfig) -> Self {
        Self {
            api,
            auth,
            cooldown: Duration::seconds(i64::try_from(rules.wish_cooldown_secs).unwrap_or(3600)),
            my_wish: None,
            tallies: Vec::new(),
            tallies_stale: false,
            pending: None,
            in_flight: false,
        }
    }

    /// Reload the caller's wish (when signed in) and the tally table.
    pub async fn refresh(&mut self) -> AppResult<()> {
        self.my_wish = if self.auth.is_authenticated() {
            self.api.my_wish().await?
        } else {
            None
        };
        self.tallies = self.api.wish_tallies().await?;
        self.tallies_stale = false;
        Ok(())
    }

    /// The caller's standing wish.
    #[must_use]
    pub const fn my_wish(&self) -> Option<&Wish> {
        self.my_wish.as_ref()
    }

    /// The staged-but-unconfirmed target dish, if any.
    #[must_use]
    pub const fn pending_change(&self) -> Option<i64> {
        self.pending
    }

    /// Whether a mutating call is still in flight. The triggering control
    /// must stay disabled; when the session is shared behind interior
    /// mutability a re-entrant change is rejected with [`AppError::Busy`].
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Whether the tally table failed its last refresh and shows the
    /// last-known-good numbers.
    #[must_use]
    pub const fn tallies_stale(&self) -> bool {
        self.tallies_stale
    }

    /// Seconds left on the cooldown at `now`; `None` without a wish, zero
    /// when a change would be accepted. Recompute every UI tick — at zero
    /// the next attempt revalidates against the server, no preemptive query.
    #[must_use]
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        self.my_wish
            .as_ref()
            .map(|w| can_change_wish(now, w.updated_at, self.cooldown).remaining_seconds)
    }

    /// Request pointing the wish at `dish_id`.
    ///
    /// A first wish applies immediately (never cooldown-gated). Replacing an
    /// existing wish runs the pure cooldown pre-check and then stages the
    /// change for confirmation; only the confirmation sends the mutating
    /// call.
    pub async fn request_wish_change(
        &mut self,
        dish_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<WishChangeOutcome> {
        self.auth.require_bearer()?;

        match &self.my_wish {
            Some(wish) if wish.dish_id == dish_id => Ok(WishChangeOutcome::Unchanged),
            Some(wish) => {
                let check = can_change_wish(now, wish.updated_at, self.cooldown);
                if !check.allowed {
                    return Ok(WishChangeOutcome::CoolingDown {
                        remaining_seconds: check.remaining_seconds,
                    });
                }
                self.pending = Some(dish_id);
                Ok(WishChangeOutcome::NeedsConfirmation)
            }
            None => {
                self.apply(dish_id).await?;
                Ok(WishChangeOutcome::Applied)
            }
        }
    }

    /// Commit the staged change. The server re-validates the cooldown; a 403
    /// here drops the staged change and reports the remaining time.
    pub async fn confirm_wish_change(&mut self) -> AppResult<WishChangeOutcome> {
        let Some(dish_id) = self.pending.take() else {
            return Err(AppError::Validation("no wish change to confirm".to_string()));
        };

        match self.apply(dish_id).await {
            Ok(()) => Ok(WishChangeOutcome::Applied),
            Err(AppError::CooldownActive { remaining_seconds }) => {
                Ok(WishChangeOutcome::CoolingDown { remaining_seconds })
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the staged change.
    pub fn cancel_wish_change(&mut self) {
        self.pending = None;
    }

    /// The wish-count table ranked total descending, ties in server order.
    #[must_use]
    pub fn ranked_tallies(&self) -> Vec<WishTally> {
        let mut ranked = self.tallies.clone();
        ranked.sort_by(|a, b| b.total_wishes.cmp(&a.total_wishes));
        ranked
    }

    async fn apply(&mut self, dish_id: i64) -> AppResult<()> {
        if self.in_flight {
            return Err(AppError::Busy);
        }
        self.in_flight = true;
        let result = self.api.change_wish(dish_id).await;
        self.in_flight = false;

        let wish = result?;
        debug!(dish_id = wish.dish_id, "wish applied");
        self.my_wish = Some(wish);
        // Ranks may shift for both the old and the new dish. The change
        // itself is committed; a failed refresh only leaves the table stale.
        match self.api.wish_tallies().await {
            Ok(tallies) => {
                self.tallies = tallies;
                self.tallies_stale = false;
            }
            Err(e) => {
                warn!(error = %e, "tally refresh failed, keeping last known table");
                self.tallies_stale = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use canteen_client::MockApi;
    use canteen_common::Role;

    fn cooldown() -> Duration {
        Duration::seconds(3600)
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_cooldown_boundary() {
        let last = at("2025-06-10T10:00:00Z");

        let before = can_change_wish(at("2025-06-10T10:59:59Z"), last, cooldown());
        assert!(!before.allowed);
        assert_eq!(before.remaining_seconds, 1);

        let exactly = can_change_wish(at("2025-06-10T11:00:00Z"), last, cooldown());
        assert!(exactly.allowed);
        assert_eq!(exactly.remaining_seconds, 0);

        let after = can_change_wish(at("2025-06-10T12:00:00Z"), last, cooldown());
        assert!(after.allowed);
    }

    #[test]
    fn test_cooldown_remaining_strictly_decreases() {
        let last = at("2025-06-10T10:00:00Z");
        let samples = [
            at("2025-06-10T10:00:01Z"),
            at("2025-06-10T10:20:00Z"),
            at("2025-06-10T10:40:00Z"),
            at("2025-06-10T10:59:59Z"),
            at("2025-06-10T11:00:00Z"),
        ];

        let mut previous = u64::MAX;
        for now in samples {
            let remaining = can_change_wish(now, last, cooldown()).remaining_seconds;
            assert!(remaining < previous);
            previous = remaining;
        }
        assert_eq!(previous, 0);
    }

    fn signed_in() -> AuthSession {
        let auth = AuthSession::new();
        auth.sign_in("tok".to_string(), Role::Voter);
        auth
    }

    fn session(api: &Arc<MockApi>) -> WishlistSession {
        WishlistSession::new(
            Arc::clone(api) as Arc<dyn CanteenApi>,
            signed_in(),
            &VotingConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_first_wish_applies_without_confirmation() {
        let api = Arc::new(MockApi::new());
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();

        let outcome = wishes.request_wish_change(5, Utc::now()).await.unwrap();
        assert_eq!(outcome, WishChangeOutcome::Applied);
        assert_eq!(wishes.my_wish().unwrap().dish_id, 5);
        assert_eq!(api.state().tallies.len(), 1);
    }

    #[tokio::test]
    async fn test_same_dish_is_a_no_op() {
        let api = Arc::new(MockApi::new());
        api.state().my_wish = Some(Wish {
            dish_id: 5,
            updated_at: Utc::now(),
        });
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();
        let calls_before = api.calls().len();

        let outcome = wishes.request_wish_change(5, Utc::now()).await.unwrap();
        assert_eq!(outcome, WishChangeOutcome::Unchanged);
        assert_eq!(api.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_cooldown_blocks_without_network() {
        let api = Arc::new(MockApi::new());
        let changed_at = at("2025-06-10T10:00:00Z");
        api.state().my_wish = Some(Wish {
            dish_id: 5,
            updated_at: changed_at,
        });
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();
        let calls_before = api.calls().len();

        let outcome = wishes
            .request_wish_change(8, at("2025-06-10T10:30:00Z"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WishChangeOutcome::CoolingDown {
                remaining_seconds: 1800
            }
        );
        assert_eq!(api.calls().len(), calls_before, "pre-check must be pure");
    }

    #[tokio::test]
    async fn test_replacement_needs_confirmation_then_applies() {
        let api = Arc::new(MockApi::new());
        let changed_at = at("2025-06-10T10:00:00Z");
        api.state().my_wish = Some(Wish {
            dish_id: 5,
            updated_at: changed_at,
        });
        api.state().tallies = vec![WishTally {
            dish_id: 5,
            total_wishes: 3,
        }];
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();
        let calls_before = api.calls().len();

        let outcome = wishes
            .request_wish_change(8, at("2025-06-10T12:00:00Z"))
            .await
            .unwrap();
        assert_eq!(outcome, WishChangeOutcome::NeedsConfirmation);
        assert_eq!(wishes.pending_change(), Some(8));
        assert_eq!(api.calls().len(), calls_before, "staging sends nothing");

        let outcome = wishes.confirm_wish_change().await.unwrap();
        assert_eq!(outcome, WishChangeOutcome::Applied);
        assert_eq!(wishes.my_wish().unwrap().dish_id, 8);
        assert_eq!(wishes.pending_change(), None);

        // Single wish invariant: old tally decremented, new one created.
        let tallies = wishes.ranked_tallies();
        assert_eq!(tallies[0].dish_id, 5);
        assert_eq!(tallies[0].total_wishes, 2);
        assert_eq!(tallies[1].dish_id, 8);
        assert_eq!(tallies[1].total_wishes, 1);
    }

    #[tokio::test]
    async fn test_server_cooldown_overrides_local_clock() {
        let api = Arc::new(MockApi::new());
        api.state().my_wish = Some(Wish {
            dish_id: 5,
            updated_at: at("2025-06-10T10:00:00Z"),
        });
        api.state().wish_cooldown_remaining = Some(240);
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();

        wishes
            .request_wish_change(8, at("2025-06-10T12:00:00Z"))
            .await
            .unwrap();
        let outcome = wishes.confirm_wish_change().await.unwrap();
        assert_eq!(
            outcome,
            WishChangeOutcome::CoolingDown {
                remaining_seconds: 240
            }
        );
        // The staged change is gone and the wish is untouched.
        assert_eq!(wishes.pending_change(), None);
        assert_eq!(wishes.my_wish().unwrap().dish_id, 5);
    }

    #[tokio::test]
    async fn test_cancel_drops_staged_change() {
        let api = Arc::new(MockApi::new());
        api.state().my_wish = Some(Wish {
            dish_id: 5,
            updated_at: at("2025-06-10T10:00:00Z"),
        });
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();

        wishes
            .request_wish_change(8, at("2025-06-10T12:00:00Z"))
            .await
            .unwrap();
        wishes.cancel_wish_change();
        assert!(matches!(
            wishes.confirm_wish_change().await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_in_flight_change_rejected_busy() {
        let api = Arc::new(MockApi::new());
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();
        let calls_before = api.calls().len();

        // What a second tap sees while the first change is on the wire.
        wishes.in_flight = true;
        assert!(wishes.is_busy());
        let err = wishes.request_wish_change(5, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Busy));
        assert_eq!(api.calls().len(), calls_before, "nothing sent while busy");

        wishes.in_flight = false;
        assert_eq!(
            wishes.request_wish_change(5, Utc::now()).await.unwrap(),
            WishChangeOutcome::Applied
        );
    }

    #[tokio::test]
    async fn test_applied_change_survives_failed_tally_refresh() {
        let api = Arc::new(MockApi::new());
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();

        api.state().fail_on = Some((
            "wish_tallies".to_string(),
            AppError::Transport("offline".to_string()),
        ));
        let outcome = wishes.request_wish_change(5, Utc::now()).await.unwrap();
        // The committed change is reported as applied; only the table is
        // marked stale.
        assert_eq!(outcome, WishChangeOutcome::Applied);
        assert_eq!(wishes.my_wish().unwrap().dish_id, 5);
        assert!(wishes.tallies_stale());

        wishes.refresh().await.unwrap();
        assert!(!wishes.tallies_stale());
    }

    #[tokio::test]
    async fn test_cooldown_remaining_tracks_wish() {
        let api = Arc::new(MockApi::new());
        let mut wishes = session(&api);
        wishes.refresh().await.unwrap();
        assert_eq!(wishes.cooldown_remaining(Utc::now()), None);

        wishes.request_wish_change(5, Utc::now()).await.unwrap();
        let remaining = wishes.cooldown_remaining(Utc::now()).unwrap();
        assert!(remaining > 0 && remaining <= 3600);
    }
}
