//! Domain core of the canteen voting client.
//!
//! The view layer is a dumb renderer; everything with an invariant lives
//! here, factored into session state machines and pure derivations:
//!
//! - [`VoteSession`]: one selectable choice within a time-bounded poll
//! - [`WishlistSession`]: cooldown-limited wishlist reassignment
//! - [`StaffPollDraft`]: the staff draft/edit/delete poll lifecycle
//! - [`window`]: the submission-window admission check (pure)
//! - [`results`]: rank/top-N/percentage aggregation for charts (pure)
//! - [`LiveTallyFeed`]: best-effort background refresh of the staff tally
//! - [`feedback`]: validated, append-only feedback submission
//!
//! Sessions talk to the backend exclusively through
//! [`canteen_client::CanteenApi`], so every state machine can be exercised
//! against the in-memory fake from `canteen-client`'s `test-utils` feature.

pub mod draft;
pub mod feedback;
pub mod results;
pub mod tally;
pub mod vote;
pub mod window;
pub mod wishlist;

pub use draft::{CategoryPick, DraftAction, DraftPhase, StaffPollDraft};
pub use feedback::{DishFeedbackDraft, SystemFeedbackDraft};
pub use results::{CategoryBucket, ChartSlice};
pub use tally::{LiveTallyFeed, TallySnapshot};
pub use vote::{CastOutcome, VoteSession};
pub use wishlist::{CooldownCheck, WishChangeOutcome, WishlistSession, can_change_wish};
