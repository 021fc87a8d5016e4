//! Typed REST API client for the canteen backend.
//!
//! The backend's wire contract is loose (several field spellings per
//! endpoint); this crate is the single place where payloads are normalized
//! into one schema per endpoint. Consumers depend on the [`CanteenApi`]
//! trait; [`HttpApi`] is the reqwest-backed implementation, and the
//! `test-utils` feature provides [`MockApi`], an in-memory fake backend for
//! exercising the session state machines.
//!
//! Status-code mapping into [`canteen_common::AppError`] happens once, in
//! [`HttpApi`]: 401 tears the shared auth session down, 403 with a
//! remaining-seconds payload becomes a cooldown error, 409 a conflict.
//! Nothing in this crate retries a mutating call.

pub mod api;
pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod types;

pub use api::CanteenApi;
pub use http::HttpApi;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockApi;
pub use types::{
    CandidateDish, Category, Dish, FeedbackEntry, ImageUpload, NewDish, NewDishFeedback,
    NewSystemFeedback, Paginated, PollHistory, PollStatus, Vote, VotePoll, VoteReceipt, Wish,
    WishTally,
};
