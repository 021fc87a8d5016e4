//! Common utilities and shared types for canteen-rs.
//!
//! This crate provides foundational components used across all canteen-rs
//! crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Auth session**: Bearer-token session store via [`AuthSession`]
//!
//! # Example
//!
//! ```no_run
//! use canteen_common::{AppResult, AuthSession, Config, Role};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let session = AuthSession::new();
//!     session.sign_in("token".to_string(), Role::Voter);
//!     println!("cooldown: {}s", config.voting.wish_cooldown_secs);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod session;

pub use config::{ApiConfig, Config, VotingConfig};
pub use error::{AppError, AppResult};
pub use session::{AuthSession, Role};
