//! Bearer-token auth session store.
//!
//! The backend owns authentication; this store only keeps the issued token
//! and the caller's role so the API client can attach the bearer header and
//! tear the session down on a 401. The 401 contract: the token is dropped
//! and a role-appropriate sign-in redirect is recorded for the view layer to
//! consume.

use crate::error::{AppError, AppResult};
use std::sync::{Arc, RwLock};

/// Caller role, used to pick the sign-in route after a session teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Regular voter.
    Voter,
    /// Canteen staff.
    Staff,
}

impl Role {
    /// Sign-in route for this role.
    #[must_use]
    pub const fn sign_in_route(self) -> &'static str {
        match self {
            Self::Voter => "/sign-in",
            Self::Staff => "/staff/sign-in",
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    role: Option<Role>,
    redirect: Option<&'static str>,
}

/// Shared auth session.
///
/// Cheap to clone; all clones observe the same state, so a 401 handled deep
/// inside the API client is visible to every session object immediately.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    inner: Arc<RwLock<SessionState>>,
}

impl AuthSession {
    /// Create an empty (signed-out) session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly issued token and the caller's role.
    pub fn sign_in(&self, token: String, role: Role) {
        let mut state = self.write();
        state.token = Some(token);
        state.role = Some(role);
        state.redirect = None;
    }

    /// Whether a token is currently present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    /// The caller's role, if signed in.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.read().role
    }

    /// Current bearer token, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// Current bearer token, or [`AppError::Unauthenticated`] when absent.
    ///
    /// Used by authenticated endpoints to fail before any request is issued.
    pub fn require_bearer(&self) -> AppResult<String> {
        self.bearer().ok_or(AppError::Unauthenticated)
    }

    /// Tear the session down after a 401: drop the token and record the
    /// sign-in redirect for the stored role (voter route when unknown).
    pub fn invalidate(&self) {
        let mut state = self.write();
        let role = state.role.unwrap_or(Role::Voter);
        state.token = None;
        state.role = None;
        state.redirect = Some(role.sign_in_route());
        tracing::info!(redirect = role.sign_in_route(), "session invalidated");
    }

    /// Explicit sign-out; no redirect is recorded.
    pub fn sign_out(&self) {
        let mut state = self.write();
        state.token = None;
        state.role = None;
        state.redirect = None;
    }

    /// Take the pending sign-in redirect, if a teardown recorded one.
    #[must_use]
    pub fn take_redirect(&self) -> Option<&'static str> {
        self.write().redirect.take()
    }

    #[allow(clippy::expect_used)]
    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.read().expect("session lock poisoned")
    }

    #[allow(clippy::expect_used)]
    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.write().expect("session lock poisoned")
    }
}
