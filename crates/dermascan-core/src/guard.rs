//! Session gate for protected operations.

use thiserror::Error;

use crate::state::AuthState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Not signed in. Run `dermascan login` first.")]
    LoginRequired,
}

/// Returns the bearer token, or refuses when no session exists.
///
/// # Errors
/// Returns [`GuardError::LoginRequired`] when the token is absent.
pub fn require_token(auth: &AuthState) -> Result<&str, GuardError> {
    auth.token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(GuardError::LoginRequired)
}
