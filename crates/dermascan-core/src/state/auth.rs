//! Auth slice: session token, user profile and the request status shared
//! by every auth operation.

use super::effects::{Effect, Notice};
use super::status::RequestStatus;
use crate::api::{Operation, UserProfile};

/// Auth slice state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub status: RequestStatus,
}

impl AuthState {
    /// Initial state, seeded from the persisted token.
    pub fn with_token(token: Option<String>) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Events the auth reducer understands.
#[derive(Clone)]
pub enum AuthAction {
    /// An operation was dispatched.
    Pending(Operation),
    LoginFulfilled {
        token: String,
        user: Option<UserProfile>,
    },
    RegisterFulfilled,
    /// Profile fetched or updated.
    ProfileFulfilled {
        operation: Operation,
        profile: UserProfile,
    },
    PasswordFulfilled,
    Rejected {
        operation: Operation,
        message: String,
    },
    Logout,
    ClearError,
}

impl std::fmt::Debug for AuthAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending(op) => f.debug_tuple("Pending").field(op).finish(),
            Self::LoginFulfilled { user, .. } => f
                .debug_struct("LoginFulfilled")
                .field("token", &"<redacted>")
                .field("user", user)
                .finish(),
            Self::RegisterFulfilled => f.write_str("RegisterFulfilled"),
            Self::ProfileFulfilled { operation, profile } => f
                .debug_struct("ProfileFulfilled")
                .field("operation", operation)
                .field("profile", profile)
                .finish(),
            Self::PasswordFulfilled => f.write_str("PasswordFulfilled"),
            Self::Rejected { operation, message } => f
                .debug_struct("Rejected")
                .field("operation", operation)
                .field("message", message)
                .finish(),
            Self::Logout => f.write_str("Logout"),
            Self::ClearError => f.write_str("ClearError"),
        }
    }
}

/// Auth reducer.
pub fn reduce(state: &mut AuthState, action: AuthAction) -> Vec<Effect> {
    match action {
        AuthAction::Pending(_) => {
            state.status.start();
            vec![]
        }
        AuthAction::LoginFulfilled { token, user } => {
            state.status.settle_ok();
            state.token = Some(token.clone());
            if user.is_some() {
                state.user = user;
            }
            vec![
                Effect::PersistToken(token),
                Effect::Notify(Notice::success("Signed in successfully")),
            ]
        }
        AuthAction::RegisterFulfilled => {
            state.status.settle_ok();
            vec![Effect::Notify(Notice::success(
                "Registration successful! You can now sign in.",
            ))]
        }
        AuthAction::ProfileFulfilled { operation, profile } => {
            state.status.settle_ok();
            state.user = Some(profile);
            if operation == Operation::UpdateProfile {
                vec![Effect::Notify(Notice::success("Profile updated"))]
            } else {
                vec![]
            }
        }
        AuthAction::PasswordFulfilled => {
            state.status.settle_ok();
            vec![Effect::Notify(Notice::success("Password updated"))]
        }
        AuthAction::Rejected { operation, message } => {
            let message = if message.trim().is_empty() {
                operation.fallback_message().to_string()
            } else {
                message
            };
            state.status.settle_err(message.clone());
            vec![Effect::Notify(Notice::error(message))]
        }
        AuthAction::Logout => {
            state.token = None;
            state.user = None;
            vec![
                Effect::ClearToken,
                Effect::Notify(Notice::success("Signed out")),
            ]
        }
        AuthAction::ClearError => {
            state.status.error = None;
            vec![]
        }
    }
}
