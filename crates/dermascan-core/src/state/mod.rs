//! Application state and reducers.
//!
//! ```text
//! AppState
//! ├── auth: AuthState            (token, user, status)
//! └── diagnostic: DiagnosticState (history, current, status)
//! ```
//!
//! `update` is the single place where actions modify state. It never
//! performs I/O; it returns [`Effect`]s for the store to execute.

pub mod auth;
pub mod diagnostic;
pub mod effects;
mod status;

pub use auth::{AuthAction, AuthState};
pub use diagnostic::{Confidence, DiagnosticAction, DiagnosticRecord, DiagnosticState};
pub use effects::{Effect, Notice, NoticeLevel};
pub use status::RequestStatus;

/// Combined application state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub auth: AuthState,
    pub diagnostic: DiagnosticState,
}

impl AppState {
    /// Initial state, seeded from the persisted token.
    pub fn with_token(token: Option<String>) -> Self {
        Self {
            auth: AuthState::with_token(token),
            diagnostic: DiagnosticState::default(),
        }
    }
}

/// Any action, routed to its slice.
#[derive(Debug, Clone)]
pub enum Action {
    Auth(AuthAction),
    Diagnostic(DiagnosticAction),
}

impl From<AuthAction> for Action {
    fn from(action: AuthAction) -> Self {
        Self::Auth(action)
    }
}

impl From<DiagnosticAction> for Action {
    fn from(action: DiagnosticAction) -> Self {
        Self::Diagnostic(action)
    }
}

impl Action {
    /// Short label for logs (never includes payloads).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auth(a) => match a {
                AuthAction::Pending(_) => "auth/pending",
                AuthAction::LoginFulfilled { .. } => "auth/login/fulfilled",
                AuthAction::RegisterFulfilled => "auth/register/fulfilled",
                AuthAction::ProfileFulfilled { .. } => "auth/profile/fulfilled",
                AuthAction::PasswordFulfilled => "auth/password/fulfilled",
                AuthAction::Rejected { .. } => "auth/rejected",
                AuthAction::Logout => "auth/logout",
                AuthAction::ClearError => "auth/clearError",
            },
            Self::Diagnostic(d) => match d {
                DiagnosticAction::Pending(_) => "diagnostic/pending",
                DiagnosticAction::Submitted(_) => "diagnostic/submit/fulfilled",
                DiagnosticAction::Fetched(_) => "diagnostic/fetchAll/fulfilled",
                DiagnosticAction::Updated(_) => "diagnostic/update/fulfilled",
                DiagnosticAction::Deleted(_) => "diagnostic/delete/fulfilled",
                DiagnosticAction::Rejected { .. } => "diagnostic/rejected",
                DiagnosticAction::ClearCurrent => "diagnostic/clearCurrent",
                DiagnosticAction::ClearError => "diagnostic/clearError",
            },
        }
    }
}

/// The root reducer.
pub fn update(state: &mut AppState, action: Action) -> Vec<Effect> {
    match action {
        Action::Auth(a) => auth::reduce(&mut state.auth, a),
        Action::Diagnostic(d) => diagnostic::reduce(&mut state.diagnostic, d),
    }
}
