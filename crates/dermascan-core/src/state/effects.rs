//! Effect types.
//!
//! Effects are commands returned by the reducers that the store executes.
//! They represent I/O only (session persistence, user notices), so the
//! reducers stay pure: they mutate state and return effects, never touch
//! the filesystem or the terminal directly.

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message for the user (success or failure of an operation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Effects returned by the reducers for the store to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the bearer token to durable storage.
    PersistToken(String),
    /// Remove the bearer token from durable storage.
    ClearToken,
    /// Show a notice to the user.
    Notify(Notice),
}
