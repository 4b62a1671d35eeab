//! Wire types for the diagnostic service.
//!
//! Request bodies borrow from the caller; responses are owned and validated
//! here so the rest of the crate never sees untyped JSON.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Server-assigned record identifier.
///
/// The service emits ids as JSON numbers or strings; both normalize to a
/// non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Returns `None` for blank ids.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into().trim().to_string();
        (!id.is_empty()).then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Int(i64),
            UInt(u64),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s,
            Raw::Int(n) => n.to_string(),
            Raw::UInt(n) => n.to_string(),
        };

        RecordId::new(raw).ok_or_else(|| serde::de::Error::custom("record id must not be empty"))
    }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of `POST /token/`.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

/// Authenticated user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Body of `PUT /profile/update/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Data URL (`data:image/png;base64,...`) or existing avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    /// Starts from the current profile so untouched fields are resent as-is.
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            username: profile.username.clone(),
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            avatar: profile.avatar.clone(),
        }
    }
}

/// Body of `PUT /profile/password/`.
#[derive(Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordChange { .. }")
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Patient demographic fields sent with a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    /// ISO date (`YYYY-MM-DD`)
    pub birth_date: String,
}

/// Body of `PUT /diagnostic/update/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticUpdateBody<'a> {
    pub id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub birth_date: &'a str,
}

/// Response of `POST /diagnostic/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmittedDiagnostic {
    pub id: RecordId,
    pub diagnostic: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// One item of `GET /images/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosticItem {
    pub id: RecordId,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub diagnostic_result: String,
    #[serde(default)]
    pub date_diagnostic: Option<String>,
    #[serde(default)]
    pub prenom: String,
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub date_naissance: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Response of `PUT /diagnostic/update/{id}`.
///
/// The service echoes whichever fields it changed, in either naming style.
/// Absent fields leave the cached record as it was.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiagnosticPatch {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default, rename = "firstName", alias = "first_name", alias = "prenom")]
    pub first_name: Option<String>,
    #[serde(default, rename = "lastName", alias = "last_name", alias = "nom")]
    pub last_name: Option<String>,
    #[serde(
        default,
        rename = "birthDate",
        alias = "birth_date",
        alias = "date_naissance"
    )]
    pub birth_date: Option<String>,
    #[serde(
        default,
        rename = "diagnosis",
        alias = "diagnostic",
        alias = "diagnostic_result"
    )]
    pub diagnosis: Option<String>,
    #[serde(default, rename = "image", alias = "image_url")]
    pub image: Option<String>,
    #[serde(
        default,
        rename = "created_at",
        alias = "date",
        alias = "date_diagnostic"
    )]
    pub created_at: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl DiagnosticPatch {
    /// Fills fields the server did not echo from the submitted values.
    #[must_use]
    pub fn or_fields(self, fields: &PatientFields) -> Self {
        Self {
            first_name: self.first_name.or_else(|| Some(fields.first_name.clone())),
            last_name: self.last_name.or_else(|| Some(fields.last_name.clone())),
            birth_date: self.birth_date.or_else(|| Some(fields.birth_date.clone())),
            ..self
        }
    }
}
