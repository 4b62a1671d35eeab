//! REST client for the diagnostic service.
//!
//! Wraps every outbound call with the configured base URL and attaches the
//! persisted bearer token when one is present.

mod error;
pub mod types;

use std::time::Duration;

pub use error::{ApiError, extract_message};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
pub use types::*;

use crate::images::ImageUpload;

/// Standard User-Agent header for dermascan API requests.
pub const USER_AGENT: &str = concat!("dermascan/", env!("CARGO_PKG_VERSION"));

/// Every call the client can make. Carries the action type used in logs
/// and the message shown when the service gives no better one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Register,
    FetchProfile,
    UpdateProfile,
    UpdatePassword,
    SubmitDiagnostic,
    FetchDiagnostics,
    UpdateDiagnostic,
    DeleteDiagnostic,
}

impl Operation {
    /// Action type, `slice/operation`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Login => "auth/login",
            Self::Register => "auth/register",
            Self::FetchProfile => "auth/fetchProfile",
            Self::UpdateProfile => "auth/updateProfile",
            Self::UpdatePassword => "auth/updatePassword",
            Self::SubmitDiagnostic => "diagnostic/submit",
            Self::FetchDiagnostics => "diagnostic/fetchAll",
            Self::UpdateDiagnostic => "diagnostic/update",
            Self::DeleteDiagnostic => "diagnostic/delete",
        }
    }

    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Login => "Invalid credentials",
            Self::Register => "Registration failed",
            Self::FetchProfile => "Could not load your profile",
            Self::UpdateProfile => "Could not update your profile",
            Self::UpdatePassword => "Could not update your password",
            Self::SubmitDiagnostic => "An error occurred while submitting the diagnostic",
            Self::FetchDiagnostics => "An error occurred while loading diagnostics",
            Self::UpdateDiagnostic => "An error occurred while updating the diagnostic",
            Self::DeleteDiagnostic => "An error occurred while deleting the diagnostic",
        }
    }
}

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
}

/// Diagnostic service client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client. `token` is attached as a bearer header when set.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiConfig, token: Option<String>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::request_failed(None, format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    /// `POST /token/`
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        let op = Operation::Login;
        let response = self
            .send(op, self.request(Method::POST, "/token/").json(credentials))
            .await?;
        decode(op, response).await
    }

    /// `POST /register/`
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn register(&self, account: &NewAccount) -> Result<serde_json::Value, ApiError> {
        let op = Operation::Register;
        let response = self
            .send(op, self.request(Method::POST, "/register/").json(account))
            .await?;
        decode_or_null(op, response).await
    }

    /// `GET /profile/`
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        let op = Operation::FetchProfile;
        let response = self.send(op, self.request(Method::GET, "/profile/")).await?;
        decode(op, response).await
    }

    /// `PUT /profile/update/`
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let op = Operation::UpdateProfile;
        let response = self
            .send(op, self.request(Method::PUT, "/profile/update/").json(update))
            .await?;
        decode(op, response).await
    }

    /// `PUT /profile/password/`
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn update_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let op = Operation::UpdatePassword;
        self.send(op, self.request(Method::PUT, "/profile/password/").json(change))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    /// `POST /diagnostic/` as multipart: firstName, lastName, birthDate, image.
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn submit_diagnostic(
        &self,
        patient: &PatientFields,
        image: &ImageUpload,
    ) -> Result<SubmittedDiagnostic, ApiError> {
        let op = Operation::SubmitDiagnostic;

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| {
                ApiError::request_failed(None, format!("Invalid image type {}: {e}", image.mime_type))
            })?;

        let form = Form::new()
            .text("firstName", patient.first_name.clone())
            .text("lastName", patient.last_name.clone())
            .text("birthDate", patient.birth_date.clone())
            .part("image", part);

        let response = self
            .send(op, self.request(Method::POST, "/diagnostic/").multipart(form))
            .await?;
        decode(op, response).await
    }

    /// `GET /images/`
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn list_diagnostics(&self) -> Result<Vec<DiagnosticItem>, ApiError> {
        let op = Operation::FetchDiagnostics;
        let response = self.send(op, self.request(Method::GET, "/images/")).await?;
        decode(op, response).await
    }

    /// `PUT /diagnostic/update/{id}`
    ///
    /// An empty or non-object response yields a patch of the submitted fields.
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn update_diagnostic(
        &self,
        id: &RecordId,
        patient: &PatientFields,
    ) -> Result<DiagnosticPatch, ApiError> {
        let op = Operation::UpdateDiagnostic;
        let body = DiagnosticUpdateBody {
            id: id.as_str(),
            first_name: &patient.first_name,
            last_name: &patient.last_name,
            birth_date: &patient.birth_date,
        };
        let path = format!("/diagnostic/update/{id}");
        let response = self
            .send(op, self.request(Method::PUT, &path).json(&body))
            .await?;

        let text = read_body(op, response).await?;
        let patch = match serde_json::from_str::<DiagnosticPatch>(&text) {
            Ok(patch) => patch,
            Err(e) => {
                if !text.trim().is_empty() {
                    debug!(operation = op.name(), error = %e, "update response not a patch");
                }
                DiagnosticPatch::default()
            }
        };

        Ok(DiagnosticPatch {
            id: Some(id.clone()),
            ..patch.or_fields(patient)
        })
    }

    /// `DELETE /diagnostic/delete/{id}`
    ///
    /// # Errors
    /// Returns [`ApiError`] if the request fails.
    pub async fn delete_diagnostic(&self, id: &RecordId) -> Result<(), ApiError> {
        let op = Operation::DeleteDiagnostic;
        let path = format!("/diagnostic/delete/{id}");
        self.send(op, self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, op: Operation, builder: RequestBuilder) -> Result<Response, ApiError> {
        debug!(operation = op.name(), authenticated = self.token.is_some(), "sending request");

        let response = builder.send().await.map_err(|e| {
            warn!(operation = op.name(), error = %e, "request did not complete");
            ApiError::request_failed(None, op.fallback_message())
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation = op.name(), status = status.as_u16(), "request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(op, status.as_u16(), &body);
        warn!(
            operation = op.name(),
            status = status.as_u16(),
            reason = err.message(),
            "request rejected"
        );
        Err(err)
    }
}

async fn read_body(op: Operation, response: Response) -> Result<String, ApiError> {
    let status = response.status().as_u16();
    response.text().await.map_err(|e| {
        warn!(operation = op.name(), error = %e, "failed to read response body");
        ApiError::request_failed(Some(status), op.fallback_message())
    })
}

async fn decode<T: DeserializeOwned>(op: Operation, response: Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let text = read_body(op, response).await?;
    serde_json::from_str(&text).map_err(|e| {
        warn!(operation = op.name(), error = %e, "unexpected response shape");
        ApiError::request_failed(Some(status), op.fallback_message())
    })
}

async fn decode_or_null(op: Operation, response: Response) -> Result<serde_json::Value, ApiError> {
    let text = read_body(op, response).await?;
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer, token: Option<&str>) -> ApiClient {
        ApiClient::new(
            ApiConfig {
                base_url: server.uri(),
                timeout: Some(Duration::from_secs(5)),
            },
            token.map(str::to_string),
        )
        .unwrap()
    }

    fn patient() -> PatientFields {
        PatientFields {
            first_name: "Jean".into(),
            last_name: "Dupont".into(),
            birth_date: "1990-01-01".into(),
        }
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token/"))
            .and(body_json(serde_json::json!({"username": "dr", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access": "tok", "refresh": "ref"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server, None)
            .login(&Credentials {
                username: "dr".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();

        assert_eq!(token.access, "tok");
        assert_eq!(token.refresh.as_deref(), Some("ref"));
    }

    #[tokio::test]
    async fn test_login_failure_uses_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let err = client(&server, None)
            .login(&Credentials {
                username: "dr".into(),
                password: "bad".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.message(), "Bad credentials");
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile/"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "username": "dr",
                "email": "dr@example.com",
                "first_name": "Ada",
                "last_name": "Obi"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client(&server, Some("tok-123")).profile().await.unwrap();
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.avatar, None);
    }

    #[tokio::test]
    async fn test_submit_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/diagnostic/"))
            .and(header_exists("content-type"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "42",
                "diagnostic": "benign",
                "image_url": "/media/42.png",
                "date": "2024-01-01"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let image = ImageUpload {
            file_name: "lesion.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        };
        let submitted = client(&server, Some("tok"))
            .submit_diagnostic(&patient(), &image)
            .await
            .unwrap();
        assert_eq!(submitted.id.as_str(), "42");

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"firstName\""));
        assert!(body.contains("Dupont"));
        assert!(body.contains("filename=\"lesion.png\""));
    }

    #[tokio::test]
    async fn test_update_with_empty_body_echoes_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/diagnostic/update/42"))
            .and(body_json(serde_json::json!({
                "id": "42",
                "firstName": "Jean",
                "lastName": "Dupont",
                "birthDate": "1990-01-01"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let id = RecordId::new("42").unwrap();
        let patch = client(&server, Some("tok"))
            .update_diagnostic(&id, &patient())
            .await
            .unwrap();

        assert_eq!(patch.id, Some(id));
        assert_eq!(patch.first_name.as_deref(), Some("Jean"));
    }

    #[tokio::test]
    async fn test_delete_hits_id_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/diagnostic/delete/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, Some("tok"))
            .delete_diagnostic(&RecordId::new("7").unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_malformed_list_uses_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"oops\": true}"))
            .mount(&server)
            .await;

        let err = client(&server, Some("tok"))
            .list_diagnostics()
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            Operation::FetchDiagnostics.fallback_message()
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_request_failed() {
        let client = ApiClient::new(
            ApiConfig {
                base_url: "http://127.0.0.1:9".into(),
                timeout: Some(Duration::from_secs(2)),
            },
            None,
        )
        .unwrap();

        let err = client.list_diagnostics().await.unwrap_err();
        assert_eq!(err.status(), None);
        assert_eq!(
            err.message(),
            Operation::FetchDiagnostics.fallback_message()
        );
    }
}
