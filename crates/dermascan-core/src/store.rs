//! Store runtime: owns the state, runs thunks and executes reducer effects.
//!
//! Each thunk dispatches `Pending`, awaits one API call, then dispatches the
//! fulfilled or rejected action. The reducers decide what changes; the store
//! only performs the I/O they ask for.

use std::path::Path;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{
    ApiClient, ApiConfig, ApiError, Credentials, NewAccount, Operation, PasswordChange,
    PatientFields, ProfileUpdate, RecordId,
};
use crate::images::ImageUpload;
use crate::session::SessionStore;
use crate::state::{
    Action, AppState, AuthAction, DiagnosticAction, DiagnosticRecord, Effect, Notice,
    NoticeLevel, update,
};

/// Why a thunk did not complete.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Request(#[from] ApiError),
    #[error("Failed to update the saved session: {0:#}")]
    Session(anyhow::Error),
}

type Listener = Box<dyn FnMut(&AppState) + Send>;

pub struct Store {
    state: AppState,
    api: ApiClient,
    session: SessionStore,
    placeholder_confidence: f64,
    notices: Vec<Notice>,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("base_url", &self.api.base_url())
            .field("authenticated", &self.state.auth.is_authenticated())
            .field("history", &self.state.diagnostic.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens a store, seeding the auth slice from the persisted token.
    ///
    /// # Errors
    /// Returns an error if the session file is unreadable or the HTTP
    /// client cannot be built.
    pub fn open(
        api_config: ApiConfig,
        session: SessionStore,
        placeholder_confidence: f64,
    ) -> anyhow::Result<Self> {
        let token = session.load().context("load saved session")?;
        let api = ApiClient::new(api_config, token.clone())?;
        debug!(
            base_url = api.base_url(),
            authenticated = token.is_some(),
            "store opened"
        );

        Ok(Self {
            state: AppState::with_token(token),
            api,
            session,
            placeholder_confidence,
            notices: Vec::new(),
            listeners: Vec::new(),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    pub fn session_path(&self) -> &Path {
        self.session.path()
    }

    /// Registers a callback invoked after every dispatched action.
    pub fn subscribe(&mut self, listener: impl FnMut(&AppState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Takes the notices produced since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Runs the reducer and executes its effects.
    ///
    /// # Errors
    /// Returns [`DispatchError::Session`] if persisting the token fails.
    pub fn dispatch(&mut self, action: impl Into<Action>) -> Result<(), DispatchError> {
        let action = action.into();
        debug!(action = action.label(), "dispatch");

        let effects = update(&mut self.state, action);
        let mut outcome = Ok(());
        for effect in effects {
            if let Err(e) = self.run_effect(effect) {
                outcome = Err(e);
            }
        }

        for listener in &mut self.listeners {
            listener(&self.state);
        }
        outcome
    }

    fn run_effect(&mut self, effect: Effect) -> Result<(), DispatchError> {
        match effect {
            Effect::PersistToken(token) => {
                self.session
                    .save(&token)
                    .map_err(DispatchError::Session)?;
                self.api.set_token(Some(token));
                info!(path = %self.session.path().display(), "session saved");
            }
            Effect::ClearToken => {
                self.api.set_token(None);
                self.session.clear().map_err(DispatchError::Session)?;
                info!("session cleared");
            }
            Effect::Notify(notice) => {
                match notice.level {
                    NoticeLevel::Success => debug!(notice = %notice.message, "notice"),
                    NoticeLevel::Error => warn!(notice = %notice.message, "notice"),
                }
                self.notices.push(notice);
            }
        }
        Ok(())
    }

    fn begin(&mut self, op: Operation) -> Result<(), DispatchError> {
        let action: Action = if is_auth(op) {
            AuthAction::Pending(op).into()
        } else {
            DiagnosticAction::Pending(op).into()
        };
        self.dispatch(action)
    }

    fn settle<T>(
        &mut self,
        op: Operation,
        result: Result<T, ApiError>,
        fulfilled: impl FnOnce(T) -> Action,
    ) -> Result<(), DispatchError> {
        match result {
            Ok(value) => self.dispatch(fulfilled(value)),
            Err(err) => {
                let message = err.message().to_string();
                let action: Action = if is_auth(op) {
                    AuthAction::Rejected {
                        operation: op,
                        message,
                    }
                    .into()
                } else {
                    DiagnosticAction::Rejected {
                        operation: op,
                        message,
                    }
                    .into()
                };
                self.dispatch(action)?;
                Err(err.into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // auth thunks
    // ------------------------------------------------------------------------

    /// # Errors
    /// Returns [`DispatchError`] when the request or session write fails.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), DispatchError> {
        let op = Operation::Login;
        self.begin(op)?;
        let result = self.api.login(credentials).await;
        self.settle(op, result, |token| {
            AuthAction::LoginFulfilled {
                token: token.access,
                user: token.user,
            }
            .into()
        })
    }

    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn register(&mut self, account: &NewAccount) -> Result<(), DispatchError> {
        let op = Operation::Register;
        self.begin(op)?;
        let result = self.api.register(account).await;
        self.settle(op, result, |_| AuthAction::RegisterFulfilled.into())
    }

    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn fetch_profile(&mut self) -> Result<(), DispatchError> {
        let op = Operation::FetchProfile;
        self.begin(op)?;
        let result = self.api.profile().await;
        self.settle(op, result, |profile| {
            AuthAction::ProfileFulfilled {
                operation: op,
                profile,
            }
            .into()
        })
    }

    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<(), DispatchError> {
        let op = Operation::UpdateProfile;
        self.begin(op)?;
        let result = self.api.update_profile(update).await;
        self.settle(op, result, |profile| {
            AuthAction::ProfileFulfilled {
                operation: op,
                profile,
            }
            .into()
        })
    }

    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn update_password(&mut self, change: &PasswordChange) -> Result<(), DispatchError> {
        let op = Operation::UpdatePassword;
        self.begin(op)?;
        let result = self.api.update_password(change).await;
        self.settle(op, result, |()| AuthAction::PasswordFulfilled.into())
    }

    /// Clears the token and user from the store and persisted storage.
    ///
    /// # Errors
    /// Returns [`DispatchError::Session`] if the session file cannot be rewritten.
    pub fn logout(&mut self) -> Result<(), DispatchError> {
        self.dispatch(AuthAction::Logout)
    }

    // ------------------------------------------------------------------------
    // diagnostic thunks
    // ------------------------------------------------------------------------

    /// Uploads one image. On success the record becomes current and is
    /// prepended to history.
    ///
    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn submit_diagnostic(
        &mut self,
        patient: &PatientFields,
        image: &ImageUpload,
    ) -> Result<(), DispatchError> {
        let op = Operation::SubmitDiagnostic;
        self.begin(op)?;
        let result = self.api.submit_diagnostic(patient, image).await;
        let placeholder = self.placeholder_confidence;
        self.settle(op, result, |submitted| {
            DiagnosticAction::Submitted(DiagnosticRecord::from_submission(
                submitted,
                patient,
                placeholder,
            ))
            .into()
        })
    }

    /// Replaces history with the service's current list.
    ///
    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn fetch_diagnostics(&mut self) -> Result<(), DispatchError> {
        let op = Operation::FetchDiagnostics;
        self.begin(op)?;
        let result = self.api.list_diagnostics().await;
        let placeholder = self.placeholder_confidence;
        self.settle(op, result, |items| {
            DiagnosticAction::Fetched(
                items
                    .into_iter()
                    .map(|item| DiagnosticRecord::from_item(item, placeholder))
                    .collect(),
            )
            .into()
        })
    }

    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn update_diagnostic(
        &mut self,
        id: &RecordId,
        patient: &PatientFields,
    ) -> Result<(), DispatchError> {
        let op = Operation::UpdateDiagnostic;
        self.begin(op)?;
        let result = self.api.update_diagnostic(id, patient).await;
        self.settle(op, result, |patch| DiagnosticAction::Updated(patch).into())
    }

    /// # Errors
    /// Returns [`DispatchError`] when the request fails.
    pub async fn delete_diagnostic(&mut self, id: &RecordId) -> Result<(), DispatchError> {
        let op = Operation::DeleteDiagnostic;
        self.begin(op)?;
        let result = self.api.delete_diagnostic(id).await;
        self.settle(op, result, |()| DiagnosticAction::Deleted(id.clone()).into())
    }
}

fn is_auth(op: Operation) -> bool {
    matches!(
        op,
        Operation::Login
            | Operation::Register
            | Operation::FetchProfile
            | Operation::UpdateProfile
            | Operation::UpdatePassword
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::json;
    use tempfile::{TempDir, tempdir};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn open(server: &MockServer, dir: &TempDir) -> Store {
        Store::open(
            ApiConfig {
                base_url: server.uri(),
                timeout: Some(Duration::from_secs(5)),
            },
            SessionStore::at(dir.path().join("session.json")),
            0.95,
        )
        .unwrap()
    }

    fn signed_in(server: &MockServer, dir: &TempDir) -> Store {
        SessionStore::at(dir.path().join("session.json"))
            .save("tok")
            .unwrap();
        open(server, dir)
    }

    fn patient() -> PatientFields {
        PatientFields {
            first_name: "Jean".into(),
            last_name: "Dupont".into(),
            birth_date: "1990-01-01".into(),
        }
    }

    fn image() -> ImageUpload {
        ImageUpload {
            file_name: "lesion.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    async fn mount_history(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/images/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 2, "image_url": "/m/2.jpg", "diagnostic_result": "nevus",
                 "date_diagnostic": "2024-02-01", "prenom": "Awa", "nom": "Diallo",
                 "date_naissance": "1985-06-12", "confidence": 0.71},
                {"id": 1, "image_url": "/m/1.jpg", "diagnostic_result": "benign",
                 "date_diagnostic": "2024-01-01", "prenom": "Jean", "nom": "Dupont",
                 "date_naissance": "1990-01-01"}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_open_reads_persisted_token() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let store = signed_in(&server, &dir);
        assert_eq!(store.state().auth.token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_login_persists_token_and_attaches_it() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/token/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "new-tok"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/"))
            .and(header("authorization", "Bearer new-tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "dr"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = open(&server, &dir);
        store
            .login(&Credentials {
                username: "dr".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.state().auth.token.as_deref(), Some("new-tok"));
        let persisted = SessionStore::at(dir.path().join("session.json"))
            .load()
            .unwrap();
        assert_eq!(persisted.as_deref(), Some("new-tok"));

        store.fetch_profile().await.unwrap();
        assert_eq!(
            store.state().auth.user.as_ref().map(|u| u.username.as_str()),
            Some("dr")
        );
        let notices = store.drain_notices();
        assert_eq!(notices, vec![Notice::success("Signed in successfully")]);
    }

    #[tokio::test]
    async fn test_login_failure_sets_error_and_no_session() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/token/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let mut store = open(&server, &dir);
        let err = store
            .login(&Credentials {
                username: "dr".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Request(_)));
        assert_eq!(
            store.state().auth.status.error.as_deref(),
            Some("Bad credentials")
        );
        assert!(!store.state().auth.status.loading);
        assert!(!dir.path().join("session.json").exists());
    }

    #[tokio::test]
    async fn test_logout_clears_store_and_storage() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let mut store = signed_in(&server, &dir);

        store.logout().unwrap();

        assert_eq!(store.state().auth.token, None);
        assert_eq!(store.state().auth.user, None);
        let persisted = SessionStore::at(dir.path().join("session.json"))
            .load()
            .unwrap();
        assert_eq!(persisted, None);
        assert!(crate::guard::require_token(&store.state().auth).is_err());
    }

    #[tokio::test]
    async fn test_submit_prepends_normalized_record() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_history(&server).await;
        Mock::given(method("POST"))
            .and(path("/diagnostic/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "42", "diagnostic": "benign",
                "image_url": "/m/42.jpg", "date": "2024-01-01"
            })))
            .mount(&server)
            .await;

        let mut store = signed_in(&server, &dir);
        store.fetch_diagnostics().await.unwrap();
        let before = store.state().diagnostic.diagnostics.len();

        store.submit_diagnostic(&patient(), &image()).await.unwrap();

        let state = &store.state().diagnostic;
        assert_eq!(state.diagnostics.len(), before + 1);
        let first = &state.diagnostics[0];
        assert_eq!(first.id.as_str(), "42");
        assert_eq!(first.diagnosis, "benign");
        assert_eq!(first.first_name, "Jean");
        assert_eq!(first.last_name, "Dupont");
        assert!((first.confidence.value() - 0.95).abs() < f64::EPSILON);
        assert_eq!(state.current.as_ref(), Some(first));
    }

    #[tokio::test]
    async fn test_submit_failure_leaves_history() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_history(&server).await;
        Mock::given(method("POST"))
            .and(path("/diagnostic/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut store = signed_in(&server, &dir);
        store.fetch_diagnostics().await.unwrap();
        let before = store.state().diagnostic.diagnostics.clone();

        assert!(store.submit_diagnostic(&patient(), &image()).await.is_err());

        let state = &store.state().diagnostic;
        assert_eq!(state.diagnostics, before);
        assert_eq!(
            state.status.error.as_deref(),
            Some(Operation::SubmitDiagnostic.fallback_message())
        );
        assert_eq!(
            store.drain_notices(),
            vec![Notice::error("Diagnostic submission failed")]
        );
    }

    #[tokio::test]
    async fn test_fetch_uses_real_score_when_present() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_history(&server).await;

        let mut store = signed_in(&server, &dir);
        store.fetch_diagnostics().await.unwrap();

        let history = &store.state().diagnostic.diagnostics;
        assert_eq!(history.len(), 2);
        assert!((history[0].confidence.value() - 0.71).abs() < 1e-9);
        assert!((history[1].confidence.value() - 0.95).abs() < 1e-9);
        assert_eq!(history[0].first_name, "Awa");
    }

    #[tokio::test]
    async fn test_update_then_delete() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_history(&server).await;
        Mock::given(method("PUT"))
            .and(path("/diagnostic/update/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "prenom": "Jeanne"
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/diagnostic/delete/2"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let mut store = signed_in(&server, &dir);
        store.fetch_diagnostics().await.unwrap();
        let other = store.state().diagnostic.diagnostics[0].clone();

        let id = RecordId::new("1").unwrap();
        let fields = PatientFields {
            first_name: "Jeanne".into(),
            last_name: "Martin".into(),
            birth_date: "1991-02-03".into(),
        };
        store.update_diagnostic(&id, &fields).await.unwrap();

        let updated = store.state().diagnostic.find(&id).unwrap();
        assert_eq!(updated.first_name, "Jeanne");
        assert_eq!(updated.last_name, "Martin");
        assert_eq!(updated.birth_date, "1991-02-03");
        assert_eq!(store.state().diagnostic.diagnostics[0], other);

        let gone = RecordId::new("2").unwrap();
        store.delete_diagnostic(&gone).await.unwrap();
        assert!(store.state().diagnostic.find(&gone).is_none());
        assert_eq!(store.state().diagnostic.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_loading_only_while_in_flight() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        mount_history(&server).await;

        let mut store = signed_in(&server, &dir);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |state| {
            sink.lock().unwrap().push(state.diagnostic.status.loading);
        });

        assert!(!store.state().diagnostic.status.loading);
        store.fetch_diagnostics().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_update_profile_replaces_user() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("PUT"))
            .and(path("/profile/update/"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({
                "username": "dr",
                "email": "dr@clinic.example",
                "first_name": "Greg",
                "last_name": "House"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "dr",
                "email": "dr@clinic.example",
                "first_name": "Greg",
                "last_name": "House"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = signed_in(&server, &dir);
        store
            .update_profile(&ProfileUpdate {
                username: "dr".into(),
                email: "dr@clinic.example".into(),
                first_name: "Greg".into(),
                last_name: "House".into(),
                avatar: None,
            })
            .await
            .unwrap();

        let user = store.state().auth.user.as_ref().unwrap();
        assert_eq!(user.first_name, "Greg");
        assert_eq!(user.email, "dr@clinic.example");
        assert!(!store.state().auth.status.loading);
        assert_eq!(
            store.drain_notices(),
            vec![Notice::success("Profile updated")]
        );
    }

    #[tokio::test]
    async fn test_update_profile_failure_keeps_user() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("PUT"))
            .and(path("/profile/update/"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"email": ["Enter a valid email address."]})),
            )
            .mount(&server)
            .await;

        let mut store = signed_in(&server, &dir);
        let err = store
            .update_profile(&ProfileUpdate::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Request(_)));
        assert_eq!(store.state().auth.user, None);
        assert_eq!(
            store.state().auth.status.error.as_deref(),
            Some("email: Enter a valid email address.")
        );
    }

    #[tokio::test]
    async fn test_update_password_sends_both_fields() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("PUT"))
            .and(path("/profile/password/"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({
                "current_password": "old-secret",
                "new_password": "new-secret"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = signed_in(&server, &dir);
        store
            .update_password(&PasswordChange {
                current_password: "old-secret".into(),
                new_password: "new-secret".into(),
            })
            .await
            .unwrap();

        assert!(!store.state().auth.status.loading);
        assert_eq!(store.state().auth.status.error, None);
        assert_eq!(
            store.drain_notices(),
            vec![Notice::success("Password updated")]
        );
        // the session is untouched
        assert_eq!(store.state().auth.token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_open_with_corrupt_session_starts_signed_out() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("session.json"), "{not json").unwrap();

        let mut store = open(&server, &dir);
        assert_eq!(store.state().auth.token, None);

        store.logout().unwrap();
        assert_eq!(
            SessionStore::at(dir.path().join("session.json"))
                .load()
                .unwrap(),
            None
        );
    }
}
