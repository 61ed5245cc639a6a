//! Session store: bearer token plus the signed-in user.
//!
//! A `SessionStore` is a cheap handle over shared state. Every mutation
//! publishes a new [`SessionSnapshot`] on a `watch` channel, which is how the
//! view layer and the push supervisor learn about logins and logouts.

use std::sync::{Arc, Weak};

use anyhow::{Context, Result};
use reqwest::Method;
use tokio::sync::watch;

use crate::config::Config;
use crate::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{Gateway, RequestBody, UnauthorizedHook, decode_json};
use crate::models::{
    Credentials, ImageUpload, LoginResponse, MessageBody, PasswordChange, ProfileUpdate,
    Registration, SettingsUpdate, User, UserEnvelope,
};
use crate::toast::ToastSink;
use crate::token_store::{FileTokenStore, TokenStore, mask_token};

pub const SIGNED_OUT_MESSAGE: &str = "You have been signed out.";

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    /// True while a persisted token is being verified at startup.
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.notifications_enabled)
    }
}

/// Profile mutation accepted by [`SessionStore::update_user`].
#[derive(Debug, Clone)]
pub enum UserUpdate {
    Profile(ProfileUpdate),
    Avatar(ImageUpload),
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    gateway: Gateway,
    tokens: Arc<dyn TokenStore>,
    toasts: ToastSink,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionInner {
    /// Clears everything. Returns true if a session existed.
    fn end_session(&self, announce: bool) -> bool {
        if let Err(e) = self.tokens.clear() {
            tracing::warn!(error = %format!("{e:#}"), "failed to clear stored token");
        }

        let mut had_session = false;
        self.state.send_if_modified(|s| {
            had_session = s.token.is_some() || s.is_authenticated;
            if *s == SessionSnapshot::default() {
                return false;
            }
            *s = SessionSnapshot::default();
            true
        });

        if had_session {
            tracing::info!("session ended");
            if announce {
                self.toasts.info(SIGNED_OUT_MESSAGE);
            }
        }
        had_session
    }
}

impl SessionStore {
    /// Creates a store over `tokens`, hydrating the token if one is persisted.
    ///
    /// The snapshot starts with `is_loading` set when a token exists; call
    /// [`verify`](Self::verify) to resolve it.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        toasts: ToastSink,
    ) -> Self {
        let token = tokens.load();
        let initial = SessionSnapshot {
            is_loading: token.is_some(),
            token,
            user: None,
            is_authenticated: false,
        };
        let (state, _) = watch::channel(initial);

        let inner = Arc::new_cyclic(|weak: &Weak<SessionInner>| {
            let weak = weak.clone();
            let hook: UnauthorizedHook = Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.end_session(true);
                }
            });
            SessionInner {
                gateway: Gateway::new(http, base_url, Arc::clone(&tokens), hook),
                tokens,
                toasts,
                state,
            }
        });
        Self { inner }
    }

    /// Opens the store from configuration with the file-backed token store.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the token file cannot be read.
    pub fn from_config(config: &Config, toasts: ToastSink) -> Result<Self> {
        let base_url = config.effective_api_base_url()?;
        let tokens = FileTokenStore::open_default().context("Failed to open token store")?;
        let http = Gateway::http_client(config.request_timeout())?;
        Ok(Self::new(http, &base_url, Arc::new(tokens), toasts))
    }

    pub fn gateway(&self) -> Gateway {
        self.inner.gateway.clone()
    }

    pub fn toasts(&self) -> &ToastSink {
        &self.inner.toasts
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    /// `Api` with the server message on rejection; state is left untouched.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<User> {
        let body = RequestBody::json(credentials)?;
        let response = self
            .inner
            .gateway
            .request_anonymous(Method::POST, endpoints::LOGIN, body)
            .await?;
        let login: LoginResponse = decode_json(response, "Login failed").await?;

        let (Some(token), Some(user)) = (login.access_token, login.user) else {
            return Err(ClientError::Decode(
                "server did not return a token or user".to_string(),
            ));
        };

        self.inner
            .tokens
            .save(&token)
            .map_err(|e| ClientError::Storage(format!("{e:#}")))?;
        tracing::info!(user = %user.username, token = %mask_token(&token), "signed in");

        self.inner.state.send_replace(SessionSnapshot {
            token: Some(token),
            user: Some(user.clone()),
            is_authenticated: true,
            is_loading: false,
        });
        self.inner
            .toasts
            .success(format!("Welcome, {}!", user.username));
        Ok(user)
    }

    /// Creates an account. Never signs in.
    ///
    /// # Errors
    /// `Api` with the server message on rejection.
    pub async fn register(&self, registration: &Registration) -> ClientResult<()> {
        let body = RequestBody::json(registration)?;
        let response = self
            .inner
            .gateway
            .request_anonymous(Method::POST, endpoints::REGISTER, body)
            .await?;
        let message: MessageBody = decode_json(response, "Registration failed").await?;
        self.inner.toasts.success(
            message
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Registration successful. You can now sign in.".to_string()),
        );
        Ok(())
    }

    /// Signs out. Safe to call repeatedly; only the first call after a
    /// session existed shows the signed-out toast.
    pub fn logout(&self) {
        self.inner.end_session(true);
    }

    /// Resolves a persisted token into a user. Failures sign out silently.
    pub async fn verify(&self) {
        if self.inner.tokens.load().is_none() {
            self.inner.state.send_modify(|s| s.is_loading = false);
            return;
        }

        self.inner.state.send_modify(|s| s.is_loading = true);
        // An expired token is routine here, so the 401 hook stays out of it.
        let checked = match self
            .inner
            .gateway
            .request_unhooked(Method::GET, endpoints::ME, RequestBody::Empty)
            .await
        {
            Ok(response) => decode_json::<UserEnvelope>(response, "Session check failed").await,
            Err(e) => Err(e.into()),
        };
        match checked {
            Ok(envelope) => {
                let token = self.inner.tokens.load();
                tracing::info!(user = %envelope.user.username, "session restored");
                self.inner.state.send_replace(SessionSnapshot {
                    is_authenticated: token.is_some(),
                    token,
                    user: Some(envelope.user),
                    is_loading: false,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored session is no longer valid");
                self.inner.end_session(false);
            }
        }
    }

    /// Updates the profile fields or the avatar and stores the returned user.
    ///
    /// # Errors
    /// Gateway and API errors; the 401 sentinel after a forced logout.
    pub async fn update_user(&self, update: UserUpdate) -> ClientResult<User> {
        let envelope: UserEnvelope = match update {
            UserUpdate::Profile(profile) => {
                self.inner
                    .gateway
                    .send_json(
                        Method::PUT,
                        endpoints::ME,
                        RequestBody::json(&profile)?,
                        "Failed to update profile",
                    )
                    .await?
            }
            UserUpdate::Avatar(image) => {
                let form = image_form("avatar", image)?;
                self.inner
                    .gateway
                    .send_json(
                        Method::POST,
                        endpoints::ME_AVATAR,
                        RequestBody::Multipart(form),
                        "Failed to update avatar",
                    )
                    .await?
            }
        };
        Ok(self.replace_user(envelope.user))
    }

    /// # Errors
    /// Gateway and API errors.
    pub async fn update_settings(&self, settings: SettingsUpdate) -> ClientResult<User> {
        let envelope: UserEnvelope = self
            .inner
            .gateway
            .send_json(
                Method::PUT,
                endpoints::ME_SETTINGS,
                RequestBody::json(&settings)?,
                "Failed to update settings",
            )
            .await?;
        Ok(self.replace_user(envelope.user))
    }

    /// # Errors
    /// `Validation` when the form is inconsistent, otherwise gateway and API errors.
    pub async fn change_password(&self, change: &PasswordChange) -> ClientResult<()> {
        change
            .validate()
            .map_err(|e| ClientError::Validation(e.message))?;
        self.inner
            .gateway
            .send_ok(
                Method::POST,
                endpoints::ME_CHANGE_PASSWORD,
                RequestBody::json(change)?,
                "Failed to change password",
            )
            .await?;
        Ok(())
    }

    fn replace_user(&self, user: User) -> User {
        self.inner.state.send_modify(|s| s.user = Some(user.clone()));
        user
    }
}

/// Builds a single-file multipart form.
///
/// # Errors
/// `Validation` if the MIME type is not a valid header value.
pub fn image_form(field: &'static str, image: ImageUpload) -> ClientResult<reqwest::multipart::Form> {
    let part = reqwest::multipart::Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.mime)
        .map_err(|e| ClientError::Validation(format!("Unsupported image type: {e}")))?;
    Ok(reqwest::multipart::Form::new().part(field, part))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::toast::{self, ToastLevel};
    use crate::token_store::MemoryTokenStore;

    fn store(server: &MockServer, tokens: MemoryTokenStore) -> (SessionStore, toast::ToastReceiver) {
        let (sink, rx) = ToastSink::channel();
        let store = SessionStore::new(
            Gateway::http_client(None).unwrap(),
            &server.uri(),
            Arc::new(tokens),
            sink,
        );
        (store, rx)
    }

    fn user_json() -> serde_json::Value {
        json!({"id": 1, "username": "alice", "email": "a@b.com", "is_admin": false})
    }

    #[tokio::test]
    async fn test_initial_snapshot_loading_with_token() {
        let server = MockServer::start().await;
        let (store, _rx) = store(&server, MemoryTokenStore::with_token("T"));
        let snap = store.snapshot();
        assert!(snap.is_loading);
        assert!(!snap.is_authenticated);
        assert_eq!(snap.token.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn test_verify_without_token_is_silent() {
        let server = MockServer::start().await;
        let (store, mut rx) = store(&server, MemoryTokenStore::new());
        store.verify().await;
        assert!(!store.snapshot().is_loading);
        assert!(toast::drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_verify_success_authenticates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": user_json()})))
            .mount(&server)
            .await;
        let (store, _rx) = store(&server, MemoryTokenStore::with_token("T"));
        store.verify().await;
        let snap = store.snapshot();
        assert!(snap.is_authenticated);
        assert!(!snap.is_loading);
        assert_eq!(snap.user.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_verify_failure_logs_out_silently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (store, mut rx) = store(&server, MemoryTokenStore::with_token("T"));
        store.verify().await;
        let snap = store.snapshot();
        assert_eq!(snap, SessionSnapshot::default());
        assert!(toast::drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_verify_expired_token_logs_out_silently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Token has expired"})))
            .mount(&server)
            .await;
        let (store, mut rx) = store(&server, MemoryTokenStore::with_token("T"));
        store.verify().await;
        assert_eq!(store.snapshot(), SessionSnapshot::default());
        assert!(store.inner.tokens.load().is_none());
        assert!(toast::drain(&mut rx).is_empty());

        // The session is already gone, so a later logout stays quiet too.
        store.logout();
        assert!(toast::drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_logout_toasts_once() {
        let server = MockServer::start().await;
        let (store, mut rx) = store(&server, MemoryTokenStore::with_token("T"));
        store.logout();
        store.logout();
        let toasts = toast::drain(&mut rx);
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].level, ToastLevel::Info);
        assert_eq!(toasts[0].message, SIGNED_OUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_login_missing_token_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": user_json()})))
            .mount(&server)
            .await;
        let (store, _rx) = store(&server, MemoryTokenStore::new());
        let err = store
            .login(&Credentials {
                email: "a@b.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_update_settings_replaces_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "T", "user": user_json()})),
            )
            .mount(&server)
            .await;
        let mut updated = user_json();
        updated["notifications_enabled"] = json!(false);
        Mock::given(method("PUT"))
            .and(path("/api/me/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": updated})))
            .mount(&server)
            .await;

        let (store, _rx) = store(&server, MemoryTokenStore::new());
        store
            .login(&Credentials {
                email: "a@b.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        assert!(store.snapshot().notifications_enabled());

        store
            .update_settings(SettingsUpdate {
                notifications_enabled: false,
            })
            .await
            .unwrap();
        assert!(!store.snapshot().notifications_enabled());
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn test_change_password_validates_locally() {
        let server = MockServer::start().await;
        let (store, _rx) = store(&server, MemoryTokenStore::with_token("T"));
        let err = store
            .change_password(&PasswordChange {
                current_password: "old".into(),
                new_password: "abcdef".into(),
                confirm_new_password: "abcdeg".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
